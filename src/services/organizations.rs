use crate::{
    auth,
    db::DbPool,
    entities::{organization, user},
    errors::ServiceError,
    events::{Event, EventSender},
    models::UserRole,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Bootstrap request: a new tenant plus its OWNER account.
#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateOrganizationWithOwnerRequest {
    #[validate(length(min = 1, max = 120, message = "Organization name is required"))]
    pub organization_name: String,
    #[validate(length(min = 1, message = "Owner name is required"))]
    pub owner_name: String,
    #[validate(email(message = "Owner email must be valid"))]
    pub owner_email: String,
    #[validate(length(min = 6, message = "Owner password must be at least 6 characters"))]
    pub owner_password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 120, message = "Organization name is required"))]
    pub name: String,
}

#[derive(Clone)]
pub struct OrganizationService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrganizationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send organization event");
            }
        }
    }

    /// Creates an organization together with its OWNER user in one
    /// transaction. The owner's password is hashed before the
    /// transaction starts.
    #[instrument(skip(self, request), fields(organization_name = %request.organization_name))]
    pub async fn create_with_owner(
        &self,
        request: CreateOrganizationWithOwnerRequest,
    ) -> Result<(organization::Model, user::Model), ServiceError> {
        request.validate()?;

        let password_hash = auth::hash_password(&request.owner_password)?;
        let now = Utc::now();

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = organization::Entity::find()
            .filter(organization::Column::Name.eq(request.organization_name.clone()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Organization '{}' already exists",
                request.organization_name
            )));
        }

        let email_taken = user::Entity::find()
            .filter(user::Column::Email.eq(request.owner_email.clone()))
            .one(&txn)
            .await?;
        if email_taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Email '{}' is already registered",
                request.owner_email
            )));
        }

        let org = organization::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.organization_name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let owner = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.owner_name.clone()),
            email: Set(request.owner_email.clone()),
            password_hash: Set(password_hash),
            role: Set(UserRole::Owner.to_string()),
            organization_id: Set(org.id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(organization_id = %org.id, owner_id = %owner.id, "organization bootstrapped");
        self.emit(Event::OrganizationCreated(org.id)).await;

        Ok((org, owner))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, organization_id: Uuid) -> Result<organization::Model, ServiceError> {
        organization::Entity::find_by_id(organization_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Organization not found".to_string()))
    }

    #[instrument(skip(self, request))]
    pub async fn rename(
        &self,
        organization_id: Uuid,
        request: UpdateOrganizationRequest,
    ) -> Result<organization::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let taken = organization::Entity::find()
            .filter(organization::Column::Name.eq(request.name.clone()))
            .filter(organization::Column::Id.ne(organization_id))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Organization '{}' already exists",
                request.name
            )));
        }

        let org = self.get(organization_id).await?;
        let mut active: organization::ActiveModel = org.into();
        active.name = Set(request.name);
        active.updated_at = Set(Utc::now());

        Ok(active.update(db).await?)
    }

    /// Deletes the organization and, via cascading foreign keys, all of
    /// its users, items, orders and expenses.
    #[instrument(skip(self))]
    pub async fn delete(&self, organization_id: Uuid) -> Result<(), ServiceError> {
        let org = self.get(organization_id).await?;
        organization::Entity::delete_by_id(org.id)
            .exec(&*self.db_pool)
            .await?;

        info!(organization_id = %organization_id, "organization deleted");
        Ok(())
    }
}
