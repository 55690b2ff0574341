use crate::{
    auth,
    db::DbPool,
    entities::user,
    errors::ServiceError,
    events::{Event, EventSender},
    models::UserRole,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Defaults to CASHIER when omitted.
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be valid"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send user event");
            }
        }
    }

    async fn ensure_email_free(&self, email: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Email '{email}' is already registered"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(
        &self,
        organization_id: Uuid,
        request: CreateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;
        self.ensure_email_free(&request.email, None).await?;

        let role = request.role.unwrap_or(UserRole::Cashier);
        let now = Utc::now();

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            email: Set(request.email),
            password_hash: Set(auth::hash_password(&request.password)?),
            role: Set(role.to_string()),
            organization_id: Set(organization_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(user_id = %created.id, role = %created.role, "user created");
        self.emit(Event::UserCreated(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::OrganizationId.eq(organization_id))
            .order_by_asc(user::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .filter(user::Column::OrganizationId.eq(organization_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Looks a user up by email across all tenants; used by login only.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;

        let existing = self.get(organization_id, user_id).await?;

        if let Some(email) = &request.email {
            self.ensure_email_free(email, Some(user_id)).await?;
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(email) = request.email {
            active.email = Set(email);
        }
        if let Some(password) = request.password {
            active.password_hash = Set(auth::hash_password(&password)?);
        }
        if let Some(role) = request.role {
            active.role = Set(role.to_string());
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a user. Self-deletion is rejected so an organization
    /// cannot strand itself without the acting account.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<(), ServiceError> {
        if user_id == acting_user_id {
            return Err(ServiceError::Conflict(
                "You cannot delete your own account".to_string(),
            ));
        }

        let existing = self.get(organization_id, user_id).await?;
        user::Entity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await?;

        info!(user_id = %user_id, "user deleted");
        Ok(())
    }
}
