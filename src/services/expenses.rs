use crate::{
    db::DbPool,
    entities::{expense, item, user},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ExpenseNature, ExpenseType},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub amount: Decimal,
    /// Defaults to INGREDIENT when omitted.
    pub expense_type: Option<ExpenseType>,
    /// Defaults to the nature implied by the expense type.
    pub nature: Option<ExpenseNature>,
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateExpenseRequest {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub expense_type: Option<ExpenseType>,
    pub nature: Option<ExpenseNature>,
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// List filters accepted by `GET /expenses`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseFilter {
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub expense_type: Option<ExpenseType>,
    pub nature: Option<ExpenseNature>,
}

/// Resolve the (type, nature) pair from optional inputs, enforcing the
/// DIRECT/INDIRECT type sets.
pub fn classify(
    expense_type: Option<ExpenseType>,
    nature: Option<ExpenseNature>,
) -> Result<(ExpenseType, ExpenseNature), ServiceError> {
    let expense_type = expense_type.unwrap_or(ExpenseType::Ingredient);
    let nature = nature.unwrap_or_else(|| ExpenseNature::for_type(expense_type));

    if !nature.permits(expense_type) {
        return Err(ServiceError::ValidationError(format!(
            "{nature} expenses do not allow type {expense_type}"
        )));
    }

    Ok((expense_type, nature))
}

#[derive(Clone)]
pub struct ExpenseService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ExpenseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send expense event");
            }
        }
    }

    /// Any referenced item or user must live in the actor's organization.
    async fn verify_references(
        &self,
        organization_id: Uuid,
        item_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(item_id) = item_id {
            let found = item::Entity::find_by_id(item_id)
                .filter(item::Column::OrganizationId.eq(organization_id))
                .one(&*self.db_pool)
                .await?;
            if found.is_none() {
                return Err(ServiceError::NotFound("Item not found".to_string()));
            }
        }

        if let Some(user_id) = user_id {
            let found = user::Entity::find_by_id(user_id)
                .filter(user::Column::OrganizationId.eq(organization_id))
                .one(&*self.db_pool)
                .await?;
            if found.is_none() {
                return Err(ServiceError::NotFound("User not found".to_string()));
            }
        }

        Ok(())
    }

    #[instrument(skip(self, request), fields(description = %request.description))]
    pub async fn create(
        &self,
        organization_id: Uuid,
        request: CreateExpenseRequest,
    ) -> Result<expense::Model, ServiceError> {
        request.validate()?;
        if request.amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must not be negative".to_string(),
            ));
        }

        let (expense_type, nature) = classify(request.expense_type, request.nature)?;
        self.verify_references(organization_id, request.item_id, request.user_id)
            .await?;

        let created = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            description: Set(request.description),
            amount: Set(request.amount),
            expense_type: Set(expense_type.to_string()),
            nature: Set(nature.to_string()),
            item_id: Set(request.item_id),
            user_id: Set(request.user_id),
            organization_id: Set(organization_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(expense_id = %created.id, nature = %created.nature, "expense recorded");
        self.emit(Event::ExpenseRecorded(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: ExpenseFilter,
    ) -> Result<Vec<expense::Model>, ServiceError> {
        let mut query = expense::Entity::find()
            .filter(expense::Column::OrganizationId.eq(organization_id));

        if let Some(item_id) = filter.item_id {
            query = query.filter(expense::Column::ItemId.eq(item_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(expense::Column::UserId.eq(user_id));
        }
        if let Some(expense_type) = filter.expense_type {
            query = query.filter(expense::Column::ExpenseType.eq(expense_type.to_string()));
        }
        if let Some(nature) = filter.nature {
            query = query.filter(expense::Column::Nature.eq(nature.to_string()));
        }

        Ok(query
            .order_by_desc(expense::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        organization_id: Uuid,
        expense_id: Uuid,
    ) -> Result<expense::Model, ServiceError> {
        expense::Entity::find_by_id(expense_id)
            .filter(expense::Column::OrganizationId.eq(organization_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Expense not found".to_string()))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        organization_id: Uuid,
        expense_id: Uuid,
        request: UpdateExpenseRequest,
    ) -> Result<expense::Model, ServiceError> {
        request.validate()?;
        if matches!(request.amount, Some(amount) if amount < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "amount must not be negative".to_string(),
            ));
        }

        let existing = self.get(organization_id, expense_id).await?;

        // Re-derive the classification over the merged values so an
        // update cannot produce an invalid type/nature pairing.
        let current_type: ExpenseType = existing
            .expense_type
            .parse()
            .map_err(|_| ServiceError::InternalError("corrupt expense_type".to_string()))?;
        let current_nature: ExpenseNature = existing
            .nature
            .parse()
            .map_err(|_| ServiceError::InternalError("corrupt nature".to_string()))?;

        let merged_type = request.expense_type.unwrap_or(current_type);
        let merged_nature = if request.nature.is_some() {
            request.nature
        } else if request.expense_type.is_some() {
            // A type change without an explicit nature re-infers it.
            None
        } else {
            Some(current_nature)
        };
        let (expense_type, nature) = classify(Some(merged_type), merged_nature)?;

        self.verify_references(organization_id, request.item_id, request.user_id)
            .await?;

        let mut active: expense::ActiveModel = existing.into();
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(amount) = request.amount {
            active.amount = Set(amount);
        }
        active.expense_type = Set(expense_type.to_string());
        active.nature = Set(nature.to_string());
        if let Some(item_id) = request.item_id {
            active.item_id = Set(Some(item_id));
        }
        if let Some(user_id) = request.user_id {
            active.user_id = Set(Some(user_id));
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        organization_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = self.get(organization_id, expense_id).await?;
        expense::Entity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await?;

        info!(expense_id = %expense_id, "expense deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn classify_defaults_to_direct_ingredient() {
        let (ty, nature) = classify(None, None).unwrap();
        assert_eq!(ty, ExpenseType::Ingredient);
        assert_eq!(nature, ExpenseNature::Direct);
    }

    #[rstest]
    #[case(ExpenseType::Rent, ExpenseNature::Indirect)]
    #[case(ExpenseType::Packaging, ExpenseNature::Direct)]
    #[case(ExpenseType::Salary, ExpenseNature::Indirect)]
    fn classify_infers_nature_from_type(
        #[case] ty: ExpenseType,
        #[case] expected: ExpenseNature,
    ) {
        let (_, nature) = classify(Some(ty), None).unwrap();
        assert_eq!(nature, expected);
    }

    #[rstest]
    #[case(ExpenseType::Rent, ExpenseNature::Direct)]
    #[case(ExpenseType::Ingredient, ExpenseNature::Indirect)]
    fn classify_rejects_mismatched_pairs(#[case] ty: ExpenseType, #[case] nature: ExpenseNature) {
        assert!(classify(Some(ty), Some(nature)).is_err());
    }

    #[test]
    fn classify_rejects_indirect_without_type() {
        // Nature alone defaults the type to INGREDIENT, which INDIRECT
        // does not permit.
        assert!(classify(None, Some(ExpenseNature::Indirect)).is_err());
    }
}
