use crate::access::{AccessScope, CurrentUser, Role};
use crate::error::{AgriError, AgriResult};
use crate::supervisor::model::{validate_email, SupervisorCreate, SupervisorDto, SupervisorPatch};
use crate::storage::entity::supervisor::{
    ActiveModel as SupervisorActiveModel, Column as SupervisorColumn,
};
use crate::storage::repository::{SupervisorRepository, WriteOutcome};
use chrono::Utc;
use log::info;
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, Set};
use std::sync::Arc;

pub struct SupervisorService {
    db: Arc<DatabaseConnection>,
}

impl SupervisorService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user: &CurrentUser) -> AgriResult<Vec<SupervisorDto>> {
        let supervisors = AccessScope::scope_supervisors(&self.db, user).await?;
        info!(
            "Returned {} supervisors for user {}",
            supervisors.len(),
            user.user_id
        );
        supervisors.into_iter().map(SupervisorDto::try_from).collect()
    }

    pub async fn get(&self, user: &CurrentUser, id: &str) -> AgriResult<SupervisorDto> {
        let supervisor = SupervisorRepository::get(&self.db, id)
            .await?
            .ok_or_else(|| AgriError::not_found("Supervisor", id))?;
        if !AccessScope::can_see_supervisor(user, &supervisor) {
            return Err(AccessScope::denied(user, "view this supervisor"));
        }
        SupervisorDto::try_from(supervisor)
    }

    /// FieldManager 创建时未指定 field_manager_id 则归属到自己
    pub async fn create(
        &self,
        user: &CurrentUser,
        input: SupervisorCreate,
    ) -> AgriResult<SupervisorDto> {
        AccessScope::require_manager(user, "create supervisors")?;
        if input.name.trim().is_empty() {
            return Err(AgriError::Validation("name must not be empty".to_string()));
        }
        validate_email(&input.email)?;

        let mut field_manager_id = input.field_manager_id.filter(|id| !id.trim().is_empty());
        if user.role == Role::FieldManager && field_manager_id.is_none() {
            field_manager_id = Some(user.user_id.clone());
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();
        let active_model = SupervisorActiveModel {
            id: Set(id.clone()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            assigned_plots: Set(plots_json(&input.assigned_plots)?),
            field_manager_id: Set(field_manager_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        SupervisorRepository::put(&self.db, active_model).await?;
        info!("✓ Supervisor created: {} by {}", id, user.user_id);

        SupervisorRepository::get(&self.db, &id)
            .await?
            .ok_or_else(|| AgriError::not_found("Supervisor", &id))
            .and_then(SupervisorDto::try_from)
    }

    pub async fn update(
        &self,
        user: &CurrentUser,
        id: &str,
        patch: SupervisorPatch,
    ) -> AgriResult<SupervisorDto> {
        AccessScope::require_manager(user, "update supervisors")?;
        if patch.is_empty() {
            return Err(AgriError::Validation("no fields provided for update".to_string()));
        }
        if patch.field_manager_id.is_some() && user.role != Role::FarmManager {
            return Err(AccessScope::denied(user, "reassign supervisors"));
        }

        let mut fields = Vec::new();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(AgriError::Validation("name must not be empty".to_string()));
            }
            fields.push((SupervisorColumn::Name, Expr::value(name)));
        }
        if let Some(email) = patch.email {
            validate_email(&email)?;
            fields.push((SupervisorColumn::Email, Expr::value(email)));
        }
        if let Some(phone) = patch.phone {
            fields.push((SupervisorColumn::Phone, Expr::value(phone)));
        }
        if let Some(plots) = patch.assigned_plots {
            fields.push((SupervisorColumn::AssignedPlots, Expr::value(plots_json(&plots)?)));
        }
        if let Some(field_manager_id) = patch.field_manager_id {
            fields.push((SupervisorColumn::FieldManagerId, Expr::value(field_manager_id)));
        }
        fields.push((SupervisorColumn::UpdatedAt, Expr::value(Utc::now().timestamp())));

        let condition = AccessScope::supervisor_write_condition(user);
        match SupervisorRepository::update(&self.db, id, fields, condition).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Supervisor updated: {}", id);
                SupervisorDto::try_from(model)
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Supervisor", id)),
            WriteOutcome::ConditionFailed => Err(AccessScope::denied(user, "update this supervisor")),
        }
    }

    pub async fn delete(&self, user: &CurrentUser, id: &str) -> AgriResult<SupervisorDto> {
        AccessScope::require_manager(user, "delete supervisors")?;
        let condition = AccessScope::supervisor_write_condition(user);
        match SupervisorRepository::delete(&self.db, id, condition).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Supervisor deleted: {}", id);
                SupervisorDto::try_from(model)
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Supervisor", id)),
            WriteOutcome::ConditionFailed => Err(AccessScope::denied(user, "delete this supervisor")),
        }
    }
}

fn plots_json(plots: &[String]) -> AgriResult<String> {
    serde_json::to_string(plots).map_err(|e| AgriError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        farm_manager, field_manager, memory_db, supervisor_input, supervisor_user, unknown_role,
    };

    #[tokio::test]
    async fn field_manager_creation_stamps_owner() {
        let service = SupervisorService::new(memory_db().await);
        let fdm = field_manager("fdm-1");

        let created = service
            .create(&fdm, supervisor_input("Asha", None))
            .await
            .unwrap();
        assert_eq!(created.field_manager_id.as_deref(), Some("fdm-1"));

        let explicit = service
            .create(&fdm, supervisor_input("Bo", Some("fdm-9")))
            .await
            .unwrap();
        assert_eq!(explicit.field_manager_id.as_deref(), Some("fdm-9"));

        let by_farm_manager = service
            .create(&farm_manager(), supervisor_input("Cy", None))
            .await
            .unwrap();
        assert_eq!(by_farm_manager.field_manager_id, None);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let service = SupervisorService::new(memory_db().await);
        let fm = farm_manager();
        service.create(&fm, supervisor_input("Asha", Some("fdm-1"))).await.unwrap();
        service.create(&fm, supervisor_input("Bo", Some("fdm-1"))).await.unwrap();
        service.create(&fm, supervisor_input("Cy", Some("fdm-2"))).await.unwrap();

        assert_eq!(service.list(&fm).await.unwrap().len(), 3);

        let mine = service.list(&field_manager("fdm-1")).await.unwrap();
        let names: Vec<_> = mine.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Bo"]);

        assert!(matches!(
            service.list(&supervisor_user("sup-1")).await,
            Err(AgriError::Forbidden(_))
        ));
        assert!(matches!(
            service.list(&unknown_role()).await,
            Err(AgriError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn supervisors_cannot_create_supervisors() {
        let service = SupervisorService::new(memory_db().await);
        let err = service
            .create(&supervisor_user("sup-1"), supervisor_input("Asha", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::Forbidden(_)));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let service = SupervisorService::new(memory_db().await);
        let mut input = supervisor_input("Asha", None);
        input.email = "not-an-email".to_string();
        let err = service.create(&farm_manager(), input).await.unwrap_err();
        assert!(matches!(err, AgriError::Validation(_)));
    }

    #[tokio::test]
    async fn patch_updates_only_given_fields() {
        let service = SupervisorService::new(memory_db().await);
        let fm = farm_manager();
        let created = service.create(&fm, supervisor_input("Asha", None)).await.unwrap();

        let patch = SupervisorPatch {
            phone: Some("555-0199".to_string()),
            assigned_plots: Some(vec!["p-1".to_string(), "p-2".to_string()]),
            ..Default::default()
        };
        let updated = service.update(&fm, &created.id, patch).await.unwrap();
        assert_eq!(updated.name, "Asha");
        assert_eq!(updated.phone, "555-0199");
        assert_eq!(updated.assigned_plots, vec!["p-1", "p-2"]);

        let err = service
            .update(&fm, &created.id, SupervisorPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::Validation(_)));

        let err = service
            .update(
                &fm,
                "missing",
                SupervisorPatch {
                    name: Some("X".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::NotFound(_)));
    }

    #[tokio::test]
    async fn field_manager_cannot_touch_foreign_supervisors() {
        let service = SupervisorService::new(memory_db().await);
        let other = service
            .create(&farm_manager(), supervisor_input("Cy", Some("fdm-2")))
            .await
            .unwrap();
        let fdm = field_manager("fdm-1");

        let patch = SupervisorPatch {
            name: Some("Hijacked".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&fdm, &other.id, patch).await,
            Err(AgriError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&fdm, &other.id).await,
            Err(AgriError::Forbidden(_))
        ));
        assert!(matches!(
            service.get(&fdm, &other.id).await,
            Err(AgriError::Forbidden(_))
        ));

        let reassign = SupervisorPatch {
            field_manager_id: Some("fdm-1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&fdm, &other.id, reassign).await,
            Err(AgriError::Forbidden(_))
        ));

        let unchanged = service.get(&farm_manager(), &other.id).await.unwrap();
        assert_eq!(unchanged.name, "Cy");
    }

    #[tokio::test]
    async fn supervisor_can_read_own_record_only() {
        let service = SupervisorService::new(memory_db().await);
        let fm = farm_manager();
        let asha = service.create(&fm, supervisor_input("Asha", None)).await.unwrap();
        let bo = service.create(&fm, supervisor_input("Bo", None)).await.unwrap();

        let me = supervisor_user(&asha.id);
        assert_eq!(service.get(&me, &asha.id).await.unwrap().name, "Asha");
        assert!(matches!(
            service.get(&me, &bo.id).await,
            Err(AgriError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn delete_returns_removed_record() {
        let service = SupervisorService::new(memory_db().await);
        let fm = farm_manager();
        let created = service.create(&fm, supervisor_input("Asha", None)).await.unwrap();

        let removed = service.delete(&fm, &created.id).await.unwrap();
        assert_eq!(removed.id, created.id);
        assert!(matches!(
            service.delete(&fm, &created.id).await,
            Err(AgriError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_stored_plots_surface_as_internal_error() {
        let db = memory_db().await;
        let service = SupervisorService::new(db.clone());
        let fm = farm_manager();
        let created = service.create(&fm, supervisor_input("Asha", None)).await.unwrap();

        SupervisorRepository::update(
            &db,
            &created.id,
            vec![(SupervisorColumn::AssignedPlots, Expr::value("not json"))],
            None,
        )
        .await
        .unwrap();

        assert_eq!(service.get(&fm, &created.id).await.unwrap_err().kind(), "INTERNAL");
        assert_eq!(service.list(&fm).await.unwrap_err().kind(), "INTERNAL");
    }
}
