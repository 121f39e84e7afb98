use crate::access::{AccessScope, CurrentUser, Role};
use crate::error::{AgriError, AgriResult};
use crate::plot::model::{PlotCreate, PlotDto, PlotPatch};
use crate::storage::entity::plot::{ActiveModel as PlotActiveModel, Column as PlotColumn};
use crate::storage::repository::{PlotRepository, WriteOutcome};
use chrono::Utc;
use log::{info, warn};
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, DbErr, Set, SqlErr};
use std::sync::Arc;

pub struct PlotService {
    db: Arc<DatabaseConnection>,
}

impl PlotService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user: &CurrentUser) -> AgriResult<Vec<PlotDto>> {
        let plots = AccessScope::scope_plots(&self.db, user).await?;
        info!("Found {} plots for {}", plots.len(), user.user_id);
        Ok(plots.into_iter().map(PlotDto::from).collect())
    }

    pub async fn get(&self, user: &CurrentUser, id: &str) -> AgriResult<PlotDto> {
        let plot = PlotRepository::get(&self.db, id)
            .await?
            .ok_or_else(|| AgriError::not_found("Plot", id))?;
        if !AccessScope::can_see_plot(user, &plot) {
            return Err(AccessScope::denied(user, "view this plot"));
        }
        Ok(plot.into())
    }

    /// plot_number 由存储层唯一索引保证唯一
    pub async fn create(&self, user: &CurrentUser, input: PlotCreate) -> AgriResult<PlotDto> {
        AccessScope::require_manager(user, "create plots")?;
        let plot_number = input.plot_number.trim().to_string();
        if input.name.trim().is_empty() || plot_number.is_empty() {
            return Err(AgriError::Validation(
                "name and plot_number must not be empty".to_string(),
            ));
        }
        input.geolocation.validate()?;

        let mut field_manager_id = input.field_manager_id.filter(|id| !id.trim().is_empty());
        if user.role == Role::FieldManager && field_manager_id.is_none() {
            field_manager_id = Some(user.user_id.clone());
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();
        let active_model = PlotActiveModel {
            id: Set(id.clone()),
            name: Set(input.name),
            plot_number: Set(plot_number.clone()),
            latitude: Set(input.geolocation.latitude),
            longitude: Set(input.geolocation.longitude),
            supervisor_id: Set(input.supervisor_id),
            field_manager_id: Set(field_manager_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        PlotRepository::put(&self.db, active_model)
            .await
            .map_err(|e| duplicate_plot_number(e, &plot_number))?;
        info!("✓ Plot {} created: {}", plot_number, id);

        PlotRepository::get(&self.db, &id)
            .await?
            .map(PlotDto::from)
            .ok_or_else(|| AgriError::not_found("Plot", &id))
    }

    pub async fn update(&self, user: &CurrentUser, id: &str, patch: PlotPatch) -> AgriResult<PlotDto> {
        AccessScope::require_manager(user, "update plots")?;
        if patch.is_empty() {
            return Err(AgriError::Validation("no fields provided for update".to_string()));
        }
        if patch.field_manager_id.is_some() && user.role != Role::FarmManager {
            return Err(AccessScope::denied(user, "reassign plots"));
        }

        let mut fields = Vec::new();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(AgriError::Validation("name must not be empty".to_string()));
            }
            fields.push((PlotColumn::Name, Expr::value(name)));
        }
        if let Some(geo) = patch.geolocation {
            geo.validate()?;
            fields.push((PlotColumn::Latitude, Expr::value(geo.latitude)));
            fields.push((PlotColumn::Longitude, Expr::value(geo.longitude)));
        }
        if let Some(supervisor_id) = patch.supervisor_id {
            fields.push((PlotColumn::SupervisorId, Expr::value(supervisor_id)));
        }
        if let Some(field_manager_id) = patch.field_manager_id {
            fields.push((PlotColumn::FieldManagerId, Expr::value(field_manager_id)));
        }
        fields.push((PlotColumn::UpdatedAt, Expr::value(Utc::now().timestamp())));

        let condition = AccessScope::plot_write_condition(user);
        match PlotRepository::update(&self.db, id, fields, condition).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Plot updated: {}", id);
                Ok(model.into())
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Plot", id)),
            WriteOutcome::ConditionFailed => Err(AccessScope::denied(user, "update this plot")),
        }
    }

    pub async fn delete(&self, user: &CurrentUser, id: &str) -> AgriResult<PlotDto> {
        AccessScope::require_manager(user, "delete plots")?;
        let condition = AccessScope::plot_write_condition(user);
        match PlotRepository::delete(&self.db, id, condition).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Plot deleted: {}", id);
                Ok(model.into())
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Plot", id)),
            WriteOutcome::ConditionFailed => Err(AccessScope::denied(user, "delete this plot")),
        }
    }
}

fn duplicate_plot_number(err: DbErr, plot_number: &str) -> AgriError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            warn!("✗ Duplicate plot_number rejected: {}", plot_number);
            AgriError::Validation(format!("plot_number {} already exists", plot_number))
        }
        _ => err.into(),
    }
}
