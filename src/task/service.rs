use crate::access::{AccessScope, CurrentUser, Role};
use crate::error::{AgriError, AgriResult};
use crate::inventory::model::format_quantity;
use crate::inventory::InventoryLedger;
use crate::storage::entity::task::{
    ActiveModel as TaskActiveModel, Column as TaskColumn, Model as TaskModel,
};
use crate::storage::repository::{SupervisorRepository, TaskRepository, WriteOutcome};
use crate::task::model::{is_completed, TaskCreate, TaskDto, TaskPatch};
use chrono::Utc;
use log::{info, warn};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, Set, TransactionTrait,
};
use std::sync::Arc;

/// 任务生命周期：状态流转到 completed 时恰好扣减一次库存
pub struct TaskService {
    db: Arc<DatabaseConnection>,
    ledger: Arc<InventoryLedger>,
}

impl TaskService {
    pub fn new(db: Arc<DatabaseConnection>, ledger: Arc<InventoryLedger>) -> Self {
        Self { db, ledger }
    }

    pub async fn list(&self, user: &CurrentUser) -> AgriResult<Vec<TaskDto>> {
        let tasks = AccessScope::scope_tasks(&self.db, user).await?;
        info!("Found {} tasks for {}", tasks.len(), user.user_id);
        tasks.into_iter().map(TaskDto::try_from).collect()
    }

    pub async fn get(&self, user: &CurrentUser, id: &str) -> AgriResult<TaskDto> {
        let task = self.visible_task(user, id).await?;
        TaskDto::try_from(task)
    }

    /// 创建任务。带物料需求时先做一次库存预检（不预留库存）
    pub async fn create(&self, user: &CurrentUser, input: TaskCreate) -> AgriResult<TaskDto> {
        AccessScope::require_manager(user, "create tasks")?;
        if input.task_type.trim().is_empty() || input.plot.trim().is_empty() {
            return Err(AgriError::Validation(
                "type and plot must not be empty".to_string(),
            ));
        }
        if input.status.trim().is_empty() {
            return Err(AgriError::Validation("status must not be empty".to_string()));
        }
        if matches!(input.required_quantity, Some(q) if q < Decimal::ZERO) {
            return Err(AgriError::Validation(
                "required_quantity must not be negative".to_string(),
            ));
        }
        self.check_assignable(user, &input.supervisor_id).await?;

        if let Some((item_id, quantity)) = input.requirement() {
            let item = self.ledger.fetch(self.db.as_ref(), item_id).await?;
            if item.stock < quantity {
                warn!(
                    "✗ Task rejected, insufficient {}: needed {} {}, available {} {}",
                    item.item, quantity, item.unit, item.stock, item.unit
                );
                return Err(AgriError::InsufficientStock(format!(
                    "insufficient stock for {}. Needed: {} {}, Available: {} {}",
                    item.item, quantity, item.unit, item.stock, item.unit
                )));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();
        let required_item_id = input.required_item_id.filter(|id| !id.trim().is_empty());
        let active_model = TaskActiveModel {
            id: Set(id.clone()),
            task_type: Set(input.task_type),
            description: Set(input.description),
            plot: Set(input.plot),
            supervisor_id: Set(input.supervisor_id),
            status: Set(input.status.trim().to_string()),
            due_date: Set(input.due_date),
            required_item_id: Set(required_item_id),
            required_quantity: Set(input.required_quantity.map(format_quantity)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        TaskRepository::put(&self.db, active_model).await?;
        info!("✓ Task created: {} by {}", id, user.user_id);

        let task = TaskRepository::get(self.db.as_ref(), &id)
            .await?
            .ok_or_else(|| AgriError::not_found("Task", &id))?;
        TaskDto::try_from(task)
    }

    /// 修改任务详情（不含状态与物料需求）
    pub async fn update(&self, user: &CurrentUser, id: &str, patch: TaskPatch) -> AgriResult<TaskDto> {
        AccessScope::require_manager(user, "update tasks")?;
        if patch.is_empty() {
            return Err(AgriError::Validation("no fields provided for update".to_string()));
        }

        let mut fields = Vec::new();
        if let Some(task_type) = patch.task_type {
            fields.push((TaskColumn::TaskType, Expr::value(task_type)));
        }
        if let Some(description) = patch.description {
            fields.push((TaskColumn::Description, Expr::value(description)));
        }
        if let Some(plot) = patch.plot {
            fields.push((TaskColumn::Plot, Expr::value(plot)));
        }
        if let Some(supervisor_id) = patch.supervisor_id {
            self.check_assignable(user, &supervisor_id).await?;
            fields.push((TaskColumn::SupervisorId, Expr::value(supervisor_id)));
        }
        if let Some(due_date) = patch.due_date {
            fields.push((TaskColumn::DueDate, Expr::value(due_date)));
        }
        fields.push((TaskColumn::UpdatedAt, Expr::value(Utc::now().timestamp())));

        let condition = AccessScope::task_write_condition(&self.db, user).await?;
        match TaskRepository::update(self.db.as_ref(), id, fields, condition).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Task updated: {}", id);
                TaskDto::try_from(model)
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Task", id)),
            WriteOutcome::ConditionFailed => Err(AccessScope::denied(user, "update this task")),
        }
    }

    /// 状态流转。首次进入 completed 时在同一事务内：
    /// 先以旧状态为条件写入新状态，再条件扣减库存；任一步失败整体回滚。
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        id: &str,
        new_status: &str,
    ) -> AgriResult<TaskDto> {
        AccessScope::require_manager(user, "update task status")?;
        let new_status = new_status.trim();
        if new_status.is_empty() {
            return Err(AgriError::Validation("status must not be empty".to_string()));
        }

        let task = self.visible_task(user, id).await?;
        let scope = AccessScope::task_write_condition(&self.db, user).await?;

        let txn = self.db.begin().await?;
        match self.transition(&txn, &task, new_status, scope).await {
            Ok(updated) => {
                txn.commit().await?;
                info!(
                    "✓ Task {} status: {} -> {}",
                    id, task.status, updated.status
                );
                TaskDto::try_from(updated)
            }
            Err(e) => {
                txn.rollback().await?;
                warn!("✗ Task {} status change to {} aborted: {}", id, new_status, e);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, user: &CurrentUser, id: &str) -> AgriResult<TaskDto> {
        AccessScope::require_manager(user, "delete tasks")?;
        let condition = AccessScope::task_write_condition(&self.db, user).await?;
        match TaskRepository::delete(&self.db, id, condition).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Task deleted: {}", id);
                TaskDto::try_from(model)
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Task", id)),
            WriteOutcome::ConditionFailed => Err(AccessScope::denied(user, "delete this task")),
        }
    }

    async fn transition(
        &self,
        txn: &DatabaseTransaction,
        task: &TaskModel,
        new_status: &str,
        scope: Option<Condition>,
    ) -> AgriResult<TaskModel> {
        // 状态写入是事务的第一条语句：先拿写锁，并发的重复完成在这里落败
        let mut condition = Condition::all().add(TaskColumn::Status.eq(task.status.as_str()));
        if let Some(scope) = scope {
            condition = condition.add(scope);
        }
        let fields = vec![
            (TaskColumn::Status, Expr::value(new_status)),
            (TaskColumn::UpdatedAt, Expr::value(Utc::now().timestamp())),
        ];
        let updated = match TaskRepository::update(txn, &task.id, fields, Some(condition)).await? {
            WriteOutcome::Applied(model) => model,
            WriteOutcome::NotFound => return Err(AgriError::not_found("Task", &task.id)),
            WriteOutcome::ConditionFailed => {
                return Err(AgriError::ConditionFailed(format!(
                    "task {} changed concurrently, status is no longer {}",
                    task.id, task.status
                )))
            }
        };

        if let Some((item_id, quantity)) = decrement_needed(task, new_status)? {
            self.ledger.decrement_on(txn, item_id, quantity).await?;
        }
        Ok(updated)
    }

    async fn visible_task(&self, user: &CurrentUser, id: &str) -> AgriResult<TaskModel> {
        let task = TaskRepository::get(self.db.as_ref(), id)
            .await?
            .ok_or_else(|| AgriError::not_found("Task", id))?;
        if !AccessScope::can_see_task(&self.db, user, &task).await? {
            return Err(AccessScope::denied(user, "view this task"));
        }
        Ok(task)
    }

    /// 指派目标主管必须存在；FieldManager 只能指派给自己名下的主管
    async fn check_assignable(&self, user: &CurrentUser, supervisor_id: &str) -> AgriResult<()> {
        let supervisor = SupervisorRepository::get(&self.db, supervisor_id)
            .await?
            .ok_or_else(|| AgriError::not_found("Supervisor", supervisor_id))?;
        if user.role == Role::FieldManager
            && supervisor.field_manager_id.as_deref() != Some(user.user_id.as_str())
        {
            return Err(AccessScope::denied(user, "assign tasks to this supervisor"));
        }
        Ok(())
    }
}

/// 旧状态非 completed、新状态为 completed、且物料与正数量齐全时才扣减
fn decrement_needed<'a>(
    task: &'a TaskModel,
    new_status: &str,
) -> AgriResult<Option<(&'a str, Decimal)>> {
    if !is_completed(new_status) || is_completed(&task.status) {
        return Ok(None);
    }
    let (Some(item_id), Some(raw)) = (
        task.required_item_id.as_deref(),
        task.required_quantity.as_deref(),
    ) else {
        return Ok(None);
    };
    let quantity = crate::inventory::model::parse_quantity(raw, "required_quantity")?;
    Ok((quantity > Decimal::ZERO).then_some((item_id, quantity)))
}
