use super::{delete_by_key, update_fields, WriteOutcome};
use crate::storage::entity::task::{
    self, ActiveModel as TaskActiveModel, Column as TaskColumn, Entity as Task, Model as TaskModel,
};
use sea_orm::sea_query::{OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, Iterable,
    QueryFilter, QueryOrder, TransactionTrait,
};

pub struct TaskRepository;

impl TaskRepository {
    pub async fn get<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<TaskModel>, sea_orm::DbErr> {
        Task::find_by_id(id.to_string()).one(db).await
    }

    pub async fn put(db: &DatabaseConnection, model: TaskActiveModel) -> Result<(), sea_orm::DbErr> {
        Task::insert(model)
            .on_conflict(
                OnConflict::column(TaskColumn::Id)
                    .update_columns(TaskColumn::iter().filter(|c| !matches!(c, TaskColumn::Id)))
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn scan(db: &DatabaseConnection) -> Result<Vec<TaskModel>, sea_orm::DbErr> {
        Task::find()
            .order_by_asc(TaskColumn::CreatedAt)
            .order_by_asc(TaskColumn::Id)
            .all(db)
            .await
    }

    /// SupervisorId 索引查询
    pub async fn query_by_supervisor(
        db: &DatabaseConnection,
        supervisor_id: &str,
    ) -> Result<Vec<TaskModel>, sea_orm::DbErr> {
        Task::find()
            .filter(TaskColumn::SupervisorId.eq(supervisor_id))
            .order_by_asc(TaskColumn::CreatedAt)
            .order_by_asc(TaskColumn::Id)
            .all(db)
            .await
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: &str,
        fields: Vec<(TaskColumn, SimpleExpr)>,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<TaskModel>, sea_orm::DbErr> {
        update_fields::<Task, _>(db, id, task::Column::Id, fields, condition).await
    }

    pub async fn delete(
        db: &DatabaseConnection,
        id: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<TaskModel>, sea_orm::DbErr> {
        delete_by_key::<Task, _>(db, id, task::Column::Id, condition).await
    }
}
