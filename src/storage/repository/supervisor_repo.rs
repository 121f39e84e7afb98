use super::{delete_by_key, update_fields, WriteOutcome};
use crate::storage::entity::supervisor::{
    self, ActiveModel as SupervisorActiveModel, Column as SupervisorColumn, Entity as Supervisor,
    Model as SupervisorModel,
};
use sea_orm::sea_query::{OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Iterable, QueryFilter, QueryOrder,
};

pub struct SupervisorRepository;

impl SupervisorRepository {
    pub async fn get(
        db: &DatabaseConnection,
        id: &str,
    ) -> Result<Option<SupervisorModel>, sea_orm::DbErr> {
        Supervisor::find_by_id(id.to_string()).one(db).await
    }

    /// 按主键 upsert
    pub async fn put(
        db: &DatabaseConnection,
        model: SupervisorActiveModel,
    ) -> Result<(), sea_orm::DbErr> {
        Supervisor::insert(model)
            .on_conflict(
                OnConflict::column(SupervisorColumn::Id)
                    .update_columns(
                        SupervisorColumn::iter().filter(|c| !matches!(c, SupervisorColumn::Id)),
                    )
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn scan(db: &DatabaseConnection) -> Result<Vec<SupervisorModel>, sea_orm::DbErr> {
        Supervisor::find()
            .order_by_asc(SupervisorColumn::Name)
            .order_by_asc(SupervisorColumn::Id)
            .all(db)
            .await
    }

    /// FieldManagerId 索引查询
    pub async fn query_by_field_manager(
        db: &DatabaseConnection,
        field_manager_id: &str,
    ) -> Result<Vec<SupervisorModel>, sea_orm::DbErr> {
        Supervisor::find()
            .filter(SupervisorColumn::FieldManagerId.eq(field_manager_id))
            .order_by_asc(SupervisorColumn::Name)
            .order_by_asc(SupervisorColumn::Id)
            .all(db)
            .await
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: &str,
        fields: Vec<(SupervisorColumn, SimpleExpr)>,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<SupervisorModel>, sea_orm::DbErr> {
        update_fields::<Supervisor, _>(db, id, supervisor::Column::Id, fields, condition).await
    }

    pub async fn delete(
        db: &DatabaseConnection,
        id: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<SupervisorModel>, sea_orm::DbErr> {
        delete_by_key::<Supervisor, _>(db, id, supervisor::Column::Id, condition).await
    }
}
