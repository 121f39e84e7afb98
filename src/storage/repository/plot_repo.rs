use super::{delete_by_key, update_fields, WriteOutcome};
use crate::storage::entity::plot::{
    self, ActiveModel as PlotActiveModel, Column as PlotColumn, Entity as Plot, Model as PlotModel,
};
use sea_orm::sea_query::{OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Iterable, QueryFilter, QueryOrder,
};

pub struct PlotRepository;

impl PlotRepository {
    pub async fn get(
        db: &DatabaseConnection,
        id: &str,
    ) -> Result<Option<PlotModel>, sea_orm::DbErr> {
        Plot::find_by_id(id.to_string()).one(db).await
    }

    pub async fn put(db: &DatabaseConnection, model: PlotActiveModel) -> Result<(), sea_orm::DbErr> {
        Plot::insert(model)
            .on_conflict(
                OnConflict::column(PlotColumn::Id)
                    .update_columns(PlotColumn::iter().filter(|c| !matches!(c, PlotColumn::Id)))
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn scan(db: &DatabaseConnection) -> Result<Vec<PlotModel>, sea_orm::DbErr> {
        Plot::find()
            .order_by_asc(PlotColumn::PlotNumber)
            .all(db)
            .await
    }

    pub async fn query_by_field_manager(
        db: &DatabaseConnection,
        field_manager_id: &str,
    ) -> Result<Vec<PlotModel>, sea_orm::DbErr> {
        Plot::find()
            .filter(PlotColumn::FieldManagerId.eq(field_manager_id))
            .order_by_asc(PlotColumn::PlotNumber)
            .all(db)
            .await
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: &str,
        fields: Vec<(PlotColumn, SimpleExpr)>,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<PlotModel>, sea_orm::DbErr> {
        update_fields::<Plot, _>(db, id, plot::Column::Id, fields, condition).await
    }

    pub async fn delete(
        db: &DatabaseConnection,
        id: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<PlotModel>, sea_orm::DbErr> {
        delete_by_key::<Plot, _>(db, id, plot::Column::Id, condition).await
    }
}
