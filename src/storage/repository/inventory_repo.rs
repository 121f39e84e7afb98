use super::{delete_by_key, update_fields, WriteOutcome};
use crate::storage::entity::inventory_item::{
    self, ActiveModel as InventoryActiveModel, Column as InventoryColumn,
    Entity as InventoryItem, Model as InventoryModel,
};
use sea_orm::sea_query::{Expr, OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, Iterable,
    QueryFilter, QueryOrder, TransactionTrait,
};

pub struct InventoryRepository;

impl InventoryRepository {
    pub async fn get<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<InventoryModel>, sea_orm::DbErr> {
        InventoryItem::find_by_id(id.to_string()).one(db).await
    }

    pub async fn put(
        db: &DatabaseConnection,
        model: InventoryActiveModel,
    ) -> Result<(), sea_orm::DbErr> {
        InventoryItem::insert(model)
            .on_conflict(
                OnConflict::column(InventoryColumn::Id)
                    .update_columns(
                        InventoryColumn::iter().filter(|c| !matches!(c, InventoryColumn::Id)),
                    )
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn scan(db: &DatabaseConnection) -> Result<Vec<InventoryModel>, sea_orm::DbErr> {
        InventoryItem::find()
            .order_by_asc(InventoryColumn::Item)
            .order_by_asc(InventoryColumn::Id)
            .all(db)
            .await
    }

    /// 只刷新 last_updated。作为事务的第一条语句执行时，
    /// 事务在读取库存之前就持有写锁。返回记录是否存在。
    pub async fn touch<C: ConnectionTrait>(
        db: &C,
        id: &str,
        now: i64,
    ) -> Result<bool, sea_orm::DbErr> {
        let res = InventoryItem::update_many()
            .col_expr(InventoryColumn::LastUpdated, Expr::value(now))
            .filter(InventoryColumn::Id.eq(id))
            .exec(db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// 比较并设置：仅当库存文本仍等于 `expected` 时写入 `new_stock`
    pub async fn compare_and_set_stock<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: &str,
        expected: &str,
        new_stock: &str,
        now: i64,
    ) -> Result<WriteOutcome<InventoryModel>, sea_orm::DbErr> {
        update_fields::<InventoryItem, _>(
            db,
            id,
            inventory_item::Column::Id,
            vec![
                (InventoryColumn::Stock, Expr::value(new_stock.to_string())),
                (InventoryColumn::LastUpdated, Expr::value(now)),
            ],
            Some(Condition::all().add(InventoryColumn::Stock.eq(expected))),
        )
        .await
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: &str,
        fields: Vec<(InventoryColumn, SimpleExpr)>,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome<InventoryModel>, sea_orm::DbErr> {
        update_fields::<InventoryItem, _>(db, id, inventory_item::Column::Id, fields, condition)
            .await
    }

    pub async fn delete(
        db: &DatabaseConnection,
        id: &str,
    ) -> Result<WriteOutcome<InventoryModel>, sea_orm::DbErr> {
        delete_by_key::<InventoryItem, _>(db, id, inventory_item::Column::Id, None).await
    }
}
