pub mod inventory_repo;
pub mod plot_repo;
pub mod supervisor_repo;
pub mod task_repo;

pub use inventory_repo::InventoryRepository;
pub use plot_repo::PlotRepository;
pub use supervisor_repo::SupervisorRepository;
pub use task_repo::TaskRepository;

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PrimaryKeyTrait, QueryFilter,
    TransactionTrait,
};

/// 条件写入（更新或删除）的结果
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<M> {
    Applied(M),
    NotFound,
    ConditionFailed,
}

/// 单条 UPDATE 语句写入一组字段，可附带条件；
/// 条件不满足时记录保持不变。UPDATE 与回读在同一事务内，
/// 且 UPDATE 是事务的第一条语句（先拿写锁，回读看到的就是本次写入）。
pub async fn update_fields<E, C>(
    db: &C,
    key: &str,
    key_col: E::Column,
    fields: Vec<(E::Column, SimpleExpr)>,
    condition: Option<Condition>,
) -> Result<WriteOutcome<E::Model>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait + TransactionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    let txn = db.begin().await?;
    let mut update = E::update_many().filter(key_col.eq(key));
    for (col, expr) in fields {
        update = update.col_expr(col, expr);
    }
    if let Some(cond) = condition {
        update = update.filter(cond);
    }
    let res = update.exec(&txn).await?;

    let current = E::find_by_id(key.to_string()).one(&txn).await?;
    txn.commit().await?;
    Ok(match (res.rows_affected, current) {
        (_, None) => WriteOutcome::NotFound,
        (0, Some(_)) => WriteOutcome::ConditionFailed,
        (_, Some(model)) => WriteOutcome::Applied(model),
    })
}

/// 按主键删除，可附带条件；返回被删除的记录
pub async fn delete_by_key<E, C>(
    db: &C,
    key: &str,
    key_col: E::Column,
    condition: Option<Condition>,
) -> Result<WriteOutcome<E::Model>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    let Some(existing) = E::find_by_id(key.to_string()).one(db).await? else {
        return Ok(WriteOutcome::NotFound);
    };

    let mut delete = E::delete_many().filter(key_col.eq(key));
    if let Some(cond) = condition {
        delete = delete.filter(cond);
    }
    let res = delete.exec(db).await?;
    if res.rows_affected == 0 {
        return Ok(WriteOutcome::ConditionFailed);
    }
    Ok(WriteOutcome::Applied(existing))
}
