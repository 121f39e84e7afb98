use crate::access::{AccessScope, CurrentUser, Role};
use crate::error::{AgriError, AgriResult};
use crate::inventory::model::{
    format_quantity, now_micros, parse_quantity, InventoryItemCreate, InventoryItemDto,
    InventoryUpdate, StockAdjustment,
};
use crate::storage::entity::inventory_item::{
    ActiveModel as InventoryActiveModel, Column as InventoryColumn,
};
use crate::storage::repository::{InventoryRepository, WriteOutcome};
use log::{info, warn};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, Set,
    TransactionTrait,
};
use std::sync::Arc;

/// 库存调整在比较并设置失败（并发写入）后的最大重试次数
const CAS_ATTEMPTS: usize = 5;

/// 库存台账：唯一持有库存数量的组件
pub struct InventoryLedger {
    db: Arc<DatabaseConnection>,
}

impl InventoryLedger {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user: &CurrentUser) -> AgriResult<Vec<InventoryItemDto>> {
        AccessScope::require_manager(user, "view inventory")?;
        InventoryRepository::scan(&self.db)
            .await?
            .into_iter()
            .map(InventoryItemDto::try_from)
            .collect()
    }

    /// 库存低于等于预警线的条目
    pub async fn low_stock(&self, user: &CurrentUser) -> AgriResult<Vec<InventoryItemDto>> {
        Ok(self
            .list(user)
            .await?
            .into_iter()
            .filter(InventoryItemDto::is_low_stock)
            .collect())
    }

    pub async fn get(&self, user: &CurrentUser, item_id: &str) -> AgriResult<InventoryItemDto> {
        if let Role::Other(_) = user.role {
            return Err(AccessScope::denied(user, "view inventory"));
        }
        self.fetch(self.db.as_ref(), item_id).await
    }

    pub async fn create(
        &self,
        user: &CurrentUser,
        input: InventoryItemCreate,
    ) -> AgriResult<InventoryItemDto> {
        AccessScope::require_manager(user, "create inventory items")?;
        if input.item.trim().is_empty() {
            return Err(AgriError::Validation("item name must not be empty".to_string()));
        }
        if input.stock < Decimal::ZERO {
            return Err(AgriError::Validation("stock must not be negative".to_string()));
        }
        if input.threshold < Decimal::ZERO {
            return Err(AgriError::Validation("threshold must not be negative".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = now_micros();
        let active_model = InventoryActiveModel {
            id: Set(id.clone()),
            item: Set(input.item),
            category: Set(input.category),
            stock: Set(format_quantity(input.stock)),
            unit: Set(input.unit),
            threshold: Set(format_quantity(input.threshold)),
            created_at: Set(now),
            last_updated: Set(now),
        };
        InventoryRepository::put(&self.db, active_model).await?;
        info!("✓ Inventory item created: {}", id);

        self.fetch(self.db.as_ref(), &id).await
    }

    /// 调整库存：增量或绝对值，始终刷新 last_updated
    pub async fn adjust(
        &self,
        user: &CurrentUser,
        item_id: &str,
        adjustment: StockAdjustment,
    ) -> AgriResult<InventoryItemDto> {
        AccessScope::require_manager(user, "update inventory")?;
        self.apply(item_id, Some(adjustment), Vec::new()).await
    }

    /// 完整的库存更新请求（库存调整 + 类别/预警线）
    pub async fn update(
        &self,
        user: &CurrentUser,
        item_id: &str,
        update: InventoryUpdate,
    ) -> AgriResult<InventoryItemDto> {
        AccessScope::require_manager(user, "update inventory")?;
        if update.is_empty() {
            return Err(AgriError::Validation("no update fields provided".to_string()));
        }
        let adjustment = update.stock_adjustment()?;

        let mut extra = Vec::new();
        if let Some(category) = update.category {
            extra.push((InventoryColumn::Category, Expr::value(category)));
        }
        if let Some(threshold) = update.threshold {
            if threshold < Decimal::ZERO {
                return Err(AgriError::Validation("threshold must not be negative".to_string()));
            }
            extra.push((InventoryColumn::Threshold, Expr::value(format_quantity(threshold))));
        }

        self.apply(item_id, adjustment, extra).await
    }

    /// 原子条件扣减：仅当 stock >= quantity 时执行 stock -= quantity
    pub async fn conditional_decrement(
        &self,
        item_id: &str,
        quantity: Decimal,
    ) -> AgriResult<InventoryItemDto> {
        let txn = self.db.begin().await?;
        match self.decrement_on(&txn, item_id, quantity).await {
            Ok(item) => {
                txn.commit().await?;
                Ok(item)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, user: &CurrentUser, item_id: &str) -> AgriResult<InventoryItemDto> {
        AccessScope::require_manager(user, "delete inventory items")?;
        match InventoryRepository::delete(&self.db, item_id).await? {
            WriteOutcome::Applied(model) => {
                info!("✓ Inventory item deleted: {}", item_id);
                InventoryItemDto::try_from(model)
            }
            WriteOutcome::NotFound | WriteOutcome::ConditionFailed => {
                Err(AgriError::not_found("Inventory item", item_id))
            }
        }
    }

    pub(crate) async fn fetch<C: ConnectionTrait>(
        &self,
        conn: &C,
        item_id: &str,
    ) -> AgriResult<InventoryItemDto> {
        InventoryRepository::get(conn, item_id)
            .await?
            .ok_or_else(|| AgriError::not_found("Inventory item", item_id))
            .and_then(InventoryItemDto::try_from)
    }

    /// 在调用方的事务内执行条件扣减。
    /// 先写后读：touch 拿到写锁后，读到的库存在提交前不会再被别人改动。
    pub(crate) async fn decrement_on(
        &self,
        txn: &DatabaseTransaction,
        item_id: &str,
        quantity: Decimal,
    ) -> AgriResult<InventoryItemDto> {
        if quantity <= Decimal::ZERO {
            return Err(AgriError::Validation(
                "decrement quantity must be positive".to_string(),
            ));
        }

        let now = now_micros();
        if !InventoryRepository::touch(txn, item_id, now).await? {
            return Err(AgriError::not_found("Inventory item", item_id));
        }
        let model = InventoryRepository::get(txn, item_id)
            .await?
            .ok_or_else(|| AgriError::not_found("Inventory item", item_id))?;
        let stock = parse_quantity(&model.stock, "stock")?;
        if stock < quantity {
            warn!(
                "✗ Insufficient stock for {} ({}): needed {} {}, available {} {}",
                model.item, item_id, quantity, model.unit, stock, model.unit
            );
            return Err(AgriError::InsufficientStock(format!(
                "insufficient stock for {}. Needed: {} {}, Available: {} {}",
                model.item, quantity, model.unit, stock, model.unit
            )));
        }

        let new_stock = format_quantity(stock - quantity);
        match InventoryRepository::compare_and_set_stock(txn, item_id, &model.stock, &new_stock, now)
            .await?
        {
            WriteOutcome::Applied(updated) => {
                info!(
                    "✓ Stock decremented for item {}: -{} {}",
                    item_id, quantity, model.unit
                );
                InventoryItemDto::try_from(updated)
            }
            WriteOutcome::NotFound => Err(AgriError::not_found("Inventory item", item_id)),
            WriteOutcome::ConditionFailed => Err(AgriError::ConditionFailed(format!(
                "stock of item {} changed during decrement",
                item_id
            ))),
        }
    }

    async fn apply(
        &self,
        item_id: &str,
        adjustment: Option<StockAdjustment>,
        extra: Vec<(InventoryColumn, SimpleExpr)>,
    ) -> AgriResult<InventoryItemDto> {
        for _ in 0..CAS_ATTEMPTS {
            let mut fields = extra.clone();
            let mut condition: Option<Condition> = None;

            match adjustment {
                Some(StockAdjustment::Absolute(value)) => {
                    if value < Decimal::ZERO {
                        return Err(AgriError::Validation(
                            "stock must not be negative".to_string(),
                        ));
                    }
                    fields.push((InventoryColumn::Stock, Expr::value(format_quantity(value))));
                }
                Some(StockAdjustment::Delta(delta)) => {
                    let model = InventoryRepository::get(self.db.as_ref(), item_id)
                        .await?
                        .ok_or_else(|| AgriError::not_found("Inventory item", item_id))?;
                    let stock = parse_quantity(&model.stock, "stock")?;
                    let new_stock = stock + delta;
                    if new_stock < Decimal::ZERO {
                        warn!(
                            "✗ Adjustment of {} on item {} would make stock negative",
                            delta, item_id
                        );
                        return Err(AgriError::InsufficientStock(format!(
                            "adjustment {} exceeds available stock {} of item {}",
                            delta, stock, item_id
                        )));
                    }
                    fields.push((InventoryColumn::Stock, Expr::value(format_quantity(new_stock))));
                    condition = Some(Condition::all().add(InventoryColumn::Stock.eq(model.stock)));
                }
                None => {}
            }
            fields.push((InventoryColumn::LastUpdated, Expr::value(now_micros())));

            match InventoryRepository::update(self.db.as_ref(), item_id, fields, condition)
                .await?
            {
                WriteOutcome::Applied(model) => {
                    info!("✓ Inventory item updated: {}", item_id);
                    return InventoryItemDto::try_from(model);
                }
                WriteOutcome::NotFound => {
                    return Err(AgriError::not_found("Inventory item", item_id))
                }
                WriteOutcome::ConditionFailed => continue,
            }
        }

        Err(AgriError::ConditionFailed(format!(
            "stock of item {} kept changing, update abandoned",
            item_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        farm_manager, field_manager, inventory_input, memory_db, supervisor_user, unknown_role,
    };
    use std::time::Duration;

    #[tokio::test]
    async fn adjust_round_trip_refreshes_timestamp() {
        let ledger = InventoryLedger::new(memory_db().await);
        let fm = farm_manager();
        let created = ledger
            .create(&fm, inventory_input("Urea", 100, 10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        ledger
            .adjust(&fm, &created.id, StockAdjustment::Delta(Decimal::from(-30)))
            .await
            .unwrap();

        let fetched = ledger.get(&fm, &created.id).await.unwrap();
        assert_eq!(fetched.stock, Decimal::from(70));
        assert_eq!(fetched.threshold, Decimal::from(10));
        assert!(fetched.last_updated > created.last_updated);
    }

    #[tokio::test]
    async fn delta_below_zero_is_rejected() {
        let ledger = InventoryLedger::new(memory_db().await);
        let fm = farm_manager();
        let item = ledger.create(&fm, inventory_input("Urea", 5, 1)).await.unwrap();

        let err = ledger
            .adjust(&fm, &item.id, StockAdjustment::Delta(Decimal::from(-6)))
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::InsufficientStock(_)));
        assert!(matches!(
            ledger
                .adjust(&fm, &item.id, StockAdjustment::Absolute(Decimal::from(-1)))
                .await,
            Err(AgriError::Validation(_))
        ));
        assert_eq!(ledger.get(&fm, &item.id).await.unwrap().stock, Decimal::from(5));
    }

    #[tokio::test]
    async fn update_validates_payload() {
        let ledger = InventoryLedger::new(memory_db().await);
        let fm = farm_manager();
        let item = ledger.create(&fm, inventory_input("Urea", 5, 1)).await.unwrap();

        assert!(matches!(
            ledger.update(&fm, &item.id, InventoryUpdate::default()).await,
            Err(AgriError::Validation(_))
        ));
        let both = InventoryUpdate {
            stock_change: Some(Decimal::ONE),
            new_stock: Some(Decimal::TEN),
            ..Default::default()
        };
        assert!(matches!(
            ledger.update(&fm, &item.id, both).await,
            Err(AgriError::Validation(_))
        ));

        let recategorised = InventoryUpdate {
            category: Some("Nitrogen".to_string()),
            threshold: Some(Decimal::from(8)),
            ..Default::default()
        };
        let updated = ledger.update(&fm, &item.id, recategorised).await.unwrap();
        assert_eq!(updated.category, "Nitrogen");
        assert_eq!(updated.stock, Decimal::from(5));
        assert!(updated.is_low_stock());

        assert!(matches!(
            ledger
                .update(
                    &fm,
                    "missing",
                    InventoryUpdate {
                        new_stock: Some(Decimal::ONE),
                        ..Default::default()
                    }
                )
                .await,
            Err(AgriError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn conditional_decrement_checks_stock() {
        let ledger = InventoryLedger::new(memory_db().await);
        let item = ledger
            .create(&farm_manager(), inventory_input("Seed", 3, 0))
            .await
            .unwrap();

        let after = ledger
            .conditional_decrement(&item.id, Decimal::new(25, 1))
            .await
            .unwrap();
        assert_eq!(after.stock, Decimal::new(5, 1));

        assert!(matches!(
            ledger.conditional_decrement(&item.id, Decimal::ONE).await,
            Err(AgriError::InsufficientStock(_))
        ));
        assert!(matches!(
            ledger.conditional_decrement("missing", Decimal::ONE).await,
            Err(AgriError::NotFound(_))
        ));
        assert!(matches!(
            ledger.conditional_decrement(&item.id, Decimal::ZERO).await,
            Err(AgriError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn low_stock_and_access() {
        let ledger = InventoryLedger::new(memory_db().await);
        let fm = farm_manager();
        ledger.create(&fm, inventory_input("Urea", 100, 10)).await.unwrap();
        let low = ledger.create(&fm, inventory_input("Potash", 10, 10)).await.unwrap();

        let flagged = ledger.low_stock(&field_manager("fdm-1")).await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, low.id);

        assert!(ledger.get(&supervisor_user("sup-1"), &low.id).await.is_ok());
        assert!(matches!(
            ledger.list(&supervisor_user("sup-1")).await,
            Err(AgriError::Forbidden(_))
        ));
        assert!(matches!(
            ledger.get(&unknown_role(), &low.id).await,
            Err(AgriError::Forbidden(_))
        ));

        let removed = ledger.delete(&fm, &low.id).await.unwrap();
        assert_eq!(removed.item, "Potash");
        assert!(matches!(
            ledger.get(&fm, &low.id).await,
            Err(AgriError::NotFound(_))
        ));
    }
}
