use crate::error::{AgriError, AgriResult};
use crate::storage::entity::inventory_item::Model as InventoryModel;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 对外返回的库存条目，数量在这里才转换为浮点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemDto {
    pub id: String,
    pub item: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub stock: Decimal,
    pub unit: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub threshold: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl InventoryItemDto {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.threshold
    }
}

impl TryFrom<InventoryModel> for InventoryItemDto {
    type Error = AgriError;

    fn try_from(model: InventoryModel) -> AgriResult<Self> {
        let stock = parse_quantity(&model.stock, "stock")?;
        let threshold = parse_quantity(&model.threshold, "threshold")?;
        let last_updated = from_micros(model.last_updated)?;
        Ok(Self {
            id: model.id,
            item: model.item,
            category: model.category,
            stock,
            unit: model.unit,
            threshold,
            last_updated,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItemCreate {
    pub item: String,
    pub category: String,
    pub stock: Decimal,
    pub unit: String,
    #[serde(default)]
    pub threshold: Decimal,
}

/// 库存更新：`stock_change`（增量）与 `new_stock`（绝对值）二选一
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryUpdate {
    pub stock_change: Option<Decimal>,
    pub new_stock: Option<Decimal>,
    pub category: Option<String>,
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Delta(Decimal),
    Absolute(Decimal),
}

impl InventoryUpdate {
    pub fn stock_adjustment(&self) -> AgriResult<Option<StockAdjustment>> {
        match (self.stock_change, self.new_stock) {
            (Some(_), Some(_)) => Err(AgriError::Validation(
                "provide either stock_change or new_stock, not both".to_string(),
            )),
            (Some(delta), None) => Ok(Some(StockAdjustment::Delta(delta))),
            (None, Some(value)) => Ok(Some(StockAdjustment::Absolute(value))),
            (None, None) => Ok(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stock_change.is_none()
            && self.new_stock.is_none()
            && self.category.is_none()
            && self.threshold.is_none()
    }
}

pub fn parse_quantity(raw: &str, field: &str) -> AgriResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| AgriError::Internal(format!("stored {} '{}' is not a decimal: {}", field, raw, e)))
}

/// 存储用的规范文本
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub fn from_micros(us: i64) -> AgriResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(us)
        .ok_or_else(|| AgriError::Internal(format!("timestamp {} out of range", us)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_stock_modes_are_rejected() {
        let update = InventoryUpdate {
            stock_change: Some(Decimal::from(-5)),
            new_stock: Some(Decimal::from(10)),
            ..Default::default()
        };
        assert!(matches!(
            update.stock_adjustment(),
            Err(AgriError::Validation(_))
        ));
    }

    #[test]
    fn update_payload_accepts_json_numbers() {
        let update: InventoryUpdate = serde_json::from_str(r#"{"stock_change": -2.5}"#).unwrap();
        assert_eq!(
            update.stock_adjustment().unwrap(),
            Some(StockAdjustment::Delta(Decimal::new(-25, 1)))
        );
        assert!(!update.is_empty());
        assert!(InventoryUpdate::default().is_empty());
    }

    #[test]
    fn quantities_are_stored_without_trailing_zeros() {
        assert_eq!(format_quantity(Decimal::new(7000, 2)), "70");
        assert_eq!(format_quantity(Decimal::new(125, 2)), "1.25");
        assert_eq!(parse_quantity("0.1", "stock").unwrap(), Decimal::new(1, 1));
        assert!(parse_quantity("abc", "stock").is_err());
    }

    #[test]
    fn dto_serializes_quantities_as_numbers() {
        let dto = InventoryItemDto {
            id: "i-1".to_string(),
            item: "Urea".to_string(),
            category: "Fertilizer".to_string(),
            stock: Decimal::new(705, 1),
            unit: "kg".to_string(),
            threshold: Decimal::from(10),
            last_updated: from_micros(1_700_000_000_000_000).unwrap(),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["stock"], serde_json::json!(70.5));
        assert_eq!(json["threshold"], serde_json::json!(10.0));
    }
}
