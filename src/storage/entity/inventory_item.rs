use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item: String,
    pub category: String,
    // 数量以规范化的十进制文本存储，条件更新直接比较该文本
    pub stock: String,
    pub unit: String,
    pub threshold: String,
    pub created_at: i64,
    pub last_updated: i64, // 微秒时间戳
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
