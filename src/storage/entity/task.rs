use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_name = "type")]
    pub task_type: String,
    pub description: String,
    pub plot: String,
    pub supervisor_id: String,
    pub status: String, // 自由文本，与 "completed" 比较时忽略大小写
    #[sea_orm(nullable)]
    pub due_date: Option<Date>,
    #[sea_orm(nullable)]
    pub required_item_id: Option<String>,
    #[sea_orm(nullable)]
    pub required_quantity: Option<String>, // 十进制文本
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
