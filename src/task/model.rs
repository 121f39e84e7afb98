use crate::error::{AgriError, AgriResult};
use crate::inventory::model::parse_quantity;
use crate::storage::entity::task::Model as TaskModel;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const STATUS_PENDING: &str = "Pending";

/// 状态为自由文本，只有 "completed"（忽略大小写）有副作用
pub fn is_completed(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case("completed")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub description: String,
    pub plot: String,
    pub supervisor_id: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub required_item_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub required_quantity: Option<Decimal>,
}

impl TryFrom<TaskModel> for TaskDto {
    type Error = AgriError;

    fn try_from(model: TaskModel) -> AgriResult<Self> {
        let required_quantity = model
            .required_quantity
            .as_deref()
            .map(|raw| parse_quantity(raw, "required_quantity"))
            .transpose()?;
        Ok(Self {
            id: model.id,
            task_type: model.task_type,
            description: model.description,
            plot: model.plot,
            supervisor_id: model.supervisor_id,
            status: model.status,
            due_date: model.due_date,
            required_item_id: model.required_item_id,
            required_quantity,
        })
    }
}

fn default_status() -> String {
    STATUS_PENDING.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskCreate {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(alias = "task")]
    pub description: String,
    pub plot: String,
    pub supervisor_id: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub required_item_id: Option<String>,
    #[serde(default)]
    pub required_quantity: Option<Decimal>,
}

impl TaskCreate {
    /// 同时给出物料与数量时才需要库存
    pub fn requirement(&self) -> Option<(&str, Decimal)> {
        match (self.required_item_id.as_deref(), self.required_quantity) {
            (Some(item_id), Some(quantity)) if !item_id.trim().is_empty() => {
                Some((item_id, quantity))
            }
            _ => None,
        }
    }
}

/// 任务详情补丁；状态只能通过 update_status 修改，物料需求创建后不可变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,
    #[serde(default, alias = "task")]
    pub description: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.task_type.is_none()
            && self.description.is_none()
            && self.plot.is_none()
            && self.supervisor_id.is_none()
            && self.due_date.is_none()
    }
}
