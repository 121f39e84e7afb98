#![allow(dead_code)]

use crate::access::{CurrentUser, Role};
use crate::inventory::InventoryItemCreate;
use crate::plot::{Geolocation, PlotCreate};
use crate::storage::establish_connection;
use crate::supervisor::SupervisorCreate;
use crate::task::model::{TaskCreate, STATUS_PENDING};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tempfile::TempDir;

pub async fn memory_db() -> Arc<DatabaseConnection> {
    Arc::new(
        establish_connection("sqlite::memory:")
            .await
            .expect("in-memory sqlite"),
    )
}

/// 文件库走真实连接池，事务之间会真正并发。
/// 返回的 TempDir 需要活得比连接久。
pub async fn file_db() -> (TempDir, Arc<DatabaseConnection>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("agriscale.db").display()
    );
    let db = establish_connection(&url).await.expect("file sqlite");
    (dir, Arc::new(db))
}

pub fn farm_manager() -> CurrentUser {
    CurrentUser::new("fm-1", Role::FarmManager)
}

pub fn field_manager(id: &str) -> CurrentUser {
    CurrentUser::new(id, Role::FieldManager)
}

pub fn supervisor_user(id: &str) -> CurrentUser {
    CurrentUser::new(id, Role::Supervisor)
}

pub fn unknown_role() -> CurrentUser {
    CurrentUser::new("x-1", Role::Other("Auditor".to_string()))
}

pub fn supervisor_input(name: &str, field_manager_id: Option<&str>) -> SupervisorCreate {
    SupervisorCreate {
        name: name.to_string(),
        email: format!("{}@farm.example", name.to_lowercase()),
        phone: "555-0100".to_string(),
        assigned_plots: Vec::new(),
        field_manager_id: field_manager_id.map(str::to_string),
    }
}

pub fn plot_input(plot_number: &str, field_manager_id: Option<&str>) -> PlotCreate {
    PlotCreate {
        name: format!("Plot {}", plot_number),
        plot_number: plot_number.to_string(),
        geolocation: Geolocation {
            latitude: 17.385,
            longitude: 78.4867,
        },
        supervisor_id: None,
        field_manager_id: field_manager_id.map(str::to_string),
    }
}

pub fn inventory_input(item: &str, stock: i64, threshold: i64) -> InventoryItemCreate {
    InventoryItemCreate {
        item: item.to_string(),
        category: "Fertilizer".to_string(),
        stock: Decimal::from(stock),
        unit: "kg".to_string(),
        threshold: Decimal::from(threshold),
    }
}

pub fn task_input(supervisor_id: &str) -> TaskCreate {
    TaskCreate {
        task_type: "Fertilizing".to_string(),
        description: "Top dressing".to_string(),
        plot: "p-1".to_string(),
        supervisor_id: supervisor_id.to_string(),
        status: STATUS_PENDING.to_string(),
        due_date: None,
        required_item_id: None,
        required_quantity: None,
    }
}
