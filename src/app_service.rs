use crate::inventory::InventoryLedger;
use crate::metrics::MetricsAggregator;
use crate::plot::PlotService;
use crate::supervisor::SupervisorService;
use crate::task::TaskService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// 共享同一连接池的全部业务服务
pub struct AgriServices {
    pub supervisors: SupervisorService,
    pub plots: PlotService,
    pub tasks: TaskService,
    pub inventory: Arc<InventoryLedger>,
    pub metrics: MetricsAggregator,
}

impl AgriServices {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let inventory = Arc::new(InventoryLedger::new(db.clone()));
        Self {
            supervisors: SupervisorService::new(db.clone()),
            plots: PlotService::new(db.clone()),
            tasks: TaskService::new(db.clone(), inventory.clone()),
            inventory,
            metrics: MetricsAggregator::new(db),
        }
    }
}
