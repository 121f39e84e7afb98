use crate::access::{AccessScope, CurrentUser, Role};
use crate::error::AgriResult;
use crate::task::model::is_completed;
use log::info;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorPerformance {
    pub supervisor_id: String,
    pub name: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub completion_percentage: Decimal,
}

/// 按主管汇总任务完成率
pub struct MetricsAggregator {
    db: Arc<DatabaseConnection>,
}

impl MetricsAggregator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn compute(&self, user: &CurrentUser) -> AgriResult<Vec<SupervisorPerformance>> {
        if user.role == Role::Supervisor {
            return Ok(Vec::new());
        }

        let mut supervisors = AccessScope::scope_supervisors(&self.db, user).await?;
        supervisors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let ids: Vec<String> = supervisors.iter().map(|s| s.id.clone()).collect();
        let tasks = AccessScope::tasks_for_supervisors(&self.db, &ids).await?;

        let mut counts: HashMap<&str, (u64, u64)> = HashMap::new();
        for task in &tasks {
            let entry = counts.entry(task.supervisor_id.as_str()).or_default();
            entry.0 += 1;
            if is_completed(&task.status) {
                entry.1 += 1;
            }
        }

        let report: Vec<SupervisorPerformance> = supervisors
            .iter()
            .map(|s| {
                let (total, completed) = counts.get(s.id.as_str()).copied().unwrap_or_default();
                SupervisorPerformance {
                    supervisor_id: s.id.clone(),
                    name: s.name.clone(),
                    total_tasks: total,
                    completed_tasks: completed,
                    completion_percentage: completion_percentage(completed, total),
                }
            })
            .collect();
        info!(
            "Metrics for {}: {} supervisors, {} tasks",
            user.user_id,
            report.len(),
            tasks.len()
        );
        Ok(report)
    }
}

/// round(100 * completed / total, 2)，total 为 0 时为 0
pub fn completion_percentage(completed: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(completed * 100) / Decimal::from(total))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryLedger;
    use crate::supervisor::SupervisorService;
    use crate::task::TaskService;
    use crate::test_support::{
        farm_manager, field_manager, memory_db, supervisor_input, supervisor_user, task_input,
        unknown_role,
    };
    use crate::error::AgriError;

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(completion_percentage(2, 3), Decimal::new(6667, 2));
        assert_eq!(completion_percentage(1, 3), Decimal::new(3333, 2));
        assert_eq!(completion_percentage(1, 8), Decimal::new(125, 1));
        assert_eq!(completion_percentage(0, 0), Decimal::ZERO);
        assert_eq!(completion_percentage(4, 4), Decimal::from(100));
    }

    #[tokio::test]
    async fn metrics_follow_visible_supervisors() {
        let db = memory_db().await;
        let supervisors = SupervisorService::new(db.clone());
        let tasks = TaskService::new(db.clone(), Arc::new(InventoryLedger::new(db.clone())));
        let metrics = MetricsAggregator::new(db);
        let fm = farm_manager();

        let s = supervisors
            .create(&fm, supervisor_input("Suresh", Some("fdm-1")))
            .await
            .unwrap();
        let idle = supervisors
            .create(&fm, supervisor_input("Anil", Some("fdm-2")))
            .await
            .unwrap();

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(tasks.create(&fm, task_input(&s.id)).await.unwrap().id);
        }
        tasks.update_status(&fm, &ids[0], "Completed").await.unwrap();
        tasks.update_status(&fm, &ids[1], "completed").await.unwrap();

        let all = metrics.compute(&fm).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].supervisor_id, idle.id);
        assert_eq!(all[0].total_tasks, 0);
        assert_eq!(all[0].completion_percentage, Decimal::ZERO);
        assert_eq!(all[1].supervisor_id, s.id);
        assert_eq!(all[1].total_tasks, 3);
        assert_eq!(all[1].completed_tasks, 2);
        assert_eq!(all[1].completion_percentage, Decimal::new(6667, 2));

        let json = serde_json::to_value(&all[1]).unwrap();
        assert!((json["completion_percentage"].as_f64().unwrap() - 66.67).abs() < 1e-9);

        let scoped = metrics.compute(&field_manager("fdm-2")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "Anil");

        assert!(metrics.compute(&supervisor_user(&s.id)).await.unwrap().is_empty());
        assert!(matches!(
            metrics.compute(&unknown_role()).await,
            Err(AgriError::Forbidden(_))
        ));
    }
}
