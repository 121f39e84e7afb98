use crate::access::identity::{CurrentUser, Role};
use crate::error::{AgriError, AgriResult};
use crate::storage::entity::plot::{Column as PlotColumn, Model as PlotModel};
use crate::storage::entity::supervisor::{Column as SupervisorColumn, Model as SupervisorModel};
use crate::storage::entity::task::{Column as TaskColumn, Model as TaskModel};
use crate::storage::repository::{PlotRepository, SupervisorRepository, TaskRepository};
use futures::future::try_join_all;
use log::{info, warn};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection};

/// 按角色计算可见记录集合，并校验写权限。
///
/// - FarmManager：全部可见
/// - FieldManager：`field_manager_id` 等于自身的主管与地块，以及这些主管名下的任务
/// - Supervisor：不能列出集合，只能按 id 读取与自身相关的记录
/// - 其它角色：一律拒绝
pub struct AccessScope;

impl AccessScope {
    pub async fn scope_supervisors(
        db: &DatabaseConnection,
        user: &CurrentUser,
    ) -> AgriResult<Vec<SupervisorModel>> {
        match &user.role {
            Role::FarmManager => {
                info!("Access: FarmManager {} (scanning supervisors)", user.user_id);
                Ok(SupervisorRepository::scan(db).await?)
            }
            Role::FieldManager => {
                info!("Access: FieldManager {} (querying supervisors index)", user.user_id);
                Ok(SupervisorRepository::query_by_field_manager(db, &user.user_id).await?)
            }
            _ => Err(Self::denied(user, "list supervisors")),
        }
    }

    pub async fn scope_tasks(
        db: &DatabaseConnection,
        user: &CurrentUser,
    ) -> AgriResult<Vec<TaskModel>> {
        match &user.role {
            Role::FarmManager => Ok(TaskRepository::scan(db).await?),
            Role::FieldManager => {
                let ids = Self::supervisor_ids(db, user).await?;
                Self::tasks_for_supervisors(db, &ids).await
            }
            _ => Err(Self::denied(user, "list tasks")),
        }
    }

    pub async fn scope_plots(
        db: &DatabaseConnection,
        user: &CurrentUser,
    ) -> AgriResult<Vec<PlotModel>> {
        match &user.role {
            Role::FarmManager => Ok(PlotRepository::scan(db).await?),
            Role::FieldManager => {
                Ok(PlotRepository::query_by_field_manager(db, &user.user_id).await?)
            }
            _ => Err(Self::denied(user, "list plots")),
        }
    }

    pub async fn supervisor_ids(
        db: &DatabaseConnection,
        user: &CurrentUser,
    ) -> AgriResult<Vec<String>> {
        Ok(Self::scope_supervisors(db, user)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }

    /// 每个主管走一次 SupervisorId 索引查询，结果按主管顺序拼接
    pub async fn tasks_for_supervisors(
        db: &DatabaseConnection,
        supervisor_ids: &[String],
    ) -> AgriResult<Vec<TaskModel>> {
        let batches = try_join_all(
            supervisor_ids
                .iter()
                .map(|id| TaskRepository::query_by_supervisor(db, id)),
        )
        .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// 创建/更新/删除仅限经理角色
    pub fn require_manager(user: &CurrentUser, action: &str) -> AgriResult<()> {
        if user.role.is_manager() {
            Ok(())
        } else {
            Err(Self::denied(user, action))
        }
    }

    pub fn can_see_supervisor(user: &CurrentUser, supervisor: &SupervisorModel) -> bool {
        match &user.role {
            Role::FarmManager => true,
            Role::FieldManager => {
                supervisor.field_manager_id.as_deref() == Some(user.user_id.as_str())
            }
            Role::Supervisor => supervisor.id == user.user_id,
            Role::Other(_) => false,
        }
    }

    pub fn can_see_plot(user: &CurrentUser, plot: &PlotModel) -> bool {
        match &user.role {
            Role::FarmManager => true,
            Role::FieldManager => plot.field_manager_id.as_deref() == Some(user.user_id.as_str()),
            Role::Supervisor => plot.supervisor_id.as_deref() == Some(user.user_id.as_str()),
            Role::Other(_) => false,
        }
    }

    pub async fn can_see_task(
        db: &DatabaseConnection,
        user: &CurrentUser,
        task: &TaskModel,
    ) -> AgriResult<bool> {
        Ok(match &user.role {
            Role::FarmManager => true,
            Role::FieldManager => SupervisorRepository::get(db, &task.supervisor_id)
                .await?
                .map(|s| s.field_manager_id.as_deref() == Some(user.user_id.as_str()))
                .unwrap_or(false),
            Role::Supervisor => task.supervisor_id == user.user_id,
            Role::Other(_) => false,
        })
    }

    /// FieldManager 写主管记录时附加的条件
    pub fn supervisor_write_condition(user: &CurrentUser) -> Option<Condition> {
        match user.role {
            Role::FieldManager => Some(
                Condition::all().add(SupervisorColumn::FieldManagerId.eq(user.user_id.as_str())),
            ),
            _ => None,
        }
    }

    pub fn plot_write_condition(user: &CurrentUser) -> Option<Condition> {
        match user.role {
            Role::FieldManager => {
                Some(Condition::all().add(PlotColumn::FieldManagerId.eq(user.user_id.as_str())))
            }
            _ => None,
        }
    }

    /// FieldManager 只能写自己主管名下的任务
    pub async fn task_write_condition(
        db: &DatabaseConnection,
        user: &CurrentUser,
    ) -> AgriResult<Option<Condition>> {
        match user.role {
            Role::FieldManager => {
                let ids = Self::supervisor_ids(db, user).await?;
                Ok(Some(
                    Condition::all().add(TaskColumn::SupervisorId.is_in(ids)),
                ))
            }
            _ => Ok(None),
        }
    }

    pub fn denied(user: &CurrentUser, action: &str) -> AgriError {
        warn!(
            "Access denied: {} ({}) cannot {}",
            user.user_id, user.role, action
        );
        AgriError::Forbidden(format!(
            "role {} is not allowed to {}",
            user.role, action
        ))
    }
}
