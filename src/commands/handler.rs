use crate::access::{CurrentUser, IdentityProvider};
use crate::app_service::AgriServices;
use crate::app_state::{AppEvent, SessionState};
use crate::commands::app_command::{AppCommand, Resource, HELP_TEXT};
use crate::error::{AgriError, AgriResult};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 后台 worker：串行处理命令，结果以事件形式发回
pub async fn serve(
    services: Arc<AgriServices>,
    identity: Arc<dyn IdentityProvider>,
    mut session: SessionState,
    mut cmd_rx: mpsc::UnboundedReceiver<AppCommand>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            AppCommand::Quit => {
                let _ = evt_tx.send(AppEvent::Shutdown);
                break;
            }
            AppCommand::Help => {
                let _ = evt_tx.send(AppEvent::Message(HELP_TEXT.to_string()));
            }
            AppCommand::Unknown(msg) => {
                if !msg.is_empty() {
                    let _ = evt_tx.send(AppEvent::Message(msg));
                }
            }
            AppCommand::Login { token } => match identity.resolve(Some(&token)).await {
                Ok(user) => {
                    info!("Console identity switched to {} ({})", user.user_id, user.role);
                    let _ = evt_tx.send(AppEvent::Message(format!(
                        "✓ 已登录: {} ({})",
                        user.user_id, user.role
                    )));
                    session.token = Some(token);
                }
                Err(e) => {
                    let _ = evt_tx.send(AppEvent::from_error(&e));
                }
            },
            cmd => {
                let result = match identity.resolve(session.token.as_deref()).await {
                    Ok(user) => execute(&services, &user, cmd).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(value) => {
                        let _ = evt_tx.send(AppEvent::Json(value));
                    }
                    Err(e) => {
                        if matches!(e, AgriError::StoreUnavailable(_) | AgriError::Internal(_)) {
                            error!("Command failed: {}", e);
                        }
                        let _ = evt_tx.send(AppEvent::from_error(&e));
                    }
                }
            }
        }
    }
    info!("Command worker stopped");
}

/// 以给定身份执行一条需要身份的命令
pub async fn execute(
    services: &AgriServices,
    user: &CurrentUser,
    cmd: AppCommand,
) -> AgriResult<Value> {
    match cmd {
        AppCommand::WhoAmI => to_json(user),
        AppCommand::Metrics => to_json(services.metrics.compute(user).await?),
        AppCommand::InventoryLow => to_json(services.inventory.low_stock(user).await?),
        AppCommand::TaskStatus { id, status } => {
            to_json(services.tasks.update_status(user, &id, &status).await?)
        }
        AppCommand::List { resource } => match resource {
            Resource::Plots => to_json(services.plots.list(user).await?),
            Resource::Supervisors => to_json(services.supervisors.list(user).await?),
            Resource::Tasks => to_json(services.tasks.list(user).await?),
            Resource::Inventory => to_json(services.inventory.list(user).await?),
        },
        AppCommand::Get { resource, id } => match resource {
            Resource::Plots => to_json(services.plots.get(user, &id).await?),
            Resource::Supervisors => to_json(services.supervisors.get(user, &id).await?),
            Resource::Tasks => to_json(services.tasks.get(user, &id).await?),
            Resource::Inventory => to_json(services.inventory.get(user, &id).await?),
        },
        AppCommand::Create { resource, payload } => match resource {
            Resource::Plots => to_json(services.plots.create(user, parse(&payload)?).await?),
            Resource::Supervisors => {
                to_json(services.supervisors.create(user, parse(&payload)?).await?)
            }
            Resource::Tasks => to_json(services.tasks.create(user, parse(&payload)?).await?),
            Resource::Inventory => {
                to_json(services.inventory.create(user, parse(&payload)?).await?)
            }
        },
        AppCommand::Update {
            resource,
            id,
            payload,
        } => match resource {
            Resource::Plots => to_json(services.plots.update(user, &id, parse(&payload)?).await?),
            Resource::Supervisors => {
                to_json(services.supervisors.update(user, &id, parse(&payload)?).await?)
            }
            Resource::Tasks => to_json(services.tasks.update(user, &id, parse(&payload)?).await?),
            Resource::Inventory => {
                to_json(services.inventory.update(user, &id, parse(&payload)?).await?)
            }
        },
        AppCommand::Delete { resource, id } => match resource {
            Resource::Plots => to_json(services.plots.delete(user, &id).await?),
            Resource::Supervisors => to_json(services.supervisors.delete(user, &id).await?),
            Resource::Tasks => to_json(services.tasks.delete(user, &id).await?),
            Resource::Inventory => to_json(services.inventory.delete(user, &id).await?),
        },
        other => Err(AgriError::Validation(format!(
            "command does not run under an identity: {:?}",
            other
        ))),
    }
}

fn parse<T: DeserializeOwned>(payload: &str) -> AgriResult<T> {
    serde_json::from_str(payload)
        .map_err(|e| AgriError::Validation(format!("invalid JSON payload: {}", e)))
}

fn to_json<T: Serialize>(value: T) -> AgriResult<Value> {
    serde_json::to_value(value).map_err(|e| AgriError::Internal(e.to_string()))
}
