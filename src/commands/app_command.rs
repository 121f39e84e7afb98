use std::fmt;
use std::str::FromStr;

/// 控制台可操作的资源集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Plots,
    Supervisors,
    Tasks,
    Inventory,
}

impl FromStr for Resource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plot" | "plots" => Ok(Resource::Plots),
            "supervisor" | "supervisors" => Ok(Resource::Supervisors),
            "task" | "tasks" => Ok(Resource::Tasks),
            "inventory" | "inv" => Ok(Resource::Inventory),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Plots => "plots",
            Resource::Supervisors => "supervisors",
            Resource::Tasks => "tasks",
            Resource::Inventory => "inventory",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Login {
        token: String,
    },
    WhoAmI,
    List {
        resource: Resource,
    },
    Get {
        resource: Resource,
        id: String,
    },
    /// payload 为 JSON 文本
    Create {
        resource: Resource,
        payload: String,
    },
    Update {
        resource: Resource,
        id: String,
        payload: String,
    },
    Delete {
        resource: Resource,
        id: String,
    },
    TaskStatus {
        id: String,
        status: String,
    },
    InventoryLow,
    Metrics,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
可用命令:
  login <token>                         切换身份
  whoami                                显示当前身份
  <resource> list                       列出可见记录
  <resource> get <id>                   按 id 读取
  <resource> create <json>              创建记录
  <resource> update <id> <json>         部分更新
  <resource> delete <id>                删除记录
  tasks status <id> <status...>         修改任务状态
  inventory low                         低库存条目
  metrics                               主管任务完成率
  help | quit
  resource: plots | supervisors | tasks | inventory";

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "login" => match parts.get(1) {
                Some(token) => Ok(AppCommand::Login {
                    token: token.to_string(),
                }),
                None => Ok(AppCommand::Unknown("用法: login <token>".to_string())),
            },
            "whoami" => Ok(AppCommand::WhoAmI),
            "metrics" => Ok(AppCommand::Metrics),
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            head => match head.parse::<Resource>() {
                Ok(resource) => Ok(parse_resource_command(resource, s, &parts)),
                Err(()) => Ok(AppCommand::Unknown(format!("未知命令: {}", head))),
            },
        }
    }
}

fn parse_resource_command(resource: Resource, line: &str, parts: &[&str]) -> AppCommand {
    let usage = |action: &str| AppCommand::Unknown(format!("用法: {} {}", resource, action));

    match parts.get(1).copied() {
        Some("list") => AppCommand::List { resource },
        Some("get") => match parts.get(2) {
            Some(id) => AppCommand::Get {
                resource,
                id: id.to_string(),
            },
            None => usage("get <id>"),
        },
        Some("create") => {
            let payload = rest_after(line, 2);
            if payload.is_empty() {
                usage("create <json>")
            } else {
                AppCommand::Create {
                    resource,
                    payload: payload.to_string(),
                }
            }
        }
        Some("update") => {
            let payload = rest_after(line, 3);
            match parts.get(2) {
                Some(id) if !payload.is_empty() => AppCommand::Update {
                    resource,
                    id: id.to_string(),
                    payload: payload.to_string(),
                },
                _ => usage("update <id> <json>"),
            }
        }
        Some("delete") => match parts.get(2) {
            Some(id) => AppCommand::Delete {
                resource,
                id: id.to_string(),
            },
            None => usage("delete <id>"),
        },
        Some("status") if resource == Resource::Tasks => {
            let status = rest_after(line, 3);
            match parts.get(2) {
                Some(id) if !status.is_empty() => AppCommand::TaskStatus {
                    id: id.to_string(),
                    status: status.to_string(),
                },
                _ => usage("status <id> <status...>"),
            }
        }
        Some("low") if resource == Resource::Inventory => AppCommand::InventoryLow,
        Some(other) => AppCommand::Unknown(format!("未知的 {} 子命令: {}", resource, other)),
        None => usage("list | get | create | update | delete"),
    }
}

/// 跳过前 n 个以空白分隔的词，保留剩余原文（JSON 里的空格不受影响）
fn rest_after(line: &str, n: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..n {
        match rest.find(char::is_whitespace) {
            Some(pos) => rest = rest[pos..].trim_start(),
            None => return "",
        }
    }
    rest.trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> AppCommand {
        s.parse().unwrap()
    }

    #[test]
    fn parses_resource_verbs() {
        assert_eq!(
            parse("plots list"),
            AppCommand::List {
                resource: Resource::Plots
            }
        );
        assert_eq!(
            parse("supervisor get s-1"),
            AppCommand::Get {
                resource: Resource::Supervisors,
                id: "s-1".to_string()
            }
        );
        assert_eq!(
            parse("inventory delete i-9"),
            AppCommand::Delete {
                resource: Resource::Inventory,
                id: "i-9".to_string()
            }
        );
        assert_eq!(parse("inventory low"), AppCommand::InventoryLow);
        assert_eq!(parse("metrics"), AppCommand::Metrics);
    }

    #[test]
    fn json_payload_keeps_inner_spacing() {
        assert_eq!(
            parse(r#"tasks create {"type": "Harvest", "description": "Cut  wheat"}"#),
            AppCommand::Create {
                resource: Resource::Tasks,
                payload: r#"{"type": "Harvest", "description": "Cut  wheat"}"#.to_string()
            }
        );
        assert_eq!(
            parse(r#"  inventory   update i-1   {"stock_change": -3} "#),
            AppCommand::Update {
                resource: Resource::Inventory,
                id: "i-1".to_string(),
                payload: r#"{"stock_change": -3}"#.to_string()
            }
        );
    }

    #[test]
    fn task_status_accepts_multi_word_status() {
        assert_eq!(
            parse("tasks status t-1 In Progress"),
            AppCommand::TaskStatus {
                id: "t-1".to_string(),
                status: "In Progress".to_string()
            }
        );
    }

    #[test]
    fn incomplete_commands_report_usage() {
        assert!(matches!(parse("plots get"), AppCommand::Unknown(_)));
        assert!(matches!(parse("tasks update t-1"), AppCommand::Unknown(_)));
        assert!(matches!(parse("plots status p-1 done"), AppCommand::Unknown(_)));
        assert!(matches!(parse("login"), AppCommand::Unknown(_)));
        assert!(matches!(parse("harvest now"), AppCommand::Unknown(_)));
    }
}
