use crate::error::{AgriError, AgriResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    FarmManager,
    FieldManager,
    Supervisor,
    /// 未知角色原样保留，由访问控制拒绝
    Other(String),
}

impl Role {
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::FarmManager | Role::FieldManager)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::FarmManager => "FarmManager",
            Role::FieldManager => "FieldManager",
            Role::Supervisor => "Supervisor",
            Role::Other(raw) => raw,
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "FarmManager" => Role::FarmManager,
            "FieldManager" => Role::FieldManager,
            "Supervisor" => Role::Supervisor,
            other => Role::Other(other.to_string()),
        })
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match Role::from_str(&s) {
            Ok(role) => role,
            Err(never) => match never {},
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已通过外部认证的调用者身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: Option<&str>) -> AgriResult<CurrentUser>;
}

/// 基于静态 token 表的身份解析（开发/测试用）
pub struct StaticTokenProvider {
    users: HashMap<String, CurrentUser>,
}

impl StaticTokenProvider {
    pub fn with_defaults() -> Self {
        let users = [
            ("fm-token", "fm-1", Role::FarmManager),
            ("fdm-token", "fdm-1", Role::FieldManager),
            ("sup-token", "sup-1", Role::Supervisor),
        ]
        .into_iter()
        .map(|(token, user_id, role)| (token.to_string(), CurrentUser::new(user_id, role)))
        .collect();
        Self { users }
    }

    /// 解析 `token=user_id:Role;token2=user_id:Role`
    pub fn from_table(table: &str) -> AgriResult<Self> {
        let mut users = HashMap::new();
        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, identity) = entry
                .split_once('=')
                .ok_or_else(|| AgriError::Validation(format!("bad token entry: {}", entry)))?;
            let (user_id, role) = identity
                .split_once(':')
                .ok_or_else(|| AgriError::Validation(format!("bad token identity: {}", entry)))?;
            let (token, user_id, role) = (token.trim(), user_id.trim(), role.trim());
            if token.is_empty() || user_id.is_empty() {
                return Err(AgriError::Validation(format!(
                    "empty token or user id: {}",
                    entry
                )));
            }
            users.insert(
                token.to_string(),
                CurrentUser::new(user_id, Role::from(role.to_string())),
            );
        }
        Ok(Self { users })
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn resolve(&self, token: Option<&str>) -> AgriResult<CurrentUser> {
        let token = token.ok_or_else(|| {
            AgriError::Unauthenticated("access token missing".to_string())
        })?;
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| AgriError::Forbidden("invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_is_preserved() {
        let role: Role = "Auditor".parse().unwrap();
        assert_eq!(role, Role::Other("Auditor".to_string()));
        assert!(!role.is_manager());
        assert_eq!(role.to_string(), "Auditor");
    }

    #[test]
    fn role_serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::FieldManager).unwrap();
        assert_eq!(json, "\"FieldManager\"");
        let back: Role = serde_json::from_str("\"Supervisor\"").unwrap();
        assert_eq!(back, Role::Supervisor);
    }

    #[tokio::test]
    async fn default_tokens_resolve() {
        let provider = StaticTokenProvider::with_defaults();
        let user = provider.resolve(Some("fdm-token")).await.unwrap();
        assert_eq!(user, CurrentUser::new("fdm-1", Role::FieldManager));
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated_and_unknown_is_forbidden() {
        let provider = StaticTokenProvider::with_defaults();
        assert!(matches!(
            provider.resolve(None).await,
            Err(AgriError::Unauthenticated(_))
        ));
        assert!(matches!(
            provider.resolve(Some("nope")).await,
            Err(AgriError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn token_table_is_parsed_from_config() {
        let provider =
            StaticTokenProvider::from_table("a=u-1:FarmManager; b = u-2 : Gardener ;").unwrap();
        let a = provider.resolve(Some("a")).await.unwrap();
        assert_eq!(a.role, Role::FarmManager);
        let b = provider.resolve(Some("b")).await.unwrap();
        assert_eq!(b, CurrentUser::new("u-2", Role::Other("Gardener".to_string())));

        assert!(StaticTokenProvider::from_table("broken").is_err());
    }
}
