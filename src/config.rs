use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://agriscale.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// 形如 `token=user_id:Role;token2=user_id:Role`
    pub tokens: Option<String>,
    pub access_token: Option<String>,
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// 从环境变量读取配置（调用前应已加载 .env）
    pub fn from_env() -> Self {
        Self {
            database_url: non_empty_env("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            tokens: non_empty_env("AGRI_TOKENS"),
            access_token: non_empty_env("AGRI_ACCESS_TOKEN"),
            log_dir: non_empty_env("AGRI_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
