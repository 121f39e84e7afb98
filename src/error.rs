use sea_orm::DbErr;

#[derive(thiserror::Error, Debug)]
pub enum AgriError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("condition failed: {0}")]
    ConditionFailed(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AgriError {
    /// 控制台输出用的稳定错误标签
    pub fn kind(&self) -> &'static str {
        match self {
            AgriError::NotFound(_) => "NOT_FOUND",
            AgriError::Forbidden(_) => "FORBIDDEN",
            AgriError::Unauthenticated(_) => "UNAUTHENTICATED",
            AgriError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AgriError::ConditionFailed(_) => "CONDITION_FAILED",
            AgriError::Validation(_) => "VALIDATION",
            AgriError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AgriError::Internal(_) => "INTERNAL",
        }
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        AgriError::NotFound(format!("{} with id {} not found", what, id))
    }
}

impl From<DbErr> for AgriError {
    fn from(e: DbErr) -> Self {
        match e {
            DbErr::RecordNotFound(msg) => AgriError::NotFound(msg),
            other => AgriError::StoreUnavailable(other.to_string()),
        }
    }
}

pub type AgriResult<T> = Result<T, AgriError>;
