use crate::error::{AgriError, AgriResult};
use crate::storage::entity::supervisor::Model as SupervisorModel;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub assigned_plots: Vec<String>,
    pub field_manager_id: Option<String>,
}

impl TryFrom<SupervisorModel> for SupervisorDto {
    type Error = AgriError;

    fn try_from(model: SupervisorModel) -> AgriResult<Self> {
        let assigned_plots = serde_json::from_str(&model.assigned_plots).map_err(|e| {
            AgriError::Internal(format!(
                "stored assigned_plots of supervisor {} is not a JSON list: {}",
                model.id, e
            ))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            assigned_plots,
            field_manager_id: model.field_manager_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorCreate {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub assigned_plots: Vec<String>,
    #[serde(default)]
    pub field_manager_id: Option<String>,
}

/// 部分更新：只写入提供的字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisorPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub assigned_plots: Option<Vec<String>>,
    pub field_manager_id: Option<String>,
}

impl SupervisorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.assigned_plots.is_none()
            && self.field_manager_id.is_none()
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
    })
}

pub fn validate_email(email: &str) -> AgriResult<()> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(AgriError::Validation(format!("invalid email address: {}", email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("ravi@farm.example").is_ok());
        assert!(validate_email("no-at-sign.example").is_err());
        assert!(validate_email("two@@farm.example").is_err());
        assert!(validate_email("spaces in@farm.example").is_err());
    }

    #[test]
    fn corrupt_assigned_plots_are_reported() {
        let model = SupervisorModel {
            id: "s-1".to_string(),
            name: "Asha".to_string(),
            email: "asha@farm.example".to_string(),
            phone: "555-0101".to_string(),
            assigned_plots: "not json".to_string(),
            field_manager_id: None,
            created_at: 0,
            updated_at: 0,
        };
        let err = SupervisorDto::try_from(model.clone()).unwrap_err();
        assert_eq!(err.kind(), "INTERNAL");

        let dto = SupervisorDto::try_from(SupervisorModel {
            assigned_plots: r#"["p-1","p-2"]"#.to_string(),
            ..model
        })
        .unwrap();
        assert_eq!(dto.assigned_plots, vec!["p-1", "p-2"]);
    }
}
