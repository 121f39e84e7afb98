use crate::error::{AgriError, AgriResult};
use crate::storage::entity::plot::Model as PlotModel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl Geolocation {
    pub fn validate(&self) -> AgriResult<()> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(AgriError::Validation(format!(
                "geolocation out of range: ({}, {})",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotDto {
    pub id: String,
    pub name: String,
    pub plot_number: String,
    pub geolocation: Geolocation,
    pub supervisor_id: Option<String>,
    pub field_manager_id: Option<String>,
}

impl From<PlotModel> for PlotDto {
    fn from(model: PlotModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            plot_number: model.plot_number,
            geolocation: Geolocation {
                latitude: model.latitude,
                longitude: model.longitude,
            },
            supervisor_id: model.supervisor_id,
            field_manager_id: model.field_manager_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlotCreate {
    pub name: String,
    pub plot_number: String,
    pub geolocation: Geolocation,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub field_manager_id: Option<String>,
}

/// plot_number 创建后不可修改，因此不在补丁里
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlotPatch {
    pub name: Option<String>,
    pub geolocation: Option<Geolocation>,
    pub supervisor_id: Option<String>,
    pub field_manager_id: Option<String>,
}

impl PlotPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.geolocation.is_none()
            && self.supervisor_id.is_none()
            && self.field_manager_id.is_none()
    }
}
