// 📍 Location Directory - Normal places + the foreign sentinel

use crate::config::SimulationConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct LocationDirectory {
    normal: Vec<String>,
    foreign: String,
}

impl LocationDirectory {
    pub fn new(normal: Vec<String>, foreign: String) -> Result<Self, ConfigError> {
        if normal.is_empty() {
            return Err(ConfigError::EmptyLocations);
        }
        if normal.contains(&foreign) {
            return Err(ConfigError::SentinelInWhitelist(foreign));
        }
        Ok(LocationDirectory { normal, foreign })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Self::new(config.locations.clone(), config.foreign_location.clone())
    }

    pub fn normal(&self) -> &[String] {
        &self.normal
    }

    pub fn foreign(&self) -> &str {
        &self.foreign
    }

    pub fn is_foreign(&self, location: &str) -> bool {
        location == self.foreign
    }
}
