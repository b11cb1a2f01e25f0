use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

/// Values are passed to the config builder as strings, so they are checked
/// by the same deserialization as the config file.
#[derive(Envconfig, Default)]
pub struct EnvVarOverrides {
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<String>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<String>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    #[envconfig(from = "QP_DIAGRAM_GUARD_MODE")]
    pub guard_mode: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
}

impl EnvVarOverrides {
    fn overrides(self) -> [(&'static str, Option<String>); 4] {
        [
            ("log.level", self.log_level.map(|level| level.to_lowercase())),
            ("log.format", self.log_format.map(|format| format.to_lowercase())),
            ("log.filter", self.log_filter),
            ("guard.mode", self.guard_mode.map(|mode| mode.to_lowercase())),
        ]
    }

    pub fn apply_overrides<T: BuilderState>(
        self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        for (key, value) in self.overrides() {
            if let Some(value) = value {
                debug!("[config-override] '{}' = {:?}", key, value);
                config = config.set_override(key, value)?;
            }
        }

        Ok(config)
    }
}
