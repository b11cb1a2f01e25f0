use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Didn't expect to get here: {value}")]
pub struct UnhandledVariantError {
    /// JSON representation of the value that was not handled.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Unhandled values are reported as errors.
    Development,
    /// Unhandled values are logged and replaced by the caller's fallback.
    Production,
}

impl Default for GuardMode {
    #[cfg(debug_assertions)]
    fn default() -> Self {
        GuardMode::Development
    }

    #[cfg(not(debug_assertions))]
    fn default() -> Self {
        GuardMode::Production
    }
}

impl GuardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardMode::Development => "development",
            GuardMode::Production => "production",
        }
    }
}

/// Closes every match over plan node kinds.
///
/// Plans come from an external planner that can grow new node kinds before
/// this crate learns about them. In development the first such node fails
/// loudly, in production it is logged and a best-effort value is used so a
/// single unknown node does not fail the whole diagram.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustivenessGuard {
    mode: GuardMode,
}

impl ExhaustivenessGuard {
    pub fn new(mode: GuardMode) -> Self {
        ExhaustivenessGuard { mode }
    }

    pub fn development() -> Self {
        Self::new(GuardMode::Development)
    }

    pub fn production() -> Self {
        Self::new(GuardMode::Production)
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    pub fn on_unhandled<V, T>(&self, value: &V, fallback: T) -> Result<T, UnhandledVariantError>
    where
        V: Serialize + ?Sized,
    {
        let value = serde_json::to_string(value)
            .unwrap_or_else(|err| format!("<unserializable value: {err}>"));

        match self.mode {
            GuardMode::Development => Err(UnhandledVariantError { value }),
            GuardMode::Production => {
                error!(value = %value, "unreachable value, didn't expect to get here");
                Ok(fallback)
            }
        }
    }
}
