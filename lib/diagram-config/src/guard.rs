use hive_router_query_plan_diagram::exhaustiveness::{ExhaustivenessGuard, GuardMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// How plan nodes of an unknown kind are treated.
    ///
    /// `development` stops with an error naming the node, `production` logs
    /// it and keeps going with a placeholder. Defaults to `development` in
    /// debug builds and `production` otherwise.
    ///
    /// Can also be set via the `QP_DIAGRAM_GUARD_MODE` environment variable.
    #[serde(default)]
    pub mode: GuardMode,
}

impl GuardConfig {
    pub fn guard(&self) -> ExhaustivenessGuard {
        ExhaustivenessGuard::new(self.mode)
    }
}
