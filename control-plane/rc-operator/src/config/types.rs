use std::time::Duration;

use envconfig::Envconfig;
use rc_models::ModelDefaults;

use crate::error::Severity;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub http_port: u16,

    /// Restrict watches to one namespace; all namespaces when unset.
    /// Env: RCO_WATCH_NAMESPACE
    #[envconfig(from = "RCO_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Field manager for writes and reporter name for Events.
    #[envconfig(from = "RCO_FIELD_MANAGER", default = "rc-operator")]
    pub field_manager: String,

    /// Max clusters reconciled in parallel (one pass per cluster at a time).
    #[envconfig(from = "RCO_CONCURRENCY", default = "4")]
    pub concurrency: u16,

    #[envconfig(nested)]
    pub defaults: DefaultsConfig,

    #[envconfig(nested)]
    pub requeue: RequeueConfig,
}

#[derive(Envconfig, Clone, Debug)]
pub struct DefaultsConfig {
    #[envconfig(from = "RCO_DEFAULT_IMAGE", default = "valhalla/valhalla")]
    pub image: String,
    #[envconfig(from = "RCO_DATA_PATH", default = "/data")]
    pub data_path: String,
    /// Used when a cluster does not declare `persistence.storage`.
    #[envconfig(from = "RCO_DEFAULT_STORAGE_SIZE", default = "10Gi")]
    pub storage_size: String,
}

#[derive(Envconfig, Clone, Debug)]
pub struct RequeueConfig {
    #[envconfig(from = "RCO_REQUEUE_TRANSIENT_SECS", default = "5")]
    pub transient_secs: u64,
    #[envconfig(from = "RCO_REQUEUE_CONFLICT_SECS", default = "1")]
    pub conflict_secs: u64,
    /// Errors that need operator intervention back off the longest.
    #[envconfig(from = "RCO_REQUEUE_FATAL_SECS", default = "300")]
    pub fatal_secs: u64,
}

impl OperatorConfig {
    pub fn model_defaults(&self) -> ModelDefaults {
        ModelDefaults {
            image: self.defaults.image.clone(),
            data_path: self.defaults.data_path.clone(),
            storage_size: self.defaults.storage_size.clone(),
        }
    }

    pub fn requeue_delay(&self, severity: Severity) -> Duration {
        let r = &self.requeue;
        let secs = match severity {
            Severity::Conflict => r.conflict_secs,
            Severity::Transient => r.transient_secs,
            Severity::Fatal => r.fatal_secs.max(r.transient_secs),
        };
        Duration::from_secs(secs.max(1))
    }
}
