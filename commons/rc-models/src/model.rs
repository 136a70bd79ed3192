use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::ResourceExt;

use crate::cluster::{PAUSED_ANNOTATION, RoutingCluster};

pub const DEFAULT_IMAGE: &str = "valhalla/valhalla";
pub const DEFAULT_DATA_PATH: &str = "/data";
pub const DEFAULT_STORAGE_SIZE: &str = "10Gi";

/// Operator-wide defaults, built once at startup and shared read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDefaults {
    pub image: String,
    pub data_path: String,
    pub storage_size: String,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            data_path: DEFAULT_DATA_PATH.to_string(),
            storage_size: DEFAULT_STORAGE_SIZE.to_string(),
        }
    }
}

/// Read-only view over a [`RoutingCluster`] that derives the values child
/// resources are rendered from.
///
/// Nothing here is cached: every pass builds a fresh view from the snapshot
/// it fetched.
#[derive(Clone, Copy, Debug)]
pub struct ClusterModel<'a> {
    cluster: &'a RoutingCluster,
    defaults: &'a ModelDefaults,
}

impl<'a> ClusterModel<'a> {
    pub fn new(cluster: &'a RoutingCluster, defaults: &'a ModelDefaults) -> Self {
        Self { cluster, defaults }
    }

    pub fn cluster(&self) -> &'a RoutingCluster {
        self.cluster
    }

    pub fn name(&self) -> String {
        self.cluster.name_any()
    }

    pub fn namespace(&self) -> Option<String> {
        self.cluster.namespace()
    }

    pub fn generation(&self) -> i64 {
        self.cluster.metadata.generation.unwrap_or(0)
    }

    pub fn image(&self) -> &'a str {
        self.cluster
            .spec
            .image
            .as_deref()
            .unwrap_or(self.defaults.image.as_str())
    }

    /// Last `/`-separated segment of the source URL, or the URL itself when it
    /// has no separator.
    pub fn data_source_file_name(&self) -> &'a str {
        let url = self.cluster.spec.pbf_url.as_str();
        url.rsplit('/').next().unwrap_or(url)
    }

    pub fn data_source_url(&self) -> &'a str {
        &self.cluster.spec.pbf_url
    }

    pub fn data_path(&self) -> &'a str {
        &self.defaults.data_path
    }

    /// `<cluster>-<suffix>`; an empty suffix yields the cluster name.
    pub fn child_resource_name(&self, suffix: &str) -> String {
        child_resource_name(&self.name(), suffix)
    }

    pub fn storage_class_name(&self) -> Option<&'a str> {
        let class = self.cluster.spec.persistence.storage_class_name.as_str();
        (!class.is_empty()).then_some(class)
    }

    pub fn storage_size(&self) -> Quantity {
        self.cluster
            .spec
            .persistence
            .storage
            .clone()
            .filter(|q| !q.0.trim().is_empty())
            .unwrap_or_else(|| Quantity(self.defaults.storage_size.clone()))
    }

    pub fn min_replicas(&self) -> i32 {
        self.cluster.spec.min_replicas.unwrap_or(1).max(0)
    }

    /// Never below [`Self::min_replicas`].
    pub fn max_replicas(&self) -> i32 {
        let min = self.min_replicas();
        self.cluster.spec.max_replicas.map_or(min, |max| max.max(min))
    }

    pub fn is_paused(&self) -> bool {
        self.cluster
            .annotations()
            .get(PAUSED_ANNOTATION)
            .is_some_and(|v| is_truthy(v))
    }
}

pub fn child_resource_name(parent: &str, suffix: &str) -> String {
    let joined = format!("{}-{}", parent, suffix);
    joined.strip_suffix('-').map(str::to_string).unwrap_or(joined)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
