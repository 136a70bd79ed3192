use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const API_GROUP: &str = "routing.dev";
pub const API_VERSION: &str = "v1alpha1";

/// Annotation that flags a cluster as paused in its status.
pub const PAUSED_ANNOTATION: &str = "routing.dev/paused";

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema,
)]
#[kube(
    group = "routing.dev",
    version = "v1alpha1",
    kind = "RoutingCluster",
    plural = "routingclusters",
    shortname = "rc",
    namespaced,
    status = "RoutingClusterStatus",
    printcolumn = r#"{"name":"Paused","type":"boolean","jsonPath":".status.paused"}"#,
    printcolumn = r#"{"name":"Observed","type":"integer","jsonPath":".status.observedGeneration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RoutingClusterSpec {
    /// URL of the OSM extract the routing tiles are built from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pbf_url: String,
    /// Container image; falls back to the operator default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub persistence: PersistenceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    /// Upper bound for an external autoscaler; never acted on directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Quantity>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingClusterStatus {
    /// True when the operator noticed the paused annotation.
    #[serde(default)]
    pub paused: bool,
    /// Latest generation whose desired state was fully applied to children.
    #[serde(default)]
    pub observed_generation: i64,
}
