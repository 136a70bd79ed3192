mod kube_api;

use std::fmt;

use async_trait::async_trait;
use rc_models::{RoutingCluster, RoutingClusterStatus};

#[cfg(test)]
use mockall::automock;

use crate::error::PlatformError;
use crate::resource::{ChildKind, ChildObject};

pub use kube_api::KubePlatform;

/// Namespaced identity of an object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Operations the reconciler needs from the orchestration platform.
///
/// Reads return `Ok(None)` for a missing object; every other failure is an
/// error. Writes signal optimistic-concurrency mismatches as
/// [`PlatformError::Conflict`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    async fn get_cluster(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<RoutingCluster>, PlatformError>;

    async fn get_child(
        &self,
        kind: ChildKind,
        key: &ObjectKey,
    ) -> Result<Option<ChildObject>, PlatformError>;

    async fn create_child(
        &self,
        child: ChildObject,
    ) -> Result<ChildObject, PlatformError>;

    /// Full replace guarded by the object's `resourceVersion`.
    async fn replace_child(
        &self,
        child: ChildObject,
    ) -> Result<ChildObject, PlatformError>;

    /// Write `status` onto the snapshot `cluster` was read from. Fails with a
    /// conflict if the parent changed since.
    async fn write_status(
        &self,
        cluster: &RoutingCluster,
        status: &RoutingClusterStatus,
    ) -> Result<(), PlatformError>;
}
