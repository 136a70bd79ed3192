//! Child resources derived from a [`rc_models::RoutingCluster`].
//!
//! Each kind follows a two-step protocol: [`ChildBuilder::build`] produces an
//! identity-only skeleton for the create path, and [`ChildBuilder::update`]
//! overwrites every builder-owned field and stamps the owner reference. The
//! reconciler applies `update` to either the skeleton or the live object.

mod compare;
mod storage;
mod workload;

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use rc_models::ClusterModel;

use crate::error::BuildError;

pub use storage::StorageBuilder;
pub use workload::WorkloadBuilder;

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "rc-operator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Storage,
    Workload,
}

impl ChildKind {
    /// Reconciliation order; the workload mounts the storage claim.
    pub const ORDER: [ChildKind; 2] = [ChildKind::Storage, ChildKind::Workload];

    pub fn suffix(&self) -> &'static str {
        match self {
            ChildKind::Storage => "storage",
            ChildKind::Workload => "deploy",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKind::Storage => write!(f, "PersistentVolumeClaim"),
            ChildKind::Workload => write!(f, "Deployment"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChildObject {
    Storage(PersistentVolumeClaim),
    Workload(Deployment),
}

impl ChildObject {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildObject::Storage(_) => ChildKind::Storage,
            ChildObject::Workload(_) => ChildKind::Workload,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ChildObject::Storage(pvc) => &pvc.metadata,
            ChildObject::Workload(dep) => &dep.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildObject::Storage(pvc) => &mut pvc.metadata,
            ChildObject::Workload(dep) => &mut dep.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }
}

/// Build/update contract shared by every child kind.
pub trait ChildBuilder {
    type Object;

    fn build(&self) -> Result<Self::Object, BuildError>;
    fn update(&self, existing: &mut Self::Object) -> Result<(), BuildError>;
}

/// Dispatches the [`ChildBuilder`] contract over [`ChildKind`].
#[derive(Clone, Copy, Debug)]
pub struct ResourceBuilder<'a> {
    model: ClusterModel<'a>,
}

impl<'a> ResourceBuilder<'a> {
    pub fn new(model: ClusterModel<'a>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> ClusterModel<'a> {
        self.model
    }

    pub fn storage(&self) -> StorageBuilder<'a> {
        StorageBuilder::new(self.model)
    }

    pub fn workload(&self) -> WorkloadBuilder<'a> {
        WorkloadBuilder::new(self.model)
    }

    pub fn child_name(&self, kind: ChildKind) -> String {
        self.model.child_resource_name(kind.suffix())
    }

    pub fn build(&self, kind: ChildKind) -> Result<ChildObject, BuildError> {
        match kind {
            ChildKind::Storage => self.storage().build().map(ChildObject::Storage),
            ChildKind::Workload => {
                self.workload().build().map(ChildObject::Workload)
            }
        }
    }

    pub fn update(&self, existing: &mut ChildObject) -> Result<(), BuildError> {
        match existing {
            ChildObject::Storage(pvc) => self.storage().update(pvc),
            ChildObject::Workload(dep) => self.workload().update(dep),
        }
    }

    /// `update` for a live object that must be of `kind`.
    pub fn update_as(
        &self,
        kind: ChildKind,
        existing: &mut ChildObject,
    ) -> Result<(), BuildError> {
        if existing.kind() != kind {
            return Err(BuildError::KindMismatch {
                expected: kind,
                actual: existing.kind(),
            });
        }
        self.update(existing)
    }
}

/// Identity-only metadata for a new child of `model`.
pub(crate) fn skeleton_meta(
    model: &ClusterModel<'_>,
    kind: ChildKind,
) -> Result<ObjectMeta, BuildError> {
    let namespace = model
        .namespace()
        .ok_or_else(|| BuildError::MissingNamespace(model.name()))?;
    Ok(ObjectMeta {
        name: Some(model.child_resource_name(kind.suffix())),
        namespace: Some(namespace),
        ..Default::default()
    })
}

pub(crate) fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), name.to_string())])
}

/// Insert the managed labels, keeping labels owned by other writers.
pub(crate) fn stamp_labels(meta: &mut ObjectMeta, name: &str) {
    let labels = meta.labels.get_or_insert_with(BTreeMap::new);
    labels.extend(selector_labels(name));
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
}
