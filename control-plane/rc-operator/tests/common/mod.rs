#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::core::ErrorResponse;
use rc_models::{ModelDefaults, RoutingCluster, RoutingClusterSpec, RoutingClusterStatus};
use rc_operator::error::PlatformError;
use rc_operator::platform::{ObjectKey, Platform};
use rc_operator::resource::{ChildKind, ChildObject};

pub const NS: &str = "ns";

/// Every call the reconciler made, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    GetCluster(String),
    GetChild(ChildKind, String),
    Create(ChildKind, String),
    Replace(ChildKind, String),
    WriteStatus(String),
}

/// Which call an injected failure applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailOn {
    GetChild(ChildKind),
    Create(ChildKind),
    Replace(ChildKind),
    WriteStatus,
}

#[derive(Default)]
struct State {
    clusters: HashMap<ObjectKey, RoutingCluster>,
    children: HashMap<(ChildKind, ObjectKey), ChildObject>,
    version: u64,
    ops: Vec<Op>,
    fail_on: Option<FailOn>,
    race_status_write: bool,
}

impl State {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn take_failure(&mut self, op: FailOn) -> Result<(), PlatformError> {
        if self.fail_on == Some(op) {
            self.fail_on = None;
            return Err(PlatformError::Cancelled);
        }
        Ok(())
    }

    /// Parent mutation by another writer: new spec generation.
    fn bump_cluster(&mut self, key: &ObjectKey) {
        let rv = self.next_version();
        if let Some(rc) = self.clusters.get_mut(key) {
            rc.metadata.generation = Some(rc.metadata.generation.unwrap_or(0) + 1);
            rc.metadata.resource_version = Some(rv);
        }
    }
}

/// In-memory stand-in for the API server: admission defaults on create and
/// replace, optimistic concurrency on replace and status writes, and claim
/// lookups when a workload is created.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new(NS, name)
}

pub fn defaults() -> ModelDefaults {
    ModelDefaults::default()
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new cluster at generation 1.
    pub fn insert_cluster(&self, name: &str, spec: RoutingClusterSpec) -> ObjectKey {
        let mut state = self.state.lock().unwrap();
        let mut rc = RoutingCluster::new(name, spec);
        rc.metadata.namespace = Some(NS.into());
        rc.metadata.uid = Some(format!("{name}-uid"));
        rc.metadata.generation = Some(1);
        rc.metadata.resource_version = Some(state.next_version());
        let key = key(name);
        state.clusters.insert(key.clone(), rc);
        key
    }

    /// Mutate the stored cluster the way a user edit would.
    pub fn edit_cluster(&self, key: &ObjectKey, edit: impl FnOnce(&mut RoutingCluster)) {
        let mut state = self.state.lock().unwrap();
        if let Some(rc) = state.clusters.get_mut(key) {
            edit(rc);
        }
        state.bump_cluster(key);
    }

    pub fn delete_cluster(&self, key: &ObjectKey) {
        self.state.lock().unwrap().clusters.remove(key);
    }

    /// Mutate a stored child the way another controller would.
    pub fn edit_child(
        &self,
        kind: ChildKind,
        key: &ObjectKey,
        edit: impl FnOnce(&mut ChildObject),
    ) {
        let mut state = self.state.lock().unwrap();
        let rv = state.next_version();
        if let Some(child) = state.children.get_mut(&(kind, key.clone())) {
            edit(child);
            child.meta_mut().resource_version = Some(rv);
        }
    }

    /// The next matching call fails as if its context were cancelled.
    pub fn fail_next(&self, op: FailOn) {
        self.state.lock().unwrap().fail_on = Some(op);
    }

    /// The next status write observes a parent changed after it was read.
    pub fn race_next_status_write(&self) {
        self.state.lock().unwrap().race_status_write = true;
    }

    pub fn cluster(&self, key: &ObjectKey) -> Option<RoutingCluster> {
        self.state.lock().unwrap().clusters.get(key).cloned()
    }

    pub fn status(&self, key: &ObjectKey) -> Option<RoutingClusterStatus> {
        self.cluster(key).and_then(|rc| rc.status)
    }

    pub fn storage(&self, key: &ObjectKey) -> Option<PersistentVolumeClaim> {
        match self.child(ChildKind::Storage, key)? {
            ChildObject::Storage(pvc) => Some(pvc),
            ChildObject::Workload(_) => None,
        }
    }

    pub fn workload(&self, key: &ObjectKey) -> Option<Deployment> {
        match self.child(ChildKind::Workload, key)? {
            ChildObject::Workload(dep) => Some(dep),
            ChildObject::Storage(_) => None,
        }
    }

    pub fn child(&self, kind: ChildKind, key: &ObjectKey) -> Option<ChildObject> {
        self.state
            .lock()
            .unwrap()
            .children
            .get(&(kind, key.clone()))
            .cloned()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Only the writes, in order.
    pub fn writes(&self) -> Vec<Op> {
        self.ops()
            .into_iter()
            .filter(|op| {
                matches!(op, Op::Create(..) | Op::Replace(..) | Op::WriteStatus(_))
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }
}

/// Errors as `KubePlatform` classifies them.
fn api_error(code: u16, reason: &str, message: String) -> PlatformError {
    match code {
        409 => PlatformError::Conflict(message),
        400 | 403 | 422 => PlatformError::Rejected {
            code,
            reason: reason.into(),
            message,
        },
        _ => PlatformError::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message,
            reason: reason.into(),
            code,
        })),
    }
}

fn storage_class(child: &ChildObject) -> Option<String> {
    match child {
        ChildObject::Storage(pvc) => pvc.spec.as_ref()?.storage_class_name.clone(),
        ChildObject::Workload(_) => None,
    }
}

/// Fill unset fields the way API server admission defaults them.
fn apply_server_defaults(child: &mut ChildObject) {
    match child {
        ChildObject::Storage(pvc) => {
            if let Some(spec) = pvc.spec.as_mut() {
                spec.volume_mode.get_or_insert_with(|| "Filesystem".into());
                spec.storage_class_name
                    .get_or_insert_with(|| "standard".into());
            }
        }
        ChildObject::Workload(dep) => {
            let Some(spec) = dep.spec.as_mut() else {
                return;
            };
            spec.revision_history_limit.get_or_insert(10);
            spec.progress_deadline_seconds.get_or_insert(600);
            if let Some(pod) = spec.template.spec.as_mut() {
                pod.dns_policy.get_or_insert_with(|| "ClusterFirst".into());
                pod.restart_policy.get_or_insert_with(|| "Always".into());
                for c in &mut pod.containers {
                    c.image_pull_policy
                        .get_or_insert_with(|| "IfNotPresent".into());
                    c.termination_message_path
                        .get_or_insert_with(|| "/dev/termination-log".into());
                    for p in c.ports.iter_mut().flatten() {
                        p.protocol.get_or_insert_with(|| "TCP".into());
                    }
                }
            }
        }
    }
}

/// Name of the claim a workload's pod template mounts, if any.
fn claimed_storage(dep: &Deployment) -> Option<String> {
    dep.spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .volumes
        .as_ref()?
        .iter()
        .find_map(|v| v.persistent_volume_claim.as_ref())
        .map(|pvc| pvc.claim_name.clone())
}

#[async_trait]
impl Platform for FakePlatform {
    async fn get_cluster(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<RoutingCluster>, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::GetCluster(key.name.clone()));
        Ok(state.clusters.get(key).cloned())
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        key: &ObjectKey,
    ) -> Result<Option<ChildObject>, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::GetChild(kind, key.name.clone()));
        state.take_failure(FailOn::GetChild(kind))?;
        Ok(state.children.get(&(kind, key.clone())).cloned())
    }

    async fn create_child(
        &self,
        mut child: ChildObject,
    ) -> Result<ChildObject, PlatformError> {
        let mut state = self.state.lock().unwrap();
        let kind = child.kind();
        let key = ObjectKey::new(child.namespace(), child.name());
        state.ops.push(Op::Create(kind, key.name.clone()));
        state.take_failure(FailOn::Create(kind))?;

        if state.children.contains_key(&(kind, key.clone())) {
            return Err(api_error(409, "AlreadyExists", format!("{kind} {key} exists")));
        }
        if let ChildObject::Workload(dep) = &child {
            let claim = claimed_storage(dep).unwrap_or_default();
            let claim_key = ObjectKey::new(&key.namespace, claim);
            if !state.children.contains_key(&(ChildKind::Storage, claim_key.clone())) {
                return Err(api_error(
                    422,
                    "Invalid",
                    format!("claim {claim_key} does not exist"),
                ));
            }
        }

        apply_server_defaults(&mut child);
        let rv = state.next_version();
        let meta = child.meta_mut();
        meta.resource_version = Some(rv);
        meta.uid = Some(format!("{}-uid", key.name));
        state.children.insert((kind, key), child.clone());
        Ok(child)
    }

    async fn replace_child(
        &self,
        mut child: ChildObject,
    ) -> Result<ChildObject, PlatformError> {
        let mut state = self.state.lock().unwrap();
        let kind = child.kind();
        let key = ObjectKey::new(child.namespace(), child.name());
        state.ops.push(Op::Replace(kind, key.name.clone()));
        state.take_failure(FailOn::Replace(kind))?;

        let Some(stored) = state.children.get(&(kind, key.clone())) else {
            return Err(api_error(404, "NotFound", format!("{kind} {key} not found")));
        };
        if stored.meta().resource_version != child.meta().resource_version {
            return Err(PlatformError::Conflict(key.to_string()));
        }
        if storage_class(stored) != storage_class(&child) {
            return Err(api_error(
                422,
                "Invalid",
                format!("{kind} {key}: spec is immutable after creation"),
            ));
        }

        apply_server_defaults(&mut child);
        child.meta_mut().resource_version = Some(state.next_version());
        state.children.insert((kind, key), child.clone());
        Ok(child)
    }

    async fn write_status(
        &self,
        cluster: &RoutingCluster,
        status: &RoutingClusterStatus,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        let key = ObjectKey::new(
            cluster.metadata.namespace.clone().unwrap_or_default(),
            cluster.metadata.name.clone().unwrap_or_default(),
        );
        state.ops.push(Op::WriteStatus(key.name.clone()));
        state.take_failure(FailOn::WriteStatus)?;
        if std::mem::take(&mut state.race_status_write) {
            state.bump_cluster(&key);
        }

        let rv = state.next_version();
        let Some(stored) = state.clusters.get_mut(&key) else {
            return Err(api_error(404, "NotFound", format!("{key} not found")));
        };
        if stored.metadata.resource_version != cluster.metadata.resource_version {
            return Err(PlatformError::Conflict(key.to_string()));
        }
        stored.status = Some(status.clone());
        stored.metadata.resource_version = Some(rv);
        Ok(())
    }
}
