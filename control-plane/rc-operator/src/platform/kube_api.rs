use std::future::Future;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use rc_models::{RoutingCluster, RoutingClusterStatus};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{ObjectKey, Platform};
use crate::error::PlatformError;
use crate::resource::{ChildKind, ChildObject};

/// [`Platform`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
    field_manager: String,
    cancel: CancellationToken,
}

impl KubePlatform {
    pub fn new(
        client: Client,
        field_manager: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            cancel,
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, kube::Error>>,
    ) -> Result<T, PlatformError> {
        race(&self.cancel, fut).await
    }
}

/// Cancellation fails the in-flight call with a retryable error.
async fn race<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, kube::Error>>,
) -> Result<T, PlatformError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PlatformError::Cancelled),
        res = fut => res.map_err(classify),
    }
}

/// 400/403/422 fail the same way on every resend and are reported as
/// [`PlatformError::Rejected`].
fn classify(err: kube::Error) -> PlatformError {
    match err {
        kube::Error::Api(resp) if resp.code == 409 => {
            PlatformError::Conflict(resp.message)
        }
        kube::Error::Api(resp)
            if matches!(resp.code, 400 | 403 | 422)
                || matches!(
                    resp.reason.as_str(),
                    "BadRequest" | "Forbidden" | "Invalid"
                ) =>
        {
            PlatformError::Rejected {
                code: resp.code,
                reason: resp.reason,
                message: resp.message,
            }
        }
        other => PlatformError::Kube(other),
    }
}

/// Status merge patch; `resourceVersion` turns it into a guarded write.
fn status_patch(
    cluster: &RoutingCluster,
    status: &RoutingClusterStatus,
) -> serde_json::Value {
    json!({
        "metadata": { "resourceVersion": cluster.resource_version() },
        "status": status,
    })
}

#[async_trait]
impl Platform for KubePlatform {
    async fn get_cluster(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<RoutingCluster>, PlatformError> {
        let api: Api<RoutingCluster> =
            Api::namespaced(self.client.clone(), &key.namespace);
        self.call(api.get_opt(&key.name)).await
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        key: &ObjectKey,
    ) -> Result<Option<ChildObject>, PlatformError> {
        trace!(%key, %kind, "get child");
        match kind {
            ChildKind::Storage => {
                let api: Api<PersistentVolumeClaim> =
                    Api::namespaced(self.client.clone(), &key.namespace);
                Ok(self
                    .call(api.get_opt(&key.name))
                    .await?
                    .map(ChildObject::Storage))
            }
            ChildKind::Workload => {
                let api: Api<Deployment> =
                    Api::namespaced(self.client.clone(), &key.namespace);
                Ok(self
                    .call(api.get_opt(&key.name))
                    .await?
                    .map(ChildObject::Workload))
            }
        }
    }

    async fn create_child(
        &self,
        child: ChildObject,
    ) -> Result<ChildObject, PlatformError> {
        let pp = self.post_params();
        match child {
            ChildObject::Storage(pvc) => {
                let api: Api<PersistentVolumeClaim> = Api::namespaced(
                    self.client.clone(),
                    &pvc.namespace().unwrap_or_default(),
                );
                Ok(ChildObject::Storage(self.call(api.create(&pp, &pvc)).await?))
            }
            ChildObject::Workload(dep) => {
                let api: Api<Deployment> = Api::namespaced(
                    self.client.clone(),
                    &dep.namespace().unwrap_or_default(),
                );
                Ok(ChildObject::Workload(self.call(api.create(&pp, &dep)).await?))
            }
        }
    }

    async fn replace_child(
        &self,
        child: ChildObject,
    ) -> Result<ChildObject, PlatformError> {
        let pp = self.post_params();
        match child {
            ChildObject::Storage(pvc) => {
                let api: Api<PersistentVolumeClaim> = Api::namespaced(
                    self.client.clone(),
                    &pvc.namespace().unwrap_or_default(),
                );
                let name = pvc.name_any();
                Ok(ChildObject::Storage(
                    self.call(api.replace(&name, &pp, &pvc)).await?,
                ))
            }
            ChildObject::Workload(dep) => {
                let api: Api<Deployment> = Api::namespaced(
                    self.client.clone(),
                    &dep.namespace().unwrap_or_default(),
                );
                let name = dep.name_any();
                Ok(ChildObject::Workload(
                    self.call(api.replace(&name, &pp, &dep)).await?,
                ))
            }
        }
    }

    async fn write_status(
        &self,
        cluster: &RoutingCluster,
        status: &RoutingClusterStatus,
    ) -> Result<(), PlatformError> {
        let api: Api<RoutingCluster> = Api::namespaced(
            self.client.clone(),
            &cluster.namespace().unwrap_or_default(),
        );
        let patch = status_patch(cluster, status);
        let pp = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };
        let name = cluster.name_any();
        self.call(api.patch_status(&name, &pp, &Patch::Merge(&patch)))
            .await
            .map(|_| ())
    }
}
