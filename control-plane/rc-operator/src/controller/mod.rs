pub mod events;
pub mod reconcile;
pub mod status;

use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::controller::{self, Action};
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::runtime::{Controller, watcher};
use kube::{Api, Client, Resource, ResourceExt};
use rc_models::{ModelDefaults, RoutingCluster};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::error::{ReconcileError, Severity};
use crate::platform::{KubePlatform, ObjectKey, Platform};
use events::{REASON_FAILED, REASON_RECONCILED, emit_event};

pub use reconcile::{Outcome, reconcile_pass};

pub struct ControllerContext {
    pub platform: Arc<dyn Platform>,
    pub defaults: ModelDefaults,
    pub cfg: OperatorConfig,
    pub recorder: Recorder,
}

fn watched<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the controller until `shutdown` is cancelled.
pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let ns = cfg.watch_namespace.clone();
    let clusters: Api<RoutingCluster> = watched(&client, ns.as_deref());
    let deployments: Api<Deployment> = watched(&client, ns.as_deref());
    let claims: Api<PersistentVolumeClaim> = watched(&client, ns.as_deref());

    let platform = Arc::new(KubePlatform::new(
        client.clone(),
        cfg.field_manager.clone(),
        shutdown.clone(),
    ));
    let reporter = Reporter {
        controller: cfg.field_manager.clone(),
        instance: std::env::var("POD_NAME").ok(),
    };
    let ctx = Arc::new(ControllerContext {
        platform,
        defaults: cfg.model_defaults(),
        recorder: Recorder::new(client, reporter),
        cfg,
    });
    info!(namespace = ?ns, concurrency = ctx.cfg.concurrency, "starting RoutingCluster controller");

    Controller::new(clusters, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(claims, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(ctx.cfg.concurrency))
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(object = %obj_ref, ?action, "reconciled")
                }
                Err(e) => debug!(error = %e, "reconcile attempt ended with error"),
            }
        })
        .await;

    info!("controller stopped");
    Ok(())
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_default(), name = %obj.name_any()))]
async fn reconcile(
    obj: Arc<RoutingCluster>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileError> {
    let key = ObjectKey::new(obj.namespace().unwrap_or_default(), obj.name_any());
    match reconcile_pass(ctx.platform.as_ref(), &ctx.defaults, &key).await {
        Ok(Outcome::Deleted) => Ok(Action::await_change()),
        Ok(Outcome::Applied {
            status,
            status_written,
        }) => {
            if status_written {
                emit_event(
                    &ctx.recorder,
                    &obj.object_ref(&()),
                    EventType::Normal,
                    REASON_RECONCILED,
                    "Reconcile",
                    Some(format!(
                        "Applied generation {}",
                        status.observed_generation
                    )),
                )
                .await;
            }
            Ok(Action::await_change())
        }
        Err(e) => {
            if e.severity() == Severity::Fatal {
                emit_event(
                    &ctx.recorder,
                    &obj.object_ref(&()),
                    EventType::Warning,
                    REASON_FAILED,
                    "Reconcile",
                    Some(e.to_string()),
                )
                .await;
            }
            Err(e)
        }
    }
}

fn error_policy(
    obj: Arc<RoutingCluster>,
    err: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let severity = err.severity();
    let delay = ctx.cfg.requeue_delay(severity);
    let name = obj.name_any();
    match severity {
        Severity::Conflict => debug!(%name, error = %err, "conflict; requeue"),
        Severity::Transient => warn!(%name, error = %err, ?delay, "transient failure; requeue"),
        Severity::Fatal => error!(%name, error = %err, ?delay, "reconcile failed"),
    }
    Action::requeue(delay)
}
