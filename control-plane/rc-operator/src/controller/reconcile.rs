use rc_models::{ClusterModel, ModelDefaults, RoutingClusterStatus};
use tracing::{debug, info, instrument, trace};

use super::status;
use crate::error::{BuildError, ReconcileError};
use crate::platform::{ObjectKey, Platform};
use crate::resource::{ChildKind, ChildObject, ResourceBuilder};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The cluster no longer exists; its children are left to the garbage
    /// collector.
    Deleted,
    /// Every child matches desired state and `status` is what the cluster
    /// reports.
    Applied {
        status: RoutingClusterStatus,
        status_written: bool,
    },
}

/// One reconciliation pass for the cluster identified by `key`.
///
/// Children are converged in [`ChildKind::ORDER`]. The first error ends the
/// pass before status is touched, so `observedGeneration` only advances once
/// every child of that generation has been applied.
#[instrument(skip_all, fields(ns = %key.namespace, name = %key.name))]
pub async fn reconcile_pass<P>(
    platform: &P,
    defaults: &ModelDefaults,
    key: &ObjectKey,
) -> Result<Outcome, ReconcileError>
where
    P: Platform + ?Sized,
{
    let Some(cluster) = platform
        .get_cluster(key)
        .await
        .map_err(ReconcileError::platform("get", key.to_string()))?
    else {
        debug!("cluster not found; nothing to reconcile");
        return Ok(Outcome::Deleted);
    };

    let model = ClusterModel::new(&cluster, defaults);
    let builder = ResourceBuilder::new(model);
    for kind in ChildKind::ORDER {
        converge_child(platform, &builder, kind, key).await?;
    }

    let current = cluster.status.as_ref();
    let desired = status::observe(&model, current);
    let status_written = status::should_write(current, &desired);
    if status_written {
        platform
            .write_status(&cluster, &desired)
            .await
            .map_err(ReconcileError::platform("write status of", key.to_string()))?;
        info!(
            observed_generation = desired.observed_generation,
            paused = desired.paused,
            "status updated"
        );
    } else {
        trace!("status unchanged; skipping write");
    }

    Ok(Outcome::Applied {
        status: desired,
        status_written,
    })
}

/// Create or replace one child so it matches desired state.
async fn converge_child<P>(
    platform: &P,
    builder: &ResourceBuilder<'_>,
    kind: ChildKind,
    cluster_key: &ObjectKey,
) -> Result<ChildObject, ReconcileError>
where
    P: Platform + ?Sized,
{
    let child_key = ObjectKey::new(&cluster_key.namespace, builder.child_name(kind));
    let build_err = |source: BuildError| ReconcileError::Build {
        kind,
        cluster: cluster_key.to_string(),
        source,
    };

    let existing = platform
        .get_child(kind, &child_key)
        .await
        .map_err(ReconcileError::platform("get", child_key.to_string()))?;

    match existing {
        None => {
            let mut child = builder.build(kind).map_err(build_err)?;
            builder.update(&mut child).map_err(build_err)?;
            info!(%kind, child = %child_key, "creating child");
            platform
                .create_child(child)
                .await
                .map_err(ReconcileError::platform("create", child_key.to_string()))
        }
        Some(live) => {
            let mut child = live.clone();
            builder.update_as(kind, &mut child).map_err(build_err)?;
            if live.covers(&child) {
                trace!(%kind, child = %child_key, "child up to date");
                return Ok(child);
            }
            debug!(%kind, child = %child_key, "replacing child");
            platform
                .replace_child(child)
                .await
                .map_err(ReconcileError::platform("replace", child_key.to_string()))
        }
    }
}
