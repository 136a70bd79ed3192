use rc_models::{ClusterModel, RoutingClusterStatus};

/// Status for a pass that converged every child of `model`.
///
/// `observed_generation` never moves backwards, even if the snapshot carries
/// an older generation than the status already reports.
pub fn observe(
    model: &ClusterModel<'_>,
    current: Option<&RoutingClusterStatus>,
) -> RoutingClusterStatus {
    let previous = current.map_or(0, |s| s.observed_generation);
    RoutingClusterStatus {
        paused: model.is_paused(),
        observed_generation: previous.max(model.generation()),
    }
}

pub fn should_write(
    current: Option<&RoutingClusterStatus>,
    desired: &RoutingClusterStatus,
) -> bool {
    current != Some(desired)
}
