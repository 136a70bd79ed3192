use kube::core::CustomResourceExt;
use rc_models::RoutingCluster;

/// Print the RoutingCluster CRD for `kubectl apply -f -`.
fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&RoutingCluster::crd())?);
    Ok(())
}
