use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use rc_models::RoutingCluster;

use crate::error::OwnershipError;

/// Stamp `owner` as the controlling owner of `child`.
///
/// Any previous reference to the same owner uid is replaced, so repeated calls
/// leave exactly one entry. A child controlled by someone else is rejected.
pub fn attach(
    owner: &RoutingCluster,
    child: &mut ObjectMeta,
) -> Result<(), OwnershipError> {
    let mut reference = owner
        .controller_owner_ref(&())
        .ok_or_else(|| OwnershipError::Unresolvable(owner_key(owner)))?;
    reference.block_owner_deletion = Some(true);

    let refs = child.owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != reference.uid)
    {
        return Err(OwnershipError::AlreadyOwned {
            kind: other.kind.clone(),
            name: other.name.clone(),
        });
    }
    refs.retain(|r| r.uid != reference.uid);
    refs.push(reference);
    Ok(())
}

/// True when `child` is controlled by exactly this `owner` instance.
pub fn is_controlled_by(owner: &RoutingCluster, child: &ObjectMeta) -> bool {
    let Some(uid) = owner.meta().uid.as_deref() else {
        return false;
    };
    child
        .owner_references
        .iter()
        .flatten()
        .any(|r: &OwnerReference| {
            r.controller == Some(true)
                && r.uid == uid
                && r.kind == RoutingCluster::kind(&())
                && r.name == owner.name_any()
        })
}

fn owner_key(owner: &RoutingCluster) -> String {
    format!(
        "{}/{}",
        owner.namespace().unwrap_or_default(),
        owner.name_any()
    )
}
