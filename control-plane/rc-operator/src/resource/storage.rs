use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use rc_models::ClusterModel;

use super::{ChildBuilder, ChildKind, skeleton_meta, stamp_labels};
use crate::error::BuildError;
use crate::ownership;

/// Populated once by an ingestion step, then mounted by every replica.
pub const ACCESS_MODE: &str = "ReadWriteMany";

#[derive(Clone, Copy, Debug)]
pub struct StorageBuilder<'a> {
    model: ClusterModel<'a>,
}

impl<'a> StorageBuilder<'a> {
    pub fn new(model: ClusterModel<'a>) -> Self {
        Self { model }
    }

    pub fn name(&self) -> String {
        self.model.child_resource_name(ChildKind::Storage.suffix())
    }
}

impl ChildBuilder for StorageBuilder<'_> {
    type Object = PersistentVolumeClaim;

    fn build(&self) -> Result<PersistentVolumeClaim, BuildError> {
        Ok(PersistentVolumeClaim {
            metadata: skeleton_meta(&self.model, ChildKind::Storage)?,
            ..Default::default()
        })
    }

    /// Owns access modes, requests and (when declared) the storage class.
    /// Fields the provisioner fills in, such as `volumeName`, are left alone.
    fn update(&self, pvc: &mut PersistentVolumeClaim) -> Result<(), BuildError> {
        let name = self.name();
        stamp_labels(&mut pvc.metadata, &name);

        let spec = pvc.spec.get_or_insert_with(PersistentVolumeClaimSpec::default);
        spec.access_modes = Some(vec![ACCESS_MODE.to_string()]);
        // Unset class defers to the cluster default assigned at admission.
        if let Some(class) = self.model.storage_class_name() {
            spec.storage_class_name = Some(class.to_string());
        }
        spec.resources = Some(VolumeResourceRequirements {
            requests: Some(BTreeMap::from([(
                "storage".to_string(),
                self.model.storage_size(),
            )])),
            limits: None,
        });

        ownership::attach(self.model.cluster(), &mut pvc.metadata)?;
        Ok(())
    }
}
