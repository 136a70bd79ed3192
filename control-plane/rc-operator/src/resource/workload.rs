use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PersistentVolumeClaimVolumeSource, PodSpec,
    PodTemplateSpec, ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use rc_models::ClusterModel;

use super::{ChildBuilder, ChildKind, selector_labels, skeleton_meta, stamp_labels};
use crate::error::BuildError;
use crate::ownership;

pub const SERVICE_PORT: i32 = 5000;
pub const DATA_VOLUME: &str = "data";
const CPU_REQUEST: &str = "1";
const MEMORY_REQUEST: &str = "1Gi";

#[derive(Clone, Copy, Debug)]
pub struct WorkloadBuilder<'a> {
    model: ClusterModel<'a>,
}

impl<'a> WorkloadBuilder<'a> {
    pub fn new(model: ClusterModel<'a>) -> Self {
        Self { model }
    }

    pub fn name(&self) -> String {
        self.model.child_resource_name(ChildKind::Workload.suffix())
    }

    /// `minReplicas` for a new object; otherwise the live count, kept inside
    /// the declared bounds so an external autoscaler stays in control.
    fn replicas(&self, current: Option<i32>) -> i32 {
        let (min, max) = (self.model.min_replicas(), self.model.max_replicas());
        current.map_or(min, |r| r.clamp(min, max))
    }

    fn container(&self, name: &str) -> Container {
        let data_path = self.model.data_path();
        Container {
            name: name.to_string(),
            image: Some(self.model.image().to_string()),
            command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
            args: Some(vec![format!(
                "cd {} && valhalla_service valhalla.json 2",
                data_path
            )]),
            ports: Some(vec![ContainerPort {
                name: Some("http".to_string()),
                container_port: SERVICE_PORT,
                ..Default::default()
            }]),
            env: Some(vec![
                EnvVar {
                    name: "PBF_URL".to_string(),
                    value: Some(self.model.data_source_url().to_string()),
                    ..Default::default()
                },
                EnvVar {
                    name: "PBF_FILE_NAME".to_string(),
                    value: Some(self.model.data_source_file_name().to_string()),
                    ..Default::default()
                },
            ]),
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity(CPU_REQUEST.to_string())),
                    ("memory".to_string(), Quantity(MEMORY_REQUEST.to_string())),
                ])),
                ..Default::default()
            }),
            volume_mounts: Some(vec![VolumeMount {
                name: DATA_VOLUME.to_string(),
                mount_path: data_path.to_string(),
                read_only: Some(true),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }
}

impl ChildBuilder for WorkloadBuilder<'_> {
    type Object = Deployment;

    fn build(&self) -> Result<Deployment, BuildError> {
        Ok(Deployment {
            metadata: skeleton_meta(&self.model, ChildKind::Workload)?,
            ..Default::default()
        })
    }

    fn update(&self, deployment: &mut Deployment) -> Result<(), BuildError> {
        let name = self.name();
        let claim = self.model.child_resource_name(ChildKind::Storage.suffix());
        stamp_labels(&mut deployment.metadata, &name);

        let mut pod_meta = ObjectMeta::default();
        stamp_labels(&mut pod_meta, &name);

        let replicas =
            self.replicas(deployment.spec.as_ref().and_then(|s| s.replicas));
        deployment.spec = Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(pod_meta),
                spec: Some(PodSpec {
                    containers: vec![self.container(&name)],
                    volumes: Some(vec![Volume {
                        name: DATA_VOLUME.to_string(),
                        persistent_volume_claim: Some(
                            PersistentVolumeClaimVolumeSource {
                                claim_name: claim,
                                read_only: Some(true),
                            },
                        ),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        });

        ownership::attach(self.model.cluster(), &mut deployment.metadata)?;
        Ok(())
    }
}
