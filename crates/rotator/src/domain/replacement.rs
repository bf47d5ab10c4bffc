//! The fixed deployment submitted after a rotation.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::ContainerPort;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::types::MESH_LABEL;

pub const REPLACEMENT_NAME: &str = "nginx-deployment";
pub const REPLACEMENT_APP: &str = "nginx";
pub const REPLACEMENT_IMAGE: &str = "nginx:1.14.2";
pub const REPLACEMENT_REPLICAS: i32 = 3;
pub const REPLACEMENT_PORT: i32 = 80;

/// Labels shared by the deployment, its selector and its pod template.
pub fn replacement_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), REPLACEMENT_APP.to_string()),
        (MESH_LABEL.to_string(), "true".to_string()),
    ])
}

/// Builds the replacement deployment for `namespace`. Nothing else about the
/// deleted deployment carries over.
pub fn replacement_deployment(namespace: &str) -> Deployment {
    let labels = replacement_labels();

    Deployment {
        metadata: ObjectMeta {
            name: Some(REPLACEMENT_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(REPLACEMENT_REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: REPLACEMENT_APP.to_string(),
                        image: Some(REPLACEMENT_IMAGE.to_string()),
                        ports: Some(vec![ContainerPort {
                            name: Some("http".to_string()),
                            protocol: Some("TCP".to_string()),
                            container_port: REPLACEMENT_PORT,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Renders the replacement deployment as YAML.
pub fn replacement_yaml(namespace: &str) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&replacement_deployment(namespace))
}
