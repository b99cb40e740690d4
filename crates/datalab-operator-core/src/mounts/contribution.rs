use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    PersistentVolumeClaimVolumeSource, SecretKeySelector, SecretVolumeSource, Volume, VolumeMount,
};

use crate::mounts::csi::CsiSecretSource;

/// One named unit of volume/mount/env wiring.
///
/// Product assembly code builds these and hands them to a
/// [`MountCatalog`](crate::mounts::MountCatalog); the catalog only
/// aggregates. A contribution may carry a volume, mount points, environment
/// bindings, or any combination of the three.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MountContribution {
    pub(crate) volume_source: Option<VolumeSource>,
    pub(crate) mount_points: Vec<MountPoint>,
    pub(crate) env: Vec<EnvBinding>,
}

impl MountContribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume_source(mut self, source: VolumeSource) -> Self {
        self.volume_source = Some(source);
        self
    }

    pub fn with_mount_point(mut self, mount_point: MountPoint) -> Self {
        self.mount_points.push(mount_point);
        self
    }

    pub fn with_env_binding(mut self, binding: EnvBinding) -> Self {
        self.env.push(binding);
        self
    }
}

/// How a contribution's volume is backed. One variant per backing store the
/// products use.
#[derive(Clone, Debug, PartialEq)]
pub enum VolumeSource {
    PersistentVolumeClaim(PersistentVolumeClaimVolumeSource),
    EmptyDir(EmptyDirVolumeSource),
    Secret(SecretVolumeSource),
    ConfigMap(ConfigMapVolumeSource),
    CsiSecret(CsiSecretSource),
}

impl VolumeSource {
    pub fn persistent_volume_claim(claim_name: impl Into<String>, read_only: bool) -> Self {
        Self::PersistentVolumeClaim(PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.into(),
            read_only: Some(read_only),
        })
    }

    pub fn empty_dir() -> Self {
        Self::EmptyDir(EmptyDirVolumeSource::default())
    }

    pub fn secret(secret_name: impl Into<String>) -> Self {
        Self::Secret(SecretVolumeSource {
            secret_name: Some(secret_name.into()),
            ..SecretVolumeSource::default()
        })
    }

    pub fn config_map(name: impl Into<String>) -> Self {
        Self::ConfigMap(ConfigMapVolumeSource {
            name: name.into(),
            ..ConfigMapVolumeSource::default()
        })
    }

    pub fn csi_secret(source: CsiSecretSource) -> Self {
        Self::CsiSecret(source)
    }

    pub(crate) fn csi_secret_source(&self) -> Option<&CsiSecretSource> {
        match self {
            Self::CsiSecret(source) => Some(source),
            _ => None,
        }
    }

    pub(crate) fn to_volume(&self, name: &str) -> Volume {
        let mut volume = Volume {
            name: name.to_owned(),
            ..Volume::default()
        };

        match self {
            Self::PersistentVolumeClaim(claim) => {
                volume.persistent_volume_claim = Some(claim.clone());
            }
            Self::EmptyDir(empty_dir) => volume.empty_dir = Some(empty_dir.clone()),
            Self::Secret(secret) => volume.secret = Some(secret.clone()),
            Self::ConfigMap(config_map) => volume.config_map = Some(config_map.clone()),
            Self::CsiSecret(csi) => volume.csi = Some(csi.to_csi_volume_source()),
        }

        volume
    }
}

/// A container path a contribution's volume is mounted at.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct MountPoint {
    pub path: String,
    pub sub_path: Option<String>,
    pub read_only: bool,
}

impl MountPoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub(crate) fn to_volume_mount(&self, volume_name: &str) -> VolumeMount {
        VolumeMount {
            name: volume_name.to_owned(),
            mount_path: self.path.clone(),
            sub_path: self.sub_path.clone(),
            read_only: self.read_only.then_some(true),
            ..VolumeMount::default()
        }
    }
}

/// An environment variable contributed alongside a mount: either a literal
/// value or a reference to a key within a named secret.
#[derive(Clone, Debug, PartialEq)]
pub enum EnvBinding {
    Literal { name: String, value: String },
    SecretKey { name: String, secret: String, key: String },
}

impl EnvBinding {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Literal {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn secret_key(
        name: impl Into<String>,
        secret: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::SecretKey {
            name: name.into(),
            secret: secret.into(),
            key: key.into(),
        }
    }

    pub(crate) fn to_env_var(&self) -> EnvVar {
        match self {
            Self::Literal { name, value } => EnvVar {
                name: name.clone(),
                value: Some(value.clone()),
                ..EnvVar::default()
            },
            Self::SecretKey { name, secret, key } => EnvVar {
                name: name.clone(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: secret.clone(),
                        key: key.clone(),
                        ..SecretKeySelector::default()
                    }),
                    ..EnvVarSource::default()
                }),
                ..EnvVar::default()
            },
        }
    }
}
