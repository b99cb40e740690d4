//! Secret-provider volumes served by a CSI driver.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::CSIVolumeSource;

use crate::mounts::contribution::MountPoint;

/// The secrets-store CSI driver the products pull provider-class secrets
/// (licenses, database credentials) through.
pub const SECRETS_STORE_CSI_DRIVER: &str = "secrets-store.csi.k8s.io";

/// Mount path for synthesized secret-provider volumes whose requirement does
/// not declare one. The secrets-store driver only syncs a provider-class
/// secret into Kubernetes while a volume referencing it is mounted
/// somewhere, so the path itself is never read by the product.
pub const FALLBACK_CSI_MOUNT_PATH: &str = "/mnt/secrets-store";

/// A secret-provider-class volume configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsiSecretSource {
    pub driver: String,
    pub read_only: bool,
    pub volume_attributes: BTreeMap<String, String>,
}

impl CsiSecretSource {
    pub fn new(
        driver: impl Into<String>,
        read_only: bool,
        volume_attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            read_only,
            volume_attributes,
        }
    }

    /// A read-only [`SECRETS_STORE_CSI_DRIVER`] source for the given
    /// provider class.
    pub fn secrets_store(provider_class: impl Into<String>) -> Self {
        let mut volume_attributes = BTreeMap::new();
        volume_attributes.insert("secretProviderClass".to_owned(), provider_class.into());

        Self {
            driver: SECRETS_STORE_CSI_DRIVER.to_owned(),
            read_only: true,
            volume_attributes,
        }
    }

    /// Identity for the satisfied-requirement check: driver plus the full
    /// attribute map. The read-only flag shapes the emitted volume, but two
    /// sources with equal driver and attributes address the same
    /// provider-class secret.
    pub(crate) fn identity(&self) -> CsiIdentity {
        (self.driver.clone(), self.volume_attributes.clone())
    }

    pub(crate) fn to_csi_volume_source(&self) -> CSIVolumeSource {
        CSIVolumeSource {
            driver: self.driver.clone(),
            read_only: Some(self.read_only),
            volume_attributes: Some(self.volume_attributes.clone()),
            ..CSIVolumeSource::default()
        }
    }
}

pub(crate) type CsiIdentity = (String, BTreeMap<String, String>);

/// A declared expectation that some volume backed by this secret-provider
/// configuration appears among the final volumes.
///
/// If no contribution's volume already satisfies the identity, the catalog
/// synthesizes exactly one volume (named after the requirement key) mounted
/// at `fallback_mount`, or at [`FALLBACK_CSI_MOUNT_PATH`] read-only if none
/// was declared.
#[derive(Clone, Debug, PartialEq)]
pub struct CsiSecretRequirement {
    pub source: CsiSecretSource,
    pub fallback_mount: Option<MountPoint>,
}

impl CsiSecretRequirement {
    pub fn new(source: CsiSecretSource) -> Self {
        Self {
            source,
            fallback_mount: None,
        }
    }

    pub fn with_fallback_mount(mut self, mount_point: MountPoint) -> Self {
        self.fallback_mount = Some(mount_point);
        self
    }
}
