//! Composition of container mount wiring.
//!
//! Product assembly code contributes independently declared volumes, mount
//! points and environment bindings; the catalog merges them into the final
//! lists handed to the object builder. Output ordering is fully
//! deterministic regardless of accumulation order, so the diff-based
//! reconcilers never perceive spurious changes.

mod contribution;
mod csi;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{EnvVar, Volume, VolumeMount};
use snafu::Snafu;
use tracing::debug;

pub use crate::mounts::{
    contribution::{EnvBinding, MountContribution, MountPoint, VolumeSource},
    csi::{
        CsiSecretRequirement, CsiSecretSource, FALLBACK_CSI_MOUNT_PATH, SECRETS_STORE_CSI_DRIVER,
    },
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("colliding contribution name {name:?} with different content"))]
    CollidingContribution { name: String },
}

/// Accumulates [`MountContribution`]s and [`CsiSecretRequirement`]s, then
/// produces the final volume, volume-mount and environment lists.
///
/// Constructed fresh per rendering pass; the calling product assembly code
/// owns contribution lifetime.
#[derive(Clone, Debug, Default)]
pub struct MountCatalog {
    // IndexMap over BTreeMap: environment ordering follows the order product
    // code registered its contributions, not the alphabet.
    contributions: IndexMap<String, MountContribution>,
    csi_requirements: IndexMap<String, CsiSecretRequirement>,
    extra_env: Vec<EnvBinding>,
}

impl MountCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named contribution. Re-adding an identical contribution
    /// under the same name is a no-op; a different contribution under an
    /// existing name is an error.
    pub fn add_contribution(
        &mut self,
        name: impl Into<String>,
        contribution: MountContribution,
    ) -> Result<&mut Self> {
        let name = name.into();

        if let Some(existing) = self.contributions.get(&name) {
            if existing == &contribution {
                debug!(name, "contribution already registered with identical content");
                return Ok(self);
            }
            return CollidingContributionSnafu { name }.fail();
        }

        self.contributions.insert(name, contribution);
        Ok(self)
    }

    /// Registers a CSI secret requirement under a key. Re-registering a key
    /// replaces the earlier requirement.
    pub fn add_csi_requirement(
        &mut self,
        key: impl Into<String>,
        requirement: CsiSecretRequirement,
    ) -> &mut Self {
        self.csi_requirements.insert(key.into(), requirement);
        self
    }

    /// Adds a catalog-level environment binding not tied to any
    /// contribution. These render after all contribution bindings.
    pub fn add_env_binding(&mut self, binding: EnvBinding) -> &mut Self {
        self.extra_env.push(binding);
        self
    }

    /// All volumes, sorted by name: one per contribution with a volume
    /// source, plus one synthesized volume per unsatisfied CSI requirement
    /// identity.
    pub fn volumes(&self) -> Vec<Volume> {
        let mut volumes: Vec<Volume> = self
            .contributions
            .iter()
            .filter_map(|(name, contribution)| {
                contribution
                    .volume_source
                    .as_ref()
                    .map(|source| source.to_volume(name))
            })
            .collect();

        for (key, requirement) in self.unsatisfied_requirements() {
            volumes.push(requirement.source.to_volume_named(key));
        }

        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        volumes
    }

    /// All volume mounts, each tagged with its owning volume name, sorted by
    /// (volume name, mount path, sub path, read-only).
    pub fn volume_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts: Vec<VolumeMount> = self
            .contributions
            .iter()
            .flat_map(|(name, contribution)| {
                contribution
                    .mount_points
                    .iter()
                    .map(|mount_point| mount_point.to_volume_mount(name))
            })
            .collect();

        for (key, requirement) in self.unsatisfied_requirements() {
            let mount_point = requirement
                .fallback_mount
                .clone()
                .unwrap_or_else(|| MountPoint::new(FALLBACK_CSI_MOUNT_PATH).read_only());
            mounts.push(mount_point.to_volume_mount(key));
        }

        mounts.sort_by(|a, b| mount_sort_key(a).cmp(&mount_sort_key(b)));
        mounts
    }

    /// All environment variables: contribution bindings in contribution
    /// registration order, then catalog-level extras.
    pub fn env_vars(&self) -> Vec<EnvVar> {
        self.contributions
            .values()
            .flat_map(|contribution| contribution.env.iter())
            .chain(self.extra_env.iter())
            .map(EnvBinding::to_env_var)
            .collect()
    }

    /// Requirements not covered by any contributed CSI volume, de-duplicated
    /// by identity: the first requirement per distinct identity wins, so
    /// exactly one volume is synthesized per unsatisfied identity.
    fn unsatisfied_requirements(&self) -> Vec<(&str, &CsiSecretRequirement)> {
        let mut satisfied: BTreeSet<_> = self
            .contributions
            .values()
            .filter_map(|contribution| contribution.volume_source.as_ref())
            .filter_map(VolumeSource::csi_secret_source)
            .map(CsiSecretSource::identity)
            .collect();

        let mut unsatisfied = Vec::new();
        for (key, requirement) in &self.csi_requirements {
            if satisfied.insert(requirement.source.identity()) {
                unsatisfied.push((key.as_str(), requirement));
            }
        }

        unsatisfied
    }
}

impl CsiSecretSource {
    fn to_volume_named(&self, name: &str) -> Volume {
        Volume {
            name: name.to_owned(),
            csi: Some(self.to_csi_volume_source()),
            ..Volume::default()
        }
    }
}

fn mount_sort_key(mount: &VolumeMount) -> (&str, &str, Option<&str>, bool) {
    (
        &mount.name,
        &mount.mount_path,
        mount.sub_path.as_deref(),
        mount.read_only.unwrap_or_default(),
    )
}
