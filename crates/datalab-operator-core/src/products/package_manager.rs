//! Package manager: the repository mirror product. Renders `repos.conf`
//! (one quoted sub-section per named external repository) and wires the
//! data directory.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    confgen::{
        self, Assignment, ConfigFile, ConfigFileSet, Field, KeyCase, MapHeaderStyle, RenderStyle,
        Section, SectionValue,
    },
    mounts::{self, MountCatalog, MountContribution, MountPoint, VolumeSource},
};

pub const REPOS_CONF: &str = "repos.conf";

/// Name of the ConfigMap the rendered files are published under.
pub const GENERATED_CONFIG_MAP: &str = "package-manager-generated-config";

// The repos family keeps its declared key spelling (`Url`, not `url`).
const REPOS_STYLE: RenderStyle = RenderStyle {
    assignment: Assignment::Spaced,
    key_case: KeyCase::Verbatim,
};

/// Package manager instance specification, populated from the custom
/// resource.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManagerSpec {
    /// Named external repositories to mirror.
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositorySpec>,

    /// Claim backing the package data directory. Without one the data
    /// directory falls back to an ephemeral volume.
    #[serde(default)]
    pub data_claim: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySpec {
    #[serde(default)]
    pub url: String,

    /// Pin the repository to a dated snapshot instead of tracking latest.
    #[serde(default)]
    pub snapshot: Option<String>,
}

pub fn build_config_files(
    spec: &PackageManagerSpec,
) -> Result<BTreeMap<String, String>, confgen::Error> {
    let set = ConfigFileSet::render(&[repos_file(spec)])?;
    Ok(set.into_map())
}

pub fn build_mount_catalog(spec: &PackageManagerSpec) -> Result<MountCatalog, mounts::Error> {
    let mut catalog = MountCatalog::new();

    catalog.add_contribution(
        "package-manager-config",
        MountContribution::new()
            .with_volume_source(VolumeSource::config_map(GENERATED_CONFIG_MAP))
            .with_mount_point(MountPoint::new("/etc/package-manager").read_only()),
    )?;

    let data_source = match &spec.data_claim {
        Some(claim) => VolumeSource::persistent_volume_claim(claim, false),
        None => VolumeSource::empty_dir(),
    };
    catalog.add_contribution(
        "package-data",
        MountContribution::new()
            .with_volume_source(data_source)
            .with_mount_point(MountPoint::new("/var/lib/package-manager")),
    )?;

    Ok(catalog)
}

fn repos_file(spec: &PackageManagerSpec) -> ConfigFile {
    let entries: BTreeMap<String, SectionValue> = spec
        .repositories
        .iter()
        .map(|(name, repository)| {
            let fields = [
                Field::scalar("Url", &repository.url),
                Field::optional("Snapshot", repository.snapshot.clone()),
            ];
            (name.clone(), SectionValue::record(fields))
        })
        .collect();

    ConfigFile::new(REPOS_CONF, REPOS_STYLE).with_section(Section::map(
        "Repo",
        entries,
        MapHeaderStyle::Quoted,
    ))
}
