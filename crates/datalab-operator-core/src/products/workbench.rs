//! Workbench: the interactive session product. Renders `rserver.conf`,
//! `launcher.conf` and `profiles.conf`, and wires shared storage, generated
//! configuration, the session signing key and the license secret.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    confgen::{
        self, Assignment, ConfigFile, ConfigFileSet, Field, KeyCase, MapHeaderStyle, RenderStyle,
        Section, SectionValue, WILDCARD_SECTION,
    },
    mounts::{
        self, CsiSecretRequirement, CsiSecretSource, EnvBinding, MountCatalog, MountContribution,
        MountPoint, VolumeSource,
    },
    profiles::{ResourceProfile, SchedulingProfile, rank_profiles, sync_placement_constraints},
};

pub const RSERVER_CONF: &str = "rserver.conf";
pub const LAUNCHER_CONF: &str = "launcher.conf";
pub const PROFILES_CONF: &str = "profiles.conf";

/// Name of the ConfigMap the rendered files are published under.
pub const GENERATED_CONFIG_MAP: &str = "workbench-generated-config";

// Spacing and casing are part of the format each file family parses.
const RSERVER_STYLE: RenderStyle = RenderStyle {
    assignment: Assignment::Spaced,
    key_case: KeyCase::Kebab,
};
const LAUNCHER_STYLE: RenderStyle = RenderStyle {
    assignment: Assignment::Compact,
    key_case: KeyCase::Kebab,
};
const PROFILES_STYLE: RenderStyle = RenderStyle {
    assignment: Assignment::Compact,
    key_case: KeyCase::Kebab,
};

/// Workbench instance specification, populated from the custom resource.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchSpec {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub launcher: Option<LauncherSettings>,

    /// Claim backing the shared home directory.
    #[serde(default)]
    pub shared_storage_claim: Option<String>,

    /// Secret holding the session signing key, exposed to the container as
    /// an environment variable.
    #[serde(default)]
    pub session_key_secret: Option<String>,

    /// Secret-provider class serving the license file.
    #[serde(default)]
    pub license_provider_class: Option<String>,

    #[serde(default)]
    pub resource_profiles: BTreeMap<String, ResourceProfile>,

    #[serde(default)]
    pub scheduling_profiles: Vec<SchedulingProfile>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub www_port: Option<u16>,

    #[serde(default)]
    pub admin_enabled: bool,

    /// Explicit-optional: setting this to an empty string renders an empty
    /// `license-claim` line, which the product reads as "claim cleared".
    #[serde(default)]
    pub license_claim: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherSettings {
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub cluster_name: String,
}

/// Renders every configuration file of this instance, keyed by logical file
/// name. The profiles family renders second and would overwrite earlier
/// entries on a name collision.
pub fn build_config_files(
    spec: &WorkbenchSpec,
) -> Result<BTreeMap<String, String>, confgen::Error> {
    let mut files = vec![rserver_file(spec)];
    if let Some(launcher) = &spec.launcher {
        files.push(launcher_file(launcher));
    }

    let mut set = ConfigFileSet::render(&files)?;
    set.merge(ConfigFileSet::render(&[profiles_file(spec)])?);
    Ok(set.into_map())
}

/// Populates the mount catalog with this instance's container wiring.
pub fn build_mount_catalog(spec: &WorkbenchSpec) -> Result<MountCatalog, mounts::Error> {
    let mut catalog = MountCatalog::new();

    catalog.add_contribution(
        "workbench-config",
        MountContribution::new()
            .with_volume_source(VolumeSource::config_map(GENERATED_CONFIG_MAP))
            .with_mount_point(MountPoint::new("/etc/workbench").read_only()),
    )?;

    if let Some(claim) = &spec.shared_storage_claim {
        catalog.add_contribution(
            "shared-storage",
            MountContribution::new()
                .with_volume_source(VolumeSource::persistent_volume_claim(claim, false))
                .with_mount_point(MountPoint::new("/home")),
        )?;
    }

    if let Some(secret) = &spec.session_key_secret {
        catalog.add_contribution(
            "session-key",
            MountContribution::new().with_env_binding(EnvBinding::secret_key(
                "WORKBENCH_SESSION_KEY",
                secret,
                "session-key",
            )),
        )?;
    }

    if let Some(provider_class) = &spec.license_provider_class {
        catalog.add_csi_requirement(
            "license",
            CsiSecretRequirement::new(CsiSecretSource::secrets_store(provider_class))
                .with_fallback_mount(MountPoint::new("/etc/workbench/license").read_only()),
        );
    }

    Ok(catalog)
}

fn rserver_file(spec: &WorkbenchSpec) -> ConfigFile {
    let server = &spec.server;

    let launcher_section = match &spec.launcher {
        None => Section::absent("Launcher"),
        Some(launcher) => Section::record(
            "Launcher",
            [
                Field::scalar("Enabled", true),
                Field::scalar("Address", &launcher.address),
                Field::scalar("Port", i64::from(launcher.port)),
            ],
        ),
    };

    ConfigFile::new(RSERVER_CONF, RSERVER_STYLE)
        .with_section(Section::record(
            "Server",
            [
                Field::scalar("Address", &server.address),
                Field::optional("WWWPort", server.www_port),
                Field::scalar("AdminEnabled", server.admin_enabled),
                Field::optional("LicenseClaim", server.license_claim.clone()),
            ],
        ))
        .with_section(launcher_section)
}

fn launcher_file(launcher: &LauncherSettings) -> ConfigFile {
    ConfigFile::new(LAUNCHER_CONF, LAUNCHER_STYLE)
        .with_section(Section::record(
            "Server",
            [
                Field::scalar("Address", &launcher.address),
                Field::scalar("Port", i64::from(launcher.port)),
            ],
        ))
        .with_section(Section::record(
            "Cluster",
            [Field::scalar("Name", &launcher.cluster_name)],
        ))
}

/// One `[*]` section listing every resource profile in ranked order, then
/// one section per scheduling profile with its referenced profiles (ranked)
/// and synchronized placement constraints.
fn profiles_file(spec: &WorkbenchSpec) -> ConfigFile {
    let ranked_names: Vec<String> = rank_profiles(&spec.resource_profiles)
        .iter()
        .map(|profile| profile.name.clone())
        .collect();

    let mut entries = BTreeMap::new();
    for scheduling_profile in &spec.scheduling_profiles {
        let mut profile = scheduling_profile.clone();
        sync_placement_constraints(&mut profile, &spec.resource_profiles);

        let referenced: Vec<String> = ranked_names
            .iter()
            .filter(|name| profile.resource_profiles.contains(*name))
            .cloned()
            .collect();
        let constraints: Vec<String> = profile
            .placement_constraints
            .iter()
            .map(ToString::to_string)
            .collect();

        entries.insert(
            profile.name.clone(),
            SectionValue::record([
                Field::scalar("ResourceProfiles", referenced.join(",")),
                Field::scalar("PlacementConstraints", constraints.join(",")),
            ]),
        );
    }

    ConfigFile::new(PROFILES_CONF, PROFILES_STYLE)
        .with_section(Section::record(
            WILDCARD_SECTION,
            [Field::scalar("ResourceProfiles", ranked_names.join(","))],
        ))
        .with_section(Section::map("Profiles", entries, MapHeaderStyle::Bare))
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;
    use crate::profiles::ResourceBounds;

    fn spec() -> WorkbenchSpec {
        let mut resource_profiles = BTreeMap::new();
        for (name, cpu, constraints) in [
            ("default", "2", ""),
            ("tiny", "500m", ""),
            ("large", "4", "node-type=highmem"),
        ] {
            resource_profiles.insert(
                name.to_owned(),
                ResourceProfile {
                    name: name.to_owned(),
                    cpu: ResourceBounds {
                        limit: Some(cpu.to_owned()),
                        request: None,
                    },
                    placement_constraints: constraints.to_owned(),
                    ..ResourceProfile::default()
                },
            );
        }

        WorkbenchSpec {
            server: ServerSettings {
                address: "workbench.internal".to_owned(),
                www_port: Some(8787),
                admin_enabled: true,
                license_claim: None,
            },
            launcher: Some(LauncherSettings {
                address: "0.0.0.0".to_owned(),
                port: 5559,
                cluster_name: "Kubernetes".to_owned(),
            }),
            shared_storage_claim: Some("shared-home".to_owned()),
            session_key_secret: Some("workbench-session".to_owned()),
            license_provider_class: Some("workbench-license".to_owned()),
            resource_profiles,
            scheduling_profiles: vec![SchedulingProfile {
                name: "data-science".to_owned(),
                resource_profiles: vec!["large".to_owned(), "tiny".to_owned()],
                placement_constraints: vec!["zone:us-east-1a".parse().unwrap()],
            }],
        }
    }

    #[test]
    fn rserver_conf_golden() {
        let files = build_config_files(&spec()).unwrap();

        let expected = concat!(
            "\n[Server]\n",
            "address = workbench.internal\n",
            "www-port = 8787\n",
            "admin-enabled = 1\n",
            "\n[Launcher]\n",
            "enabled = 1\n",
            "address = 0.0.0.0\n",
            "port = 5559\n",
        );
        assert_eq!(files[RSERVER_CONF], expected);
    }

    #[test]
    fn launcher_conf_uses_compact_assignments() {
        let files = build_config_files(&spec()).unwrap();

        let expected = concat!(
            "\n[Server]\n",
            "address=0.0.0.0\n",
            "port=5559\n",
            "\n[Cluster]\n",
            "name=Kubernetes\n",
        );
        assert_eq!(files[LAUNCHER_CONF], expected);
    }

    #[test]
    fn profiles_conf_ranks_and_synchronizes() {
        let files = build_config_files(&spec()).unwrap();

        let expected = indoc! {"

            [*]
            resource-profiles=default,tiny,large

            [data-science]
            resource-profiles=tiny,large
            placement-constraints=zone:us-east-1a,node-type=highmem
        "};
        assert_eq!(files[PROFILES_CONF], expected);
    }

    #[test]
    fn cleared_license_claim_renders_empty_value() {
        let mut spec = spec();
        spec.server.license_claim = Some(String::new());

        let files = build_config_files(&spec).unwrap();
        assert!(files[RSERVER_CONF].contains("license-claim = \n"));
    }

    #[test]
    fn disabled_launcher_skips_section_and_file() {
        let mut spec = spec();
        spec.launcher = None;

        let files = build_config_files(&spec).unwrap();
        assert!(!files.contains_key(LAUNCHER_CONF));
        assert!(!files[RSERVER_CONF].contains("[Launcher]"));
    }

    #[test]
    fn mount_catalog_wires_all_contributions() {
        let catalog = build_mount_catalog(&spec()).unwrap();

        let volume_names: Vec<_> = catalog.volumes().into_iter().map(|v| v.name).collect();
        // license CSI requirement has no explicit contribution, so a dummy
        // volume named after the requirement key appears.
        assert_eq!(volume_names, ["license", "shared-storage", "workbench-config"]);

        let env_names: Vec<_> = catalog.env_vars().into_iter().map(|e| e.name).collect();
        assert_eq!(env_names, ["WORKBENCH_SESSION_KEY"]);

        let license_mount = catalog
            .volume_mounts()
            .into_iter()
            .find(|mount| mount.name == "license")
            .unwrap();
        assert_eq!(license_mount.mount_path, "/etc/workbench/license");
        assert_eq!(license_mount.read_only, Some(true));
    }

    #[test]
    fn spec_deserializes_from_camel_case() {
        let spec: WorkbenchSpec = serde_json::from_str(
            r#"{
                "server": { "address": "h", "adminEnabled": true },
                "sharedStorageClaim": "shared-home"
            }"#,
        )
        .unwrap();

        assert_eq!(spec.server.address, "h");
        assert_eq!(spec.shared_storage_claim.as_deref(), Some("shared-home"));
    }
}
