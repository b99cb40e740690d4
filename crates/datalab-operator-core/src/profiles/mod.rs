//! Compute-resource profiles and the scheduling profiles that reference
//! them.
//!
//! Resource profiles describe the CPU/memory/accelerator envelope a session
//! may run in; scheduling profiles group the resource profiles a class of
//! users may pick from. Before the profiles are serialized into launcher
//! configuration, placement constraints declared on resource profiles are
//! synchronized into every scheduling profile that references them, and the
//! profiles are ranked by effective magnitude so the rendered order is
//! stable and meaningful.

mod constraint;

use std::{cmp::Ordering, collections::BTreeMap, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use crate::profiles::constraint::{
    ParseConstraintError, PlacementConstraint, Separator, parse_constraint_list,
};
use crate::quantity::Quantity;

/// Name of the profile that always ranks first, regardless of magnitude.
pub const DEFAULT_PROFILE: &str = "default";

/// Limit/request pair for one resource, as quantity strings straight from
/// the custom resource.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBounds {
    pub limit: Option<String>,
    pub request: Option<String>,
}

/// A named compute-resource profile.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProfile {
    pub name: String,

    #[serde(default)]
    pub cpu: ResourceBounds,

    #[serde(default)]
    pub memory: ResourceBounds,

    #[serde(default)]
    pub nvidia_gpus: Option<u32>,

    #[serde(default)]
    pub amd_gpus: Option<u32>,

    /// Comma-separated `key=value` / `key:value` tokens.
    #[serde(default)]
    pub placement_constraints: String,
}

impl ResourceProfile {
    pub fn effective_cpu(&self) -> f64 {
        effective_quantity(&self.cpu)
    }

    pub fn effective_memory(&self) -> f64 {
        effective_quantity(&self.memory)
    }

    /// The valid placement constraints declared on this profile. Malformed
    /// tokens have already been warned about and dropped.
    pub fn constraints(&self) -> Vec<PlacementConstraint> {
        parse_constraint_list(&self.placement_constraints)
    }
}

/// The effective magnitude of a resource: the larger of limit and request.
/// Absent or unparsable values count as zero, matching the product default
/// of "absent resource = no constraint".
pub fn effective_quantity(bounds: &ResourceBounds) -> f64 {
    parse_or_zero(bounds.limit.as_deref()).max(parse_or_zero(bounds.request.as_deref()))
}

fn parse_or_zero(input: Option<&str>) -> f64 {
    let Some(input) = input else {
        return 0.0;
    };
    if input.is_empty() {
        return 0.0;
    }

    match Quantity::from_str(input) {
        Ok(quantity) => quantity.scalar(),
        Err(error) => {
            warn!(%error, input, "treating unparsable resource quantity as zero");
            0.0
        }
    }
}

/// Orders profiles for rendering: [`DEFAULT_PROFILE`] always first, the
/// rest ascending by effective CPU, then effective memory, then name.
pub fn rank_profiles(profiles: &BTreeMap<String, ResourceProfile>) -> Vec<&ResourceProfile> {
    let mut ranked: Vec<&ResourceProfile> = profiles.values().collect();
    ranked.sort_by(|a, b| compare_profiles(a, b));
    ranked
}

fn compare_profiles(a: &ResourceProfile, b: &ResourceProfile) -> Ordering {
    match (a.name == DEFAULT_PROFILE, b.name == DEFAULT_PROFILE) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .effective_cpu()
            .total_cmp(&b.effective_cpu())
            .then_with(|| a.effective_memory().total_cmp(&b.effective_memory()))
            .then_with(|| a.name.cmp(&b.name)),
    }
}

/// A scheduling profile: the resource profiles one class of users may
/// launch, plus its own placement constraints.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingProfile {
    pub name: String,

    /// Names of the resource profiles this scheduling profile may launch.
    #[serde(default)]
    pub resource_profiles: Vec<String>,

    #[serde(default)]
    pub placement_constraints: Vec<PlacementConstraint>,
}

/// Merges placement constraints from every referenced resource profile into
/// the scheduling profile's own list: existing entries stay first,
/// duplicates are dropped, collected entries append in reference order.
/// References to unknown resource profiles are warned about and skipped.
///
/// Callers run this before serializing scheduling profiles so the rendered
/// text reflects the synchronized constraints. Idempotent. Must not run
/// concurrently on the same profile; the `&mut` receiver makes that a
/// compile-time guarantee.
pub fn sync_placement_constraints(
    profile: &mut SchedulingProfile,
    resource_profiles: &BTreeMap<String, ResourceProfile>,
) {
    let mut collected = Vec::new();
    for name in &profile.resource_profiles {
        let Some(resource_profile) = resource_profiles.get(name) else {
            warn!(
                scheduling_profile = %profile.name,
                resource_profile = %name,
                "scheduling profile references unknown resource profile"
            );
            continue;
        };

        collected.extend(resource_profile.constraints());
    }

    for constraint in collected {
        if !profile.placement_constraints.contains(&constraint) {
            profile.placement_constraints.push(constraint);
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn profile(name: &str, cpu_limit: &str, memory_limit: &str) -> ResourceProfile {
        ResourceProfile {
            name: name.to_owned(),
            cpu: ResourceBounds {
                limit: (!cpu_limit.is_empty()).then(|| cpu_limit.to_owned()),
                request: None,
            },
            memory: ResourceBounds {
                limit: (!memory_limit.is_empty()).then(|| memory_limit.to_owned()),
                request: None,
            },
            ..ResourceProfile::default()
        }
    }

    fn profile_set(profiles: Vec<ResourceProfile>) -> BTreeMap<String, ResourceProfile> {
        profiles.into_iter().map(|p| (p.name.clone(), p)).collect()
    }

    #[rstest]
    #[case(Some("1"), Some("2"), 2.0)]
    #[case(Some("2"), Some("1"), 2.0)]
    #[case(None, None, 0.0)]
    #[case(Some(""), Some(""), 0.0)]
    #[case(Some("500m"), None, 0.5)]
    #[case(Some("not-a-quantity"), Some("3"), 3.0)]
    fn effective_quantity_law(
        #[case] limit: Option<&str>,
        #[case] request: Option<&str>,
        #[case] expected: f64,
    ) {
        let bounds = ResourceBounds {
            limit: limit.map(ToOwned::to_owned),
            request: request.map(ToOwned::to_owned),
        };
        assert!((effective_quantity(&bounds) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn default_profile_ranks_first() {
        let profiles = profile_set(vec![
            profile("default", "2", "8Gi"),
            profile("tiny", "500m", "1Gi"),
            profile("large", "4", "32Gi"),
        ]);

        let ranked: Vec<_> = rank_profiles(&profiles).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(ranked, ["default", "tiny", "large"]);
    }

    #[test]
    fn cpu_ties_break_on_memory_then_name() {
        let profiles = profile_set(vec![
            profile("b-large-mem", "2", "16Gi"),
            profile("a-small-mem", "2", "4Gi"),
            profile("same-as-small", "2", "4Gi"),
        ]);

        let ranked: Vec<_> = rank_profiles(&profiles).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(ranked, ["a-small-mem", "same-as-small", "b-large-mem"]);
    }

    #[test]
    fn request_counts_when_larger_than_limit() {
        let mut high_request = profile("high-request", "1", "");
        high_request.cpu.request = Some("8".to_owned());

        let profiles = profile_set(vec![high_request, profile("mid", "4", "")]);

        let ranked: Vec<_> = rank_profiles(&profiles).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(ranked, ["mid", "high-request"]);
    }

    #[test]
    fn sync_merges_preserve_then_append() {
        let mut small = profile("small", "1", "2Gi");
        small.placement_constraints = "node-type=cpu,zone:us-east-1a".to_owned();
        let mut gpu = profile("gpu", "4", "16Gi");
        gpu.placement_constraints = "node-type=gpu".to_owned();
        let resource_profiles = profile_set(vec![small, gpu]);

        let mut scheduling = SchedulingProfile {
            name: "data-science".to_owned(),
            resource_profiles: vec!["small".to_owned(), "gpu".to_owned()],
            placement_constraints: vec!["zone:us-east-1a".parse().unwrap()],
        };

        sync_placement_constraints(&mut scheduling, &resource_profiles);

        let rendered: Vec<_> = scheduling
            .placement_constraints
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, ["zone:us-east-1a", "node-type=cpu", "node-type=gpu"]);
    }

    #[test]
    fn sync_is_idempotent() {
        let mut gpu = profile("gpu", "4", "16Gi");
        gpu.placement_constraints = "node-type=gpu".to_owned();
        let resource_profiles = profile_set(vec![gpu]);

        let mut scheduling = SchedulingProfile {
            name: "ml".to_owned(),
            resource_profiles: vec!["gpu".to_owned()],
            ..SchedulingProfile::default()
        };

        sync_placement_constraints(&mut scheduling, &resource_profiles);
        let once = scheduling.clone();
        sync_placement_constraints(&mut scheduling, &resource_profiles);

        assert_eq!(scheduling, once);
    }

    #[test]
    fn dangling_reference_is_skipped() {
        let resource_profiles = profile_set(vec![profile("small", "1", "2Gi")]);

        let mut scheduling = SchedulingProfile {
            name: "ml".to_owned(),
            resource_profiles: vec!["missing".to_owned(), "small".to_owned()],
            ..SchedulingProfile::default()
        };

        sync_placement_constraints(&mut scheduling, &resource_profiles);
        assert!(scheduling.placement_constraints.is_empty());
    }

    #[test]
    fn equal_key_value_with_different_separator_are_distinct() {
        let mut gpu = profile("gpu", "4", "16Gi");
        gpu.placement_constraints = "node-type:gpu".to_owned();
        let resource_profiles = profile_set(vec![gpu]);

        let mut scheduling = SchedulingProfile {
            name: "ml".to_owned(),
            resource_profiles: vec!["gpu".to_owned()],
            placement_constraints: vec!["node-type=gpu".parse().unwrap()],
        };

        sync_placement_constraints(&mut scheduling, &resource_profiles);
        assert_eq!(scheduling.placement_constraints.len(), 2);
    }

    #[test]
    fn scheduling_profile_deserializes_constraint_tokens() {
        let profile: SchedulingProfile = serde_json::from_str(
            r#"{
                "name": "ml",
                "resourceProfiles": ["gpu"],
                "placementConstraints": ["node-type=gpu"]
            }"#,
        )
        .unwrap();

        assert_eq!(profile.placement_constraints.len(), 1);
        assert_eq!(profile.placement_constraints[0].key, "node-type");
    }
}
