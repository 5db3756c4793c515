//! Profile consistency checks: counts, enabled set, dependency and load-order
//! warnings, and the resolved load-order rows shown to the user.
//!
//! Everything here is a pure function of a catalog and a profile. Divergence
//! between the two (stale ids, ids enabled but never ordered) is reported,
//! never rejected.

use crate::library::{ModEntry, ModType, Profile, ProfilesState};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

pub const UNKNOWN_TYPE_LABEL: &str = "Unknown";
pub const MISSING_LOCATION_LABEL: &str = "Not found";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModCounts {
    pub total: usize,
    pub packs: usize,
    pub plugins: usize,
    pub early: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOrderRow {
    pub id: String,
    pub name: String,
    pub type_label: String,
    pub location_label: String,
    pub missing: bool,
}

pub fn compute_counts(catalog: &[ModEntry]) -> ModCounts {
    let mut counts = ModCounts {
        total: catalog.len(),
        ..ModCounts::default()
    };
    for mod_entry in catalog {
        match mod_entry.mod_type {
            ModType::Pack => counts.packs += 1,
            ModType::Plugin => counts.plugins += 1,
            ModType::EarlyPlugin => counts.early += 1,
        }
    }
    counts
}

/// First profile whose id matches the active pointer.
pub fn resolve_active_profile(state: Option<&ProfilesState>) -> Option<&Profile> {
    let state = state?;
    let active_id = state.active_profile_id.as_deref()?;
    state.profiles.iter().find(|profile| profile.id == active_id)
}

pub fn enabled_set(profile: Option<&Profile>) -> HashSet<String> {
    profile
        .map(|profile| profile.enabled_mods.iter().cloned().collect())
        .unwrap_or_default()
}

/// Case-insensitive lookup of dependency strings against mod ids and names.
///
/// Ids are indexed before names and a name never displaces a key that is
/// already taken, so an id match always wins and, among mods sharing a name,
/// the first one in catalog order wins.
#[derive(Debug, Clone)]
pub struct DependencyLookup<'a> {
    keys: HashMap<String, &'a ModEntry>,
}

impl<'a> DependencyLookup<'a> {
    pub fn new(catalog: &'a [ModEntry]) -> Self {
        let mut keys = HashMap::new();
        for mod_entry in catalog {
            let key = lookup_key(&mod_entry.id);
            if !key.is_empty() {
                keys.entry(key).or_insert(mod_entry);
            }
        }
        for mod_entry in catalog {
            let key = lookup_key(&mod_entry.name);
            if !key.is_empty() {
                keys.entry(key).or_insert(mod_entry);
            }
        }
        Self { keys }
    }

    pub fn resolve(&self, dependency: &str) -> Option<&'a ModEntry> {
        self.keys.get(&lookup_key(dependency)).copied()
    }
}

fn lookup_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Sorted, de-duplicated warnings for enabled mods whose dependencies are
/// missing, disabled, or ordered after them.
pub fn dependency_warnings(catalog: &[ModEntry], profile: Option<&Profile>) -> Vec<String> {
    let Some(profile) = profile else {
        return Vec::new();
    };

    let lookup = DependencyLookup::new(catalog);
    let enabled = enabled_set(Some(profile));
    let mut load_index: HashMap<&str, usize> = HashMap::new();
    for (index, id) in profile.load_order.iter().enumerate() {
        load_index.entry(id.as_str()).or_insert(index);
    }

    let mut warnings = BTreeSet::new();
    for mod_entry in catalog {
        if !enabled.contains(&mod_entry.id) {
            continue;
        }
        let own_index = load_index.get(mod_entry.id.as_str()).copied();
        if own_index.is_none() {
            warnings.insert(format!(
                "{}: enabled but missing from the load order.",
                mod_entry.name
            ));
        }

        for dependency in &mod_entry.dependencies {
            let label = dependency.trim();
            if label.is_empty() {
                continue;
            }
            let Some(dep_entry) = lookup.resolve(label) else {
                warnings.insert(format!("{}: missing dependency {label}.", mod_entry.name));
                continue;
            };
            if !enabled.contains(&dep_entry.id) {
                warnings.insert(format!(
                    "{}: dependency {} is disabled.",
                    mod_entry.name, dep_entry.name
                ));
                continue;
            }
            let dep_index = load_index.get(dep_entry.id.as_str()).copied();
            if let (Some(own_index), Some(dep_index)) = (own_index, dep_index) {
                if dep_index > own_index {
                    warnings.insert(format!(
                        "{}: {} should load before this mod.",
                        mod_entry.name, dep_entry.name
                    ));
                }
            }
        }
    }

    warnings.into_iter().collect()
}

/// One row per load-order id, stale ids included and flagged as missing.
pub fn load_order_rows(catalog: &[ModEntry], profile: Option<&Profile>) -> Vec<LoadOrderRow> {
    let Some(profile) = profile else {
        return Vec::new();
    };
    let by_id: HashMap<&str, &ModEntry> = catalog
        .iter()
        .rev()
        .map(|mod_entry| (mod_entry.id.as_str(), mod_entry))
        .collect();

    profile
        .load_order
        .iter()
        .map(|id| match by_id.get(id.as_str()) {
            Some(mod_entry) => LoadOrderRow {
                id: id.clone(),
                name: mod_entry.name.clone(),
                type_label: mod_entry.mod_type.label().to_string(),
                location_label: mod_entry.location.label().to_string(),
                missing: false,
            },
            None => LoadOrderRow {
                id: id.clone(),
                name: id.clone(),
                type_label: UNKNOWN_TYPE_LABEL.to_string(),
                location_label: MISSING_LOCATION_LABEL.to_string(),
                missing: true,
            },
        })
        .collect()
}
