use crate::consistency;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

pub const DEFAULT_PROFILE_ID: &str = "default";
pub const DEFAULT_PROFILE_NAME: &str = "Default";
const PROFILES_FILE: &str = "profiles.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ModType {
    Pack,
    Plugin,
    EarlyPlugin,
}

impl ModType {
    pub fn label(self) -> &'static str {
        match self {
            ModType::Pack => "Pack",
            ModType::Plugin => "Plugin",
            ModType::EarlyPlugin => "Early Plugin",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ModFormat {
    Zip,
    Jar,
    Directory,
}

impl ModFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(ModFormat::Directory);
        }
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ModFormat::Zip),
            "jar" => Some(ModFormat::Jar),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModFormat::Zip => "Zip",
            ModFormat::Jar => "Jar",
            ModFormat::Directory => "Folder",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModLocation {
    Mods,
    Packs,
    EarlyPlugins,
}

impl ModLocation {
    pub const ALL: [ModLocation; 3] = [
        ModLocation::Mods,
        ModLocation::Packs,
        ModLocation::EarlyPlugins,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            ModLocation::Mods => "mods",
            ModLocation::Packs => "packs",
            ModLocation::EarlyPlugins => "earlyplugins",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModLocation::Mods => "Mods",
            ModLocation::Packs => "Packs",
            ModLocation::EarlyPlugins => "Early Plugins",
        }
    }
}

/// One discovered mod, pack or plugin. Rebuilt wholesale on every scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mod_type: ModType,
    pub format: ModFormat,
    pub location: ModLocation,
    pub path: PathBuf,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub optional_dependencies: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(format!("expected up or down, got {other:?}")),
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveDirection::Up => f.write_str("up"),
            MoveDirection::Down => f.write_str("down"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile \"{0}\" is read-only")]
    Readonly(String),
    #[error("a profile named \"{0}\" already exists")]
    DuplicateName(String),
    #[error("profile name cannot be empty")]
    EmptyName,
    #[error("profile not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled_mods: Vec<String>,
    #[serde(default)]
    pub load_order: Vec<String>,
    #[serde(default)]
    pub readonly: bool,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            id: generate_profile_id(name),
            name: name.trim().to_string(),
            enabled_mods: Vec::new(),
            load_order: Vec::new(),
            readonly: false,
        }
    }

    /// The built-in profile mirroring the live install: everything enabled,
    /// loaded in catalog order.
    pub fn default_for_catalog(mod_ids: &[String]) -> Self {
        Self {
            id: DEFAULT_PROFILE_ID.to_string(),
            name: DEFAULT_PROFILE_NAME.to_string(),
            enabled_mods: mod_ids.to_vec(),
            load_order: mod_ids.to_vec(),
            readonly: true,
        }
    }

    pub fn is_enabled(&self, mod_id: &str) -> bool {
        self.enabled_mods.iter().any(|id| id == mod_id)
    }

    /// Returns the load order with `mod_id` shifted one slot. Unknown ids and
    /// moves past either end leave the order untouched.
    pub fn move_load_order(&self, mod_id: &str, direction: MoveDirection) -> Vec<String> {
        let mut order = self.load_order.clone();
        let Some(index) = order.iter().position(|id| id == mod_id) else {
            return order;
        };
        let target = match direction {
            MoveDirection::Up => match index.checked_sub(1) {
                Some(target) => target,
                None => return order,
            },
            MoveDirection::Down => index + 1,
        };
        if target >= order.len() {
            return order;
        }
        let id = order.remove(index);
        order.insert(target, id);
        order
    }

    /// Returns a copy with `mod_id` enabled or disabled. Enabling appends to
    /// the load order, disabling drops it from there too.
    pub fn toggle_mod(&self, mod_id: &str, enable: bool) -> Result<Profile, ProfileError> {
        if self.readonly {
            return Err(ProfileError::Readonly(self.name.clone()));
        }
        let mut next = self.clone();
        if enable {
            if !next.is_enabled(mod_id) {
                next.enabled_mods.push(mod_id.to_string());
            }
            if !next.load_order.iter().any(|id| id == mod_id) {
                next.load_order.push(mod_id.to_string());
            }
        } else {
            next.enabled_mods.retain(|id| id != mod_id);
            next.load_order.retain(|id| id != mod_id);
        }
        Ok(next)
    }

    /// Collapses repeated ids, keeping first occurrences.
    pub fn normalized(mut self) -> Self {
        dedup_in_place(&mut self.enabled_mods);
        dedup_in_place(&mut self.load_order);
        self.name = self.name.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesState {
    #[serde(default)]
    pub active_profile_id: Option<String>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl ProfilesState {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(PROFILES_FILE);
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read profiles.json")?;
            let mut state: ProfilesState =
                serde_json::from_str(&raw).context("parse profiles.json")?;
            state.profiles.retain(|profile| !profile.readonly);
            return Ok(state);
        }

        let state = ProfilesState::default();
        state.save(data_dir)?;
        Ok(state)
    }

    /// Writes the user profiles. Read-only profiles are derived, never stored.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir).context("create data dir")?;
        let stored = ProfilesState {
            active_profile_id: self.active_profile_id.clone(),
            profiles: self
                .profiles
                .iter()
                .filter(|profile| !profile.readonly)
                .cloned()
                .collect(),
        };
        let raw = serde_json::to_string_pretty(&stored).context("serialize profiles.json")?;
        fs::write(data_dir.join(PROFILES_FILE), raw).context("write profiles.json")?;
        Ok(())
    }

    /// Puts the built-in profile in front and makes it active when nothing is.
    pub fn with_default_profile(mut self, default: Profile) -> Self {
        self.profiles.retain(|profile| profile.id != default.id);
        if self.active_profile_id.is_none() {
            self.active_profile_id = Some(default.id.clone());
        }
        self.profiles.insert(0, default);
        self
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        consistency::resolve_active_profile(Some(self))
    }

    pub fn find(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }

    pub fn set_active(&mut self, id: &str) -> Result<(), ProfileError> {
        if self.find(id).is_none() {
            return Err(ProfileError::NotFound(id.to_string()));
        }
        self.active_profile_id = Some(id.to_string());
        Ok(())
    }

    pub fn create_profile(
        &mut self,
        name: &str,
        source: Option<&Profile>,
    ) -> Result<Profile, ProfileError> {
        let name = self.validate_name(name, None)?;
        let mut profile = Profile::new(&name);
        if let Some(source) = source {
            profile.enabled_mods = source.enabled_mods.clone();
            profile.load_order = source.load_order.clone();
        }
        while self.find(&profile.id).is_some() {
            profile.id = generate_profile_id(&profile.id);
        }
        self.profiles.push(profile.clone());
        Ok(profile)
    }

    pub fn rename_profile(&mut self, id: &str, name: &str) -> Result<Profile, ProfileError> {
        self.ensure_editable(id)?;
        let name = self.validate_name(name, Some(id))?;
        let profile = self
            .profiles
            .iter_mut()
            .find(|profile| profile.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        profile.name = name;
        Ok(profile.clone())
    }

    pub fn delete_profile(&mut self, id: &str) -> Result<Profile, ProfileError> {
        self.ensure_editable(id)?;
        let index = self
            .profiles
            .iter()
            .position(|profile| profile.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        let removed = self.profiles.remove(index);
        if self.active_profile_id.as_deref() == Some(id) {
            self.active_profile_id = None;
        }
        Ok(removed)
    }

    /// Replaces the stored profile with the same id.
    pub fn replace_profile(&mut self, profile: Profile) -> Result<Profile, ProfileError> {
        self.ensure_editable(&profile.id)?;
        if profile.readonly {
            return Err(ProfileError::Readonly(profile.name));
        }
        if profile.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let profile = profile.normalized();
        let slot = self
            .profiles
            .iter_mut()
            .find(|existing| existing.id == profile.id)
            .ok_or_else(|| ProfileError::NotFound(profile.id.clone()))?;
        *slot = profile.clone();
        Ok(profile)
    }

    fn ensure_editable(&self, id: &str) -> Result<(), ProfileError> {
        match self.find(id) {
            Some(profile) if profile.readonly => Err(ProfileError::Readonly(profile.name.clone())),
            Some(_) => Ok(()),
            None if id == DEFAULT_PROFILE_ID => {
                Err(ProfileError::Readonly(DEFAULT_PROFILE_NAME.to_string()))
            }
            None => Err(ProfileError::NotFound(id.to_string())),
        }
    }

    fn validate_name(&self, name: &str, exclude_id: Option<&str>) -> Result<String, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let taken = name.eq_ignore_ascii_case(DEFAULT_PROFILE_NAME)
            || self.profiles.iter().any(|profile| {
                Some(profile.id.as_str()) != exclude_id && profile.name.eq_ignore_ascii_case(name)
            });
        if taken {
            return Err(ProfileError::DuplicateName(name.to_string()));
        }
        Ok(name.to_string())
    }
}

fn generate_profile_id(seed: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    hasher.update(&nanos.to_le_bytes());
    let hex = hasher.finalize().to_hex();
    format!("profile-{}", &hex.as_str()[..12])
}

fn dedup_in_place(ids: &mut Vec<String>) {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}
