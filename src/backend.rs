//! The boundary between the session and everything that touches disk.

use crate::{
    backup::{self, SnapshotMeta},
    consistency,
    game::InstallPaths,
    library::{Profile, ProfilesState},
    scanner::{self, CatalogScan},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub snapshot_id: String,
    pub warnings: Vec<String>,
}

pub trait ModBackend {
    fn scan_catalog(&mut self) -> Result<CatalogScan>;
    fn profiles_state(&mut self) -> Result<ProfilesState>;
    /// Persists a whole profile and returns the stored, normalized copy.
    fn update_profile(&mut self, profile: Profile) -> Result<Profile>;
    fn create_profile(&mut self, name: &str, source_id: Option<&str>) -> Result<Profile>;
    fn rename_profile(&mut self, id: &str, name: &str) -> Result<Profile>;
    fn delete_profile(&mut self, id: &str) -> Result<()>;
    fn set_active_profile(&mut self, id: &str) -> Result<()>;
    fn apply_profile(&mut self, id: &str) -> Result<ApplyReport>;
    /// Restores the profiles saved in a snapshot, the latest one when `None`.
    fn rollback(&mut self, snapshot_id: Option<&str>) -> Result<String>;
    fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>>;
}

const APPLIED_FILE: &str = "applied.json";

/// The profile most recently applied and the snapshot taken for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRecord {
    pub profile_id: String,
    pub snapshot_id: String,
}

/// Filesystem backend: scans the install and keeps profiles in the data dir.
#[derive(Debug)]
pub struct LocalBackend {
    data_dir: PathBuf,
    paths: InstallPaths,
    live_ids: Option<Vec<String>>,
}

impl LocalBackend {
    pub fn new(data_dir: &Path, paths: InstallPaths) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            paths,
            live_ids: None,
        }
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn last_applied(&self) -> Result<Option<AppliedRecord>> {
        let path = self.data_dir.join(APPLIED_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).context("read applied record")?;
        let record = serde_json::from_str(&raw).context("parse applied record")?;
        Ok(Some(record))
    }

    fn stored_state(&self) -> Result<ProfilesState> {
        ProfilesState::load_or_create(&self.data_dir)
    }

    fn live_ids(&mut self) -> Result<Vec<String>> {
        if let Some(ids) = &self.live_ids {
            return Ok(ids.clone());
        }
        Ok(self.scan_catalog()?.mod_ids())
    }

    fn edit_state<T>(
        &mut self,
        edit: impl FnOnce(&mut ProfilesState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.stored_state()?;
        let out = edit(&mut state)?;
        state.save(&self.data_dir)?;
        Ok(out)
    }
}

impl ModBackend for LocalBackend {
    fn scan_catalog(&mut self) -> Result<CatalogScan> {
        let scan = scanner::scan_catalog(&self.paths)
            .with_context(|| format!("scan {}", self.paths.root.display()))?;
        debug!(mods = scan.mods.len(), warnings = scan.warnings.len(), "catalog scanned");
        self.live_ids = Some(scan.mod_ids());
        Ok(scan)
    }

    fn profiles_state(&mut self) -> Result<ProfilesState> {
        let live_ids = self.live_ids()?;
        let state = self.stored_state()?;
        Ok(state.with_default_profile(Profile::default_for_catalog(&live_ids)))
    }

    fn update_profile(&mut self, profile: Profile) -> Result<Profile> {
        let stored = self.edit_state(|state| Ok(state.replace_profile(profile)?))?;
        info!(profile = %stored.id, "profile saved");
        Ok(stored)
    }

    fn create_profile(&mut self, name: &str, source_id: Option<&str>) -> Result<Profile> {
        let source = match source_id {
            Some(id) => Some(
                self.profiles_state()?
                    .find(id)
                    .cloned()
                    .with_context(|| format!("profile not found: {id}"))?,
            ),
            None => None,
        };
        let created = self.edit_state(|state| Ok(state.create_profile(name, source.as_ref())?))?;
        info!(profile = %created.id, name = %created.name, "profile created");
        Ok(created)
    }

    fn rename_profile(&mut self, id: &str, name: &str) -> Result<Profile> {
        let renamed = self.edit_state(|state| Ok(state.rename_profile(id, name)?))?;
        info!(profile = %renamed.id, name = %renamed.name, "profile renamed");
        Ok(renamed)
    }

    fn delete_profile(&mut self, id: &str) -> Result<()> {
        self.edit_state(|state| Ok(state.delete_profile(id)?))?;
        info!(profile = %id, "profile deleted");
        Ok(())
    }

    fn set_active_profile(&mut self, id: &str) -> Result<()> {
        let live_ids = self.live_ids()?;
        self.edit_state(|state| {
            let mut merged = state
                .clone()
                .with_default_profile(Profile::default_for_catalog(&live_ids));
            merged.set_active(id)?;
            state.active_profile_id = merged.active_profile_id;
            Ok(())
        })
    }

    fn apply_profile(&mut self, id: &str) -> Result<ApplyReport> {
        let scan = self.scan_catalog()?;
        let state = self.profiles_state()?;
        let profile = state
            .find(id)
            .cloned()
            .with_context(|| format!("profile not found: {id}"))?;

        let mut warnings = consistency::dependency_warnings(&scan.mods, Some(&profile));
        let installed: HashSet<&str> = scan.mods.iter().map(|m| m.id.as_str()).collect();
        for mod_id in &profile.enabled_mods {
            if !installed.contains(mod_id.as_str()) {
                warnings.push(format!("{mod_id}: enabled but not installed."));
            }
        }

        let meta = backup::create_snapshot(
            &self.data_dir,
            &state,
            &scan.mods,
            &profile,
            Some("apply"),
        )?;
        let record = AppliedRecord {
            profile_id: profile.id.clone(),
            snapshot_id: meta.id.clone(),
        };
        let raw = serde_json::to_string_pretty(&record).context("serialize applied record")?;
        fs::write(self.data_dir.join(APPLIED_FILE), raw).context("write applied record")?;

        info!(profile = %profile.id, snapshot = %meta.id, warnings = warnings.len(), "profile applied");
        Ok(ApplyReport {
            snapshot_id: meta.id,
            warnings,
        })
    }

    fn rollback(&mut self, snapshot_id: Option<&str>) -> Result<String> {
        let id = match snapshot_id {
            Some(id) => id.to_string(),
            None => backup::load_last_snapshot(&self.data_dir)?
                .context("no snapshot to roll back to")?,
        };
        let state = backup::load_snapshot_state(&self.data_dir, &id)?;
        state.save(&self.data_dir)?;
        info!(snapshot = %id, "profiles restored");
        Ok(id)
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>> {
        backup::list_snapshots(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{ModLocation, DEFAULT_PROFILE_ID};

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("install");
        let paths = InstallPaths::from_root(&root);
        for location in ModLocation::ALL {
            fs::create_dir_all(paths.dir_for(location)).unwrap();
        }
        for name in ["alpha", "beta"] {
            let mod_dir = paths.mods_dir.join(name);
            fs::create_dir(&mod_dir).unwrap();
            fs::write(mod_dir.join("manifest.json"), format!(r#"{{"Name": "{name}"}}"#)).unwrap();
        }
        let backend = LocalBackend::new(&dir.path().join("data"), paths);
        (dir, backend)
    }

    #[test]
    fn default_profile_mirrors_install() {
        let (_dir, mut backend) = backend();
        let state = backend.profiles_state().unwrap();
        let active = state.active_profile().unwrap();
        assert_eq!(active.id, DEFAULT_PROFILE_ID);
        assert!(active.readonly);
        assert_eq!(active.load_order, vec!["alpha", "beta"]);
    }

    #[test]
    fn readonly_default_cannot_be_updated_or_deleted() {
        let (_dir, mut backend) = backend();
        let state = backend.profiles_state().unwrap();
        let default = state.active_profile().unwrap().clone();
        assert!(backend.update_profile(default).is_err());
        assert!(backend.delete_profile(DEFAULT_PROFILE_ID).is_err());
        assert!(backend.rename_profile(DEFAULT_PROFILE_ID, "Mine").is_err());
    }

    #[test]
    fn create_update_activate_and_rollback() {
        let (_dir, mut backend) = backend();
        let created = backend
            .create_profile("Copy", Some(DEFAULT_PROFILE_ID))
            .unwrap();
        assert_eq!(created.enabled_mods, vec!["alpha", "beta"]);
        backend.set_active_profile(&created.id).unwrap();

        let before = backend.apply_profile(&created.id).unwrap();
        assert!(before.warnings.is_empty(), "{:?}", before.warnings);

        let mut edited = created.clone();
        edited.enabled_mods.push("ghost".to_string());
        edited.load_order.retain(|id| id != "beta");
        backend.update_profile(edited).unwrap();

        let report = backend.apply_profile(&created.id).unwrap();
        assert_eq!(
            report.warnings,
            vec![
                "beta: enabled but missing from the load order.",
                "ghost: enabled but not installed.",
            ]
        );

        let restored = backend.rollback(Some(&before.snapshot_id)).unwrap();
        assert_eq!(restored, before.snapshot_id);
        let state = backend.profiles_state().unwrap();
        assert_eq!(state.active_profile().unwrap().load_order, vec!["alpha", "beta"]);
        assert_eq!(backend.list_snapshots().unwrap().len(), 2);
    }

    #[test]
    fn apply_records_last_applied_profile() {
        let (_dir, mut backend) = backend();
        assert_eq!(backend.last_applied().unwrap(), None);

        let first = backend.apply_profile(DEFAULT_PROFILE_ID).unwrap();
        let created = backend.create_profile("Lean", None).unwrap();
        let second = backend.apply_profile(&created.id).unwrap();
        assert_ne!(first.snapshot_id, second.snapshot_id);

        assert_eq!(
            backend.last_applied().unwrap(),
            Some(AppliedRecord {
                profile_id: created.id,
                snapshot_id: second.snapshot_id,
            })
        );
    }

    #[test]
    fn rollback_without_snapshots_fails() {
        let (_dir, mut backend) = backend();
        assert!(backend.rollback(None).is_err());
    }
}
