use crate::{
    backend::{ApplyReport, ModBackend},
    backup::SnapshotMeta,
    config::AppConfig,
    consistency::{self, DependencyLookup, LoadOrderRow, ModCounts},
    library::{ModEntry, MoveDirection, Profile, ProfileError, ProfilesState},
    scanner,
};
use anyhow::Context;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, info, warn};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not load mods and profiles: {0}")]
    Fetch(String),
    #[error("could not save profile: {0}")]
    Update(String),
    #[error("profile \"{0}\" is read-only")]
    ProfileReadonly(String),
    #[error("no active profile")]
    NoActiveProfile,
    #[error("profile not found: {0}")]
    UnknownProfile(String),
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error("{action} failed: {message}")]
    Action {
        action: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDependency {
    pub label: String,
    pub required_by: Vec<String>,
}

/// Session state for one scan cycle: the catalog and profiles fetched
/// together, plus everything derived from them.
pub struct App<B: ModBackend> {
    backend: B,
    config: AppConfig,
    catalog: Vec<ModEntry>,
    scan_warnings: Vec<String>,
    profiles: Option<ProfilesState>,
    pub status: String,
    logs: Vec<LogEntry>,
    log_path: Option<PathBuf>,
}

impl<B: ModBackend> App<B> {
    pub fn new(backend: B, config: AppConfig, log_path: Option<PathBuf>) -> Self {
        Self {
            backend,
            config,
            catalog: Vec::new(),
            scan_warnings: Vec::new(),
            profiles: None,
            status: String::new(),
            logs: Vec::new(),
            log_path,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn catalog(&self) -> &[ModEntry] {
        &self.catalog
    }

    pub fn profiles_state(&self) -> Option<&ProfilesState> {
        self.profiles.as_ref()
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.profiles.as_ref().and_then(ProfilesState::active_profile)
    }

    /// Re-fetches catalog and profiles. Nothing is replaced unless both
    /// fetches succeed.
    pub fn refresh(&mut self) -> Result<(), AppError> {
        let scan = match self.backend.scan_catalog() {
            Ok(scan) => scan,
            Err(err) => return Err(self.fail(AppError::Fetch(format!("{err:#}")))),
        };
        let profiles = match self.backend.profiles_state() {
            Ok(profiles) => profiles,
            Err(err) => return Err(self.fail(AppError::Fetch(format!("{err:#}")))),
        };

        self.catalog = scan.mods;
        self.scan_warnings = scan.warnings;
        self.profiles = Some(profiles);
        self.sync_enabled_flags();

        let counts = self.counts();
        self.status = format!(
            "{} mod(s): {} pack(s), {} plugin(s), {} early plugin(s)",
            counts.total, counts.packs, counts.plugins, counts.early
        );
        info!(mods = counts.total, warnings = self.scan_warnings.len(), "catalog refreshed");
        Ok(())
    }

    pub fn counts(&self) -> ModCounts {
        consistency::compute_counts(&self.catalog)
    }

    /// General scan warnings, independent of the active profile.
    pub fn warnings(&self) -> &[String] {
        &self.scan_warnings
    }

    pub fn profile_warnings(&self) -> Vec<String> {
        if !self.config.warn_missing_dependencies {
            return Vec::new();
        }
        consistency::dependency_warnings(&self.catalog, self.active_profile())
    }

    pub fn load_order_entries(&self) -> Vec<LoadOrderRow> {
        consistency::load_order_rows(&self.catalog, self.active_profile())
    }

    pub fn enabled_mod_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = consistency::enabled_set(self.active_profile())
            .into_iter()
            .collect();
        ids.sort();
        ids
    }

    /// Unresolved dependency labels across enabled mods, with the names of
    /// the mods asking for them.
    pub fn missing_dependencies(&self) -> Vec<MissingDependency> {
        let enabled = consistency::enabled_set(self.active_profile());
        let lookup = DependencyLookup::new(&self.catalog);
        let mut missing: BTreeMap<String, (String, BTreeSet<String>)> = BTreeMap::new();
        for mod_entry in self.catalog.iter().filter(|m| enabled.contains(&m.id)) {
            for dependency in &mod_entry.dependencies {
                let label = dependency.trim();
                if label.is_empty() || lookup.resolve(label).is_some() {
                    continue;
                }
                missing
                    .entry(label.to_lowercase())
                    .or_insert_with(|| (label.to_string(), BTreeSet::new()))
                    .1
                    .insert(mod_entry.name.clone());
            }
        }
        missing
            .into_values()
            .map(|(label, required_by)| MissingDependency {
                label,
                required_by: required_by.into_iter().collect(),
            })
            .collect()
    }

    pub fn handle_toggle_mod(&mut self, mod_id: &str, enable: bool) -> Result<Profile, AppError> {
        let profile = self.require_active_profile()?.clone();
        let next = match profile.toggle_mod(mod_id, enable) {
            Ok(next) => next,
            Err(err) => return Err(self.fail(profile_error(err))),
        };
        if next == profile {
            self.status = format!("{mod_id} already {}", enabled_word(enable));
            return Ok(profile);
        }
        let saved = self.handle_update_profile(next)?;
        self.log_info(format!("{} {mod_id}", capitalize(enabled_word(enable))));
        Ok(saved)
    }

    pub fn handle_move_load_order(
        &mut self,
        mod_id: &str,
        direction: MoveDirection,
    ) -> Result<Profile, AppError> {
        let profile = self.require_active_profile()?.clone();
        if profile.readonly {
            return Err(self.fail(AppError::ProfileReadonly(profile.name)));
        }
        let order = profile.move_load_order(mod_id, direction);
        if order == profile.load_order {
            self.status = format!("{mod_id} cannot move {direction}");
            return Ok(profile);
        }
        let mut next = profile;
        next.load_order = order;
        let saved = self.handle_update_profile(next)?;
        self.status = format!("Moved {mod_id} {direction}");
        Ok(saved)
    }

    /// Persists a whole profile. The cached copy changes only once the
    /// backend accepts it.
    pub fn handle_update_profile(&mut self, profile: Profile) -> Result<Profile, AppError> {
        let readonly = self
            .profiles
            .as_ref()
            .and_then(|state| state.find(&profile.id))
            .map(|stored| stored.readonly)
            .unwrap_or(false);
        if readonly || profile.readonly {
            return Err(self.fail(AppError::ProfileReadonly(profile.name)));
        }

        let saved = match self.backend.update_profile(profile) {
            Ok(saved) => saved,
            Err(err) => return Err(self.fail(AppError::Update(format!("{err:#}")))),
        };
        if let Some(state) = self.profiles.as_mut() {
            match state.profiles.iter_mut().find(|p| p.id == saved.id) {
                Some(slot) => *slot = saved.clone(),
                None => state.profiles.push(saved.clone()),
            }
        }
        self.sync_enabled_flags();
        self.status = format!("Saved profile {}", saved.name);
        Ok(saved)
    }

    pub fn create_profile(&mut self, name: &str, copy_from: Option<&str>) -> Result<Profile, AppError> {
        let created = match self.backend.create_profile(name, copy_from) {
            Ok(created) => created,
            Err(err) => return Err(self.fail(action_error("create profile", err))),
        };
        self.reload_profiles()?;
        self.log_info(format!("Created profile {}", created.name));
        Ok(created)
    }

    pub fn rename_profile(&mut self, id: &str, name: &str) -> Result<Profile, AppError> {
        self.ensure_mutable(id)?;
        let renamed = match self.backend.rename_profile(id, name) {
            Ok(renamed) => renamed,
            Err(err) => return Err(self.fail(action_error("rename profile", err))),
        };
        self.reload_profiles()?;
        self.log_info(format!("Renamed profile to {}", renamed.name));
        Ok(renamed)
    }

    pub fn delete_profile(&mut self, id: &str) -> Result<(), AppError> {
        self.ensure_mutable(id)?;
        if let Err(err) = self.backend.delete_profile(id) {
            return Err(self.fail(action_error("delete profile", err)));
        }
        self.reload_profiles()?;
        self.log_info(format!("Deleted profile {id}"));
        Ok(())
    }

    pub fn use_profile(&mut self, id: &str) -> Result<(), AppError> {
        if self.find_profile(id).is_none() {
            return Err(self.fail(AppError::UnknownProfile(id.to_string())));
        }
        if let Err(err) = self.backend.set_active_profile(id) {
            return Err(self.fail(action_error("switch profile", err)));
        }
        self.reload_profiles()?;
        let name = self
            .active_profile()
            .map(|profile| profile.name.clone())
            .unwrap_or_else(|| id.to_string());
        self.log_info(format!("Active profile: {name}"));
        Ok(())
    }

    pub fn apply(&mut self) -> Result<ApplyReport, AppError> {
        let id = self.require_active_profile()?.id.clone();
        let report = match self.backend.apply_profile(&id) {
            Ok(report) => report,
            Err(err) => return Err(self.fail(action_error("apply", err))),
        };
        for warning in &report.warnings {
            self.log_warn(warning.clone());
        }
        self.log_info(format!("Applied profile, snapshot {}", report.snapshot_id));
        Ok(report)
    }

    pub fn rollback(&mut self, snapshot_id: Option<&str>) -> Result<String, AppError> {
        let restored = match self.backend.rollback(snapshot_id) {
            Ok(restored) => restored,
            Err(err) => return Err(self.fail(action_error("rollback", err))),
        };
        self.reload_profiles()?;
        self.log_info(format!("Rolled back to {restored}"));
        Ok(restored)
    }

    pub fn snapshots(&mut self) -> Result<Vec<SnapshotMeta>, AppError> {
        match self.backend.list_snapshots() {
            Ok(snapshots) => Ok(snapshots),
            Err(err) => Err(self.fail(action_error("list snapshots", err))),
        }
    }

    /// The profile's load order as a plain list of names.
    pub fn export_mod_list(&mut self, id: &str) -> Result<String, AppError> {
        let Some(profile) = self.find_profile(id).cloned() else {
            return Err(self.fail(AppError::UnknownProfile(id.to_string())));
        };
        let mut out = format!("# {}\n", profile.name);
        for row in consistency::load_order_rows(&self.catalog, Some(&profile)) {
            let marker = if profile.is_enabled(&row.id) { "" } else { " # disabled" };
            if row.missing {
                out.push_str(&format!("{} # missing{marker}\n", row.name));
            } else {
                out.push_str(&format!("{}{marker}\n", row.name));
            }
        }
        Ok(out)
    }

    pub fn find_profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.as_ref().and_then(|state| state.find(id))
    }

    pub fn log_info(&mut self, message: String) {
        info!("{message}");
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        warn!("{message}");
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        error!("{message}");
        self.push_log(LogLevel::Error, message);
    }

    /// Last `lines` log lines, from the log file when there is one.
    pub fn log_tail_text(&self, lines: usize) -> anyhow::Result<String> {
        if lines == 0 {
            return Ok(String::new());
        }
        let raw = match &self.log_path {
            Some(path) if path.exists() => fs::read_to_string(path).context("read log file")?,
            _ => self.log_text_from_entries(),
        };
        let entries: Vec<&str> = raw.lines().collect();
        let start = entries.len().saturating_sub(lines);
        Ok(entries[start..].join("\n"))
    }

    fn log_text_from_entries(&self) -> String {
        self.logs
            .iter()
            .map(|entry| format!("[{}] {}", log_level_label(entry.level), entry.message))
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        self.status = message.clone();
        self.logs.push(LogEntry {
            level,
            message: message.clone(),
        });
        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
        }
        if let Some(path) = &self.log_path {
            let _ = append_log_file(path, level, &message);
        }
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.log_error(err.to_string());
        err
    }

    fn require_active_profile(&mut self) -> Result<&Profile, AppError> {
        if self.active_profile().is_none() {
            return Err(self.fail(AppError::NoActiveProfile));
        }
        self.active_profile().ok_or(AppError::NoActiveProfile)
    }

    fn ensure_mutable(&mut self, id: &str) -> Result<(), AppError> {
        match self.find_profile(id).map(|p| (p.readonly, p.name.clone())) {
            Some((true, name)) => Err(self.fail(AppError::ProfileReadonly(name))),
            Some((false, _)) => Ok(()),
            None => Err(self.fail(AppError::UnknownProfile(id.to_string()))),
        }
    }

    fn reload_profiles(&mut self) -> Result<(), AppError> {
        match self.backend.profiles_state() {
            Ok(profiles) => {
                self.profiles = Some(profiles);
                self.sync_enabled_flags();
                Ok(())
            }
            Err(err) => Err(self.fail(AppError::Fetch(format!("{err:#}")))),
        }
    }

    fn sync_enabled_flags(&mut self) {
        let enabled = consistency::enabled_set(self.active_profile());
        scanner::mark_enabled(&mut self.catalog, &enabled);
    }
}

fn profile_error(err: ProfileError) -> AppError {
    match err {
        ProfileError::Readonly(name) => AppError::ProfileReadonly(name),
        ProfileError::NotFound(id) => AppError::UnknownProfile(id),
        other => AppError::InvalidProfile(other.to_string()),
    }
}

// Domain errors keep their own variant; anything else is reported by action.
fn action_error(action: &'static str, err: anyhow::Error) -> AppError {
    match err.downcast_ref::<ProfileError>() {
        Some(profile_err) => profile_error(profile_err.clone()),
        None => AppError::Action {
            action,
            message: format!("{err:#}"),
        },
    }
}

fn enabled_word(enable: bool) -> &'static str {
    if enable {
        "enabled"
    } else {
        "disabled"
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "[{label}] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        library::{ModFormat, ModLocation, ModType, DEFAULT_PROFILE_ID},
        scanner::CatalogScan,
    };
    use anyhow::{anyhow, bail, Result};

    #[derive(Default)]
    struct FakeBackend {
        mods: Vec<ModEntry>,
        scan_warnings: Vec<String>,
        state: ProfilesState,
        fail_scan: bool,
        fail_update: bool,
        update_calls: usize,
    }

    impl ModBackend for FakeBackend {
        fn scan_catalog(&mut self) -> Result<CatalogScan> {
            if self.fail_scan {
                bail!("disk on fire");
            }
            Ok(CatalogScan {
                mods: self.mods.clone(),
                warnings: self.scan_warnings.clone(),
            })
        }

        fn profiles_state(&mut self) -> Result<ProfilesState> {
            Ok(self.state.clone())
        }

        fn update_profile(&mut self, profile: Profile) -> Result<Profile> {
            self.update_calls += 1;
            if self.fail_update {
                bail!("write failed");
            }
            Ok(self.state.replace_profile(profile)?)
        }

        fn create_profile(&mut self, name: &str, _source_id: Option<&str>) -> Result<Profile> {
            Ok(self.state.create_profile(name, None)?)
        }

        fn rename_profile(&mut self, id: &str, name: &str) -> Result<Profile> {
            Ok(self.state.rename_profile(id, name)?)
        }

        fn delete_profile(&mut self, id: &str) -> Result<()> {
            self.state.delete_profile(id)?;
            Ok(())
        }

        fn set_active_profile(&mut self, id: &str) -> Result<()> {
            Ok(self.state.set_active(id)?)
        }

        fn apply_profile(&mut self, id: &str) -> Result<ApplyReport> {
            let profile = self.state.find(id).ok_or_else(|| anyhow!("missing"))?;
            Ok(ApplyReport {
                snapshot_id: "snapshot-1".to_string(),
                warnings: consistency::dependency_warnings(&self.mods, Some(profile)),
            })
        }

        fn rollback(&mut self, snapshot_id: Option<&str>) -> Result<String> {
            Ok(snapshot_id.unwrap_or("snapshot-1").to_string())
        }

        fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>> {
            Ok(Vec::new())
        }
    }

    fn entry(id: &str, name: &str, mod_type: ModType, deps: &[&str]) -> ModEntry {
        ModEntry {
            id: id.to_string(),
            name: name.to_string(),
            mod_type,
            format: ModFormat::Zip,
            location: ModLocation::Mods,
            path: PathBuf::from(id),
            version: None,
            description: None,
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            optional_dependencies: Vec::new(),
            enabled: false,
        }
    }

    fn user_profile(enabled: &[&str], order: &[&str]) -> Profile {
        Profile {
            id: "survival".to_string(),
            name: "Survival".to_string(),
            enabled_mods: enabled.iter().map(|s| s.to_string()).collect(),
            load_order: order.iter().map(|s| s.to_string()).collect(),
            readonly: false,
        }
    }

    fn app_with(profile: Profile) -> App<FakeBackend> {
        let mods = vec![
            entry("a", "Alpha", ModType::Plugin, &["Beta"]),
            entry("b", "Beta", ModType::Pack, &[]),
            entry("c", "Gamma", ModType::EarlyPlugin, &["Nowhere"]),
        ];
        let ids: Vec<String> = mods.iter().map(|m| m.id.clone()).collect();
        let state = ProfilesState {
            active_profile_id: Some(profile.id.clone()),
            profiles: vec![profile],
        }
        .with_default_profile(Profile::default_for_catalog(&ids));
        let backend = FakeBackend {
            mods,
            scan_warnings: vec!["Skipped notes.txt in Mods: not a zip, jar or folder.".into()],
            state,
            ..FakeBackend::default()
        };
        let mut app = App::new(backend, AppConfig::default(), None);
        app.refresh().unwrap();
        app
    }

    #[test]
    fn derived_views_follow_active_profile() {
        let app = app_with(user_profile(&["a", "b"], &["a", "b"]));
        assert_eq!(
            app.counts(),
            ModCounts {
                total: 3,
                packs: 1,
                plugins: 1,
                early: 1
            }
        );
        assert_eq!(app.warnings().len(), 1);
        assert_eq!(
            app.profile_warnings(),
            vec!["Alpha: Beta should load before this mod."]
        );
        assert_eq!(app.enabled_mod_ids(), vec!["a", "b"]);
        let rows = app.load_order_entries();
        assert_eq!(rows.len(), 2);
        assert!(app.catalog().iter().find(|m| m.id == "a").unwrap().enabled);
        assert!(!app.catalog().iter().find(|m| m.id == "c").unwrap().enabled);
    }

    #[test]
    fn dependency_warnings_can_be_switched_off() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        app.config.warn_missing_dependencies = false;
        assert!(app.profile_warnings().is_empty());
    }

    #[test]
    fn move_fixes_order_warning() {
        let mut app = app_with(user_profile(&["a", "b"], &["a", "b"]));
        let saved = app.handle_move_load_order("b", MoveDirection::Up).unwrap();
        assert_eq!(saved.load_order, vec!["b", "a"]);
        assert!(app.profile_warnings().is_empty());
        assert_eq!(app.backend().update_calls, 1);
    }

    #[test]
    fn boundary_move_does_not_call_backend() {
        let mut app = app_with(user_profile(&["a", "b"], &["a", "b"]));
        let unchanged = app.handle_move_load_order("a", MoveDirection::Up).unwrap();
        assert_eq!(unchanged.load_order, vec!["a", "b"]);
        assert_eq!(app.backend().update_calls, 0);
    }

    #[test]
    fn toggle_updates_enabled_set_and_order() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        assert_eq!(app.profile_warnings(), vec!["Alpha: dependency Beta is disabled."]);

        app.handle_toggle_mod("b", true).unwrap();
        assert_eq!(app.enabled_mod_ids(), vec!["a", "b"]);
        assert_eq!(
            app.profile_warnings(),
            vec!["Alpha: Beta should load before this mod."]
        );

        app.handle_toggle_mod("a", false).unwrap();
        assert_eq!(app.enabled_mod_ids(), vec!["b"]);
        assert!(app.profile_warnings().is_empty());
    }

    #[test]
    fn readonly_profile_is_rejected_before_backend() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        app.use_profile(DEFAULT_PROFILE_ID).unwrap();

        let err = app.handle_toggle_mod("a", false).unwrap_err();
        assert!(matches!(err, AppError::ProfileReadonly(_)));
        let err = app.handle_move_load_order("b", MoveDirection::Up).unwrap_err();
        assert!(matches!(err, AppError::ProfileReadonly(_)));
        let default = app.active_profile().unwrap().clone();
        let err = app.handle_update_profile(default).unwrap_err();
        assert!(matches!(err, AppError::ProfileReadonly(_)));
        assert!(matches!(
            app.delete_profile(DEFAULT_PROFILE_ID),
            Err(AppError::ProfileReadonly(_))
        ));
        assert_eq!(app.backend().update_calls, 0);
        assert_eq!(app.logs.last().unwrap().level, LogLevel::Error);
    }

    #[test]
    fn failed_update_leaves_cached_profile_alone() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        app.backend.fail_update = true;
        let err = app.handle_toggle_mod("b", true).unwrap_err();
        assert!(matches!(err, AppError::Update(_)));
        assert_eq!(app.enabled_mod_ids(), vec!["a"]);
        assert!(app.status.starts_with("could not save profile"));
    }

    #[test]
    fn failed_fetch_keeps_previous_scan() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        app.backend.fail_scan = true;
        app.backend.mods.clear();
        let err = app.refresh().unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
        assert_eq!(app.catalog().len(), 3);
    }

    #[test]
    fn missing_profile_degrades_to_empty() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        app.profiles.as_mut().unwrap().active_profile_id = Some("gone".to_string());
        assert!(app.profile_warnings().is_empty());
        assert!(app.load_order_entries().is_empty());
        assert!(app.enabled_mod_ids().is_empty());
        assert!(matches!(
            app.handle_toggle_mod("a", true),
            Err(AppError::NoActiveProfile)
        ));
    }

    #[test]
    fn missing_dependencies_are_grouped() {
        let app = app_with(user_profile(&["a", "c"], &["c", "a"]));
        assert_eq!(
            app.missing_dependencies(),
            vec![MissingDependency {
                label: "Nowhere".to_string(),
                required_by: vec!["Gamma".to_string()],
            }]
        );
    }

    #[test]
    fn export_marks_stale_and_disabled_rows() {
        let mut app = app_with(user_profile(&["a"], &["a", "gone", "b"]));
        let list = app.export_mod_list("survival").unwrap();
        assert_eq!(list, "# Survival\nAlpha\ngone # missing # disabled\nBeta # disabled\n");
        assert!(matches!(
            app.export_mod_list("nope"),
            Err(AppError::UnknownProfile(_))
        ));
    }

    #[test]
    fn apply_logs_profile_warnings() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        let report = app.apply().unwrap();
        assert_eq!(report.snapshot_id, "snapshot-1");
        assert_eq!(report.warnings, vec!["Alpha: dependency Beta is disabled."]);
        assert!(app.logs.iter().any(|entry| entry.level == LogLevel::Warn));
    }

    #[test]
    fn profile_crud_reloads_state() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        let created = app.create_profile("Creative", None).unwrap();
        assert!(app.find_profile(&created.id).is_some());
        app.rename_profile(&created.id, "Builder").unwrap();
        assert_eq!(app.find_profile(&created.id).unwrap().name, "Builder");
        app.use_profile(&created.id).unwrap();
        assert_eq!(app.active_profile().unwrap().id, created.id);
        app.delete_profile(&created.id).unwrap();
        assert!(app.find_profile(&created.id).is_none());
        assert!(app.active_profile().is_none());
        assert!(matches!(
            app.create_profile("survival", None),
            Err(AppError::InvalidProfile(_))
        ));
    }

    #[test]
    fn log_tail_reads_file_or_memory() {
        let mut app = app_with(user_profile(&["a"], &["a"]));
        app.log_info("one".to_string());
        app.log_warn("two".to_string());
        assert_eq!(app.log_tail_text(1).unwrap(), "[WARN] two");

        let dir = tempfile::tempdir().unwrap();
        app.log_path = Some(dir.path().join("hymn.log"));
        app.log_error("three".to_string());
        assert_eq!(app.log_tail_text(5).unwrap(), "[ERROR] three");
        assert_eq!(app.log_tail_text(0).unwrap(), "");
    }
}
