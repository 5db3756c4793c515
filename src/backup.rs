use crate::library::{ModEntry, Profile, ProfilesState};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const SNAPSHOT_PREFIX: &str = "snapshot-";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub id: String,
    pub timestamp: u64,
    /// Position among snapshots taken in the same second.
    #[serde(default)]
    pub sequence: u32,
    pub created: String,
    pub profile_id: String,
    pub profile_name: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LastSnapshot {
    id: String,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRecord<'a> {
    id: &'a str,
    name: &'a str,
    path: &'a Path,
    enabled: bool,
}

pub fn snapshot_root(data_dir: &Path) -> PathBuf {
    data_dir.join("backups")
}

pub fn create_snapshot(
    data_dir: &Path,
    state: &ProfilesState,
    catalog: &[ModEntry],
    profile: &Profile,
    reason: Option<&str>,
) -> Result<SnapshotMeta> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let root = snapshot_root(data_dir);
    fs::create_dir_all(&root).context("create backups dir")?;

    let mut id = format!("{SNAPSHOT_PREFIX}{stamp}");
    let mut sequence = 0;
    while root.join(&id).exists() {
        sequence += 1;
        id = format!("{SNAPSHOT_PREFIX}{stamp}-{sequence}");
    }
    let dir = root.join(&id);
    fs::create_dir_all(&dir).context("create snapshot dir")?;

    let state_json = serde_json::to_string_pretty(state).context("serialize profiles")?;
    fs::write(dir.join("profiles.json"), state_json).context("write profiles snapshot")?;

    let records: Vec<CatalogRecord<'_>> = catalog
        .iter()
        .map(|mod_entry| CatalogRecord {
            id: &mod_entry.id,
            name: &mod_entry.name,
            path: &mod_entry.path,
            enabled: profile.is_enabled(&mod_entry.id),
        })
        .collect();
    let catalog_json = serde_json::to_string_pretty(&records).context("serialize catalog")?;
    fs::write(dir.join("catalog.json"), catalog_json).context("write catalog snapshot")?;

    let created = i64::try_from(stamp)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_default();
    let meta = SnapshotMeta {
        id: id.clone(),
        timestamp: stamp,
        sequence,
        created,
        profile_id: profile.id.clone(),
        profile_name: profile.name.clone(),
        reason: reason.map(|value| value.to_string()),
    };
    let meta_json = serde_json::to_string_pretty(&meta).context("serialize snapshot meta")?;
    fs::write(dir.join("meta.json"), meta_json).context("write snapshot meta")?;

    let last = LastSnapshot {
        id,
        timestamp: stamp,
    };
    let last_json = serde_json::to_string_pretty(&last).context("serialize last snapshot")?;
    fs::write(root.join("last.json"), last_json).context("write last snapshot")?;

    Ok(meta)
}

pub fn load_last_snapshot(data_dir: &Path) -> Result<Option<String>> {
    let path = snapshot_root(data_dir).join("last.json");
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).context("read last snapshot")?;
    let last: LastSnapshot = serde_json::from_str(&raw).context("parse last snapshot")?;
    if snapshot_root(data_dir).join(&last.id).exists() {
        Ok(Some(last.id))
    } else {
        Ok(None)
    }
}

pub fn load_snapshot_state(data_dir: &Path, id: &str) -> Result<ProfilesState> {
    if !id.starts_with(SNAPSHOT_PREFIX) || id.contains(['/', '\\']) || id.contains("..") {
        bail!("invalid snapshot id: {id}");
    }
    let path = snapshot_root(data_dir).join(id).join("profiles.json");
    let raw = fs::read_to_string(&path).with_context(|| format!("read snapshot {id}"))?;
    let state = serde_json::from_str(&raw).with_context(|| format!("parse snapshot {id}"))?;
    Ok(state)
}

/// Newest first. Unreadable snapshot folders are skipped.
pub fn list_snapshots(data_dir: &Path) -> Result<Vec<SnapshotMeta>> {
    let root = snapshot_root(data_dir);
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut snapshots = Vec::new();
    for entry in fs::read_dir(&root).context("read backups dir")? {
        let Ok(entry) = entry else {
            continue;
        };
        let meta_path = entry.path().join("meta.json");
        let Ok(raw) = fs::read_to_string(&meta_path) else {
            continue;
        };
        if let Ok(meta) = serde_json::from_str::<SnapshotMeta>(&raw) {
            snapshots.push(meta);
        }
    }
    snapshots.sort_by(|a, b| (b.timestamp, b.sequence).cmp(&(a.timestamp, a.sequence)));
    Ok(snapshots)
}
