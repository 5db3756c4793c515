use crate::library::ModFormat;
use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

pub const MANIFEST_NAME: &str = "manifest.json";
const MANIFEST_SEARCH_DEPTH: usize = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModManifest {
    pub group: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub main: Option<String>,
    pub dependencies: Vec<String>,
    pub optional_dependencies: Vec<String>,
}

impl ModManifest {
    /// `Group:Name` when both are declared, otherwise just the name.
    pub fn mod_id(&self) -> Option<String> {
        match (self.group.as_deref(), self.name.as_deref()) {
            (Some(group), Some(name)) => Some(format!("{group}:{name}")),
            (None, Some(name)) => Some(name.to_string()),
            _ => None,
        }
    }

    pub fn has_entrypoint(&self) -> bool {
        self.main.is_some()
    }
}

pub fn parse_manifest(bytes: &[u8]) -> Result<ModManifest> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let value: Value = serde_json::from_slice(bytes).context("parse manifest.json")?;
    let obj = value
        .as_object()
        .context("manifest.json is not a JSON object")?;

    Ok(ModManifest {
        group: text_field(obj.get("Group")),
        name: text_field(obj.get("Name")),
        version: text_field(obj.get("Version")),
        description: text_field(obj.get("Description")),
        main: text_field(obj.get("Main")),
        dependencies: dependency_list(obj.get("Dependencies")),
        optional_dependencies: dependency_list(obj.get("OptionalDependencies")),
    })
}

/// Reads the manifest of a mod on disk. `Ok(None)` means the mod ships
/// without one.
pub fn read_manifest(path: &Path, format: ModFormat) -> Result<Option<ModManifest>> {
    match format {
        ModFormat::Directory => {
            let Some(manifest_path) = find_manifest(path) else {
                return Ok(None);
            };
            let bytes = fs::read(&manifest_path)
                .with_context(|| format!("read {}", manifest_path.display()))?;
            parse_manifest(&bytes).map(Some)
        }
        ModFormat::Zip | ModFormat::Jar => read_manifest_from_archive(path),
    }
}

fn read_manifest_from_archive(path: &Path) -> Result<Option<ModManifest>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("read archive")?;

    let mut candidates: Vec<(usize, String)> = archive
        .file_names()
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            lower == MANIFEST_NAME || lower.ends_with("/manifest.json")
        })
        .map(|name| (name.matches('/').count(), name.to_string()))
        .filter(|(depth, _)| *depth < MANIFEST_SEARCH_DEPTH)
        .collect();
    candidates.sort();
    let Some((_, name)) = candidates.into_iter().next() else {
        return Ok(None);
    };

    let mut entry = archive.by_name(&name).context("open manifest entry")?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .context("read manifest entry")?;
    parse_manifest(&bytes).map(Some)
}

fn find_manifest(root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).max_depth(MANIFEST_SEARCH_DEPTH) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry
            .file_name()
            .to_string_lossy()
            .eq_ignore_ascii_case(MANIFEST_NAME)
        {
            continue;
        }
        candidates.push((entry.depth(), entry.path().to_path_buf()));
    }
    candidates.sort();
    candidates.into_iter().next().map(|(_, path)| path)
}

fn text_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Object form keys on the dependency (`{"Group:Name": "*"}`); array form lists them.
fn dependency_list(value: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = match value {
        Some(Value::Object(map)) => map.keys().map(|key| key.trim().to_string()).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Value::String(single)) => vec![single.trim().to_string()],
        _ => Vec::new(),
    };
    out.retain(|dep| !dep.is_empty());
    out
}
