use crate::{
    game::InstallPaths,
    library::{ModEntry, ModFormat, ModLocation, ModType},
    metadata::{self, ModManifest},
};
use anyhow::{Context, Result};
use std::{collections::HashSet, fs, path::Path};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct CatalogScan {
    pub mods: Vec<ModEntry>,
    pub warnings: Vec<String>,
}

impl CatalogScan {
    pub fn mod_ids(&self) -> Vec<String> {
        self.mods.iter().map(|mod_entry| mod_entry.id.clone()).collect()
    }
}

/// Walks the mods, packs and earlyplugins buckets in that order, entries
/// sorted by file name. Missing buckets are skipped.
pub fn scan_catalog(paths: &InstallPaths) -> Result<CatalogScan> {
    let mut scan = CatalogScan::default();
    let mut seen_ids = HashSet::new();

    for location in ModLocation::ALL {
        let dir = paths.dir_for(location);
        if !dir.is_dir() {
            continue;
        }
        let mut entries: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("read {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in entries {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            if file_name.starts_with('.') {
                continue;
            }
            let Some(format) = ModFormat::from_path(&path) else {
                debug!(path = %path.display(), "skipping non-mod file");
                scan.warnings.push(format!(
                    "Skipped {file_name} in {}: not a zip, jar or folder.",
                    location.label()
                ));
                continue;
            };

            let manifest = match metadata::read_manifest(&path, format) {
                Ok(manifest) => manifest,
                Err(err) => {
                    warn!(path = %path.display(), "unreadable manifest: {err:#}");
                    scan.warnings
                        .push(format!("{file_name}: unreadable manifest ({err:#})."));
                    None
                }
            };

            let mut mod_entry = build_entry(&path, format, location, manifest.as_ref());
            if !seen_ids.insert(mod_entry.id.to_lowercase()) {
                let fallback = format!("{}/{}", location.dir_name(), file_name);
                scan.warnings.push(format!(
                    "Duplicate mod id {}: {file_name} is listed as {fallback}.",
                    mod_entry.id
                ));
                mod_entry.id = fallback;
                seen_ids.insert(mod_entry.id.to_lowercase());
            }
            scan.mods.push(mod_entry);
        }
    }

    Ok(scan)
}

fn build_entry(
    path: &Path,
    format: ModFormat,
    location: ModLocation,
    manifest: Option<&ModManifest>,
) -> ModEntry {
    let stem = match format {
        ModFormat::Directory => path.file_name(),
        ModFormat::Zip | ModFormat::Jar => path.file_stem(),
    }
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_default();

    let id = manifest.and_then(ModManifest::mod_id).unwrap_or_else(|| stem.clone());
    let name = manifest
        .and_then(|manifest| manifest.name.clone())
        .unwrap_or(stem);

    ModEntry {
        id,
        name,
        mod_type: classify(format, location, manifest),
        format,
        location,
        path: path.to_path_buf(),
        version: manifest.and_then(|manifest| manifest.version.clone()),
        description: manifest.and_then(|manifest| manifest.description.clone()),
        dependencies: manifest
            .map(|manifest| manifest.dependencies.clone())
            .unwrap_or_default(),
        optional_dependencies: manifest
            .map(|manifest| manifest.optional_dependencies.clone())
            .unwrap_or_default(),
        enabled: false,
    }
}

fn classify(format: ModFormat, location: ModLocation, manifest: Option<&ModManifest>) -> ModType {
    match location {
        ModLocation::EarlyPlugins => ModType::EarlyPlugin,
        ModLocation::Packs => ModType::Pack,
        ModLocation::Mods => {
            let has_main = manifest.map(ModManifest::has_entrypoint).unwrap_or(false);
            if format == ModFormat::Jar || has_main {
                ModType::Plugin
            } else {
                ModType::Pack
            }
        }
    }
}

/// Marks catalog entries enabled according to the given id set.
pub fn mark_enabled(mods: &mut [ModEntry], enabled: &HashSet<String>) {
    for mod_entry in mods {
        mod_entry.enabled = enabled.contains(&mod_entry.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jar(path: &Path, manifest: &str) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("manifest.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(manifest.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    fn install() -> (tempfile::TempDir, InstallPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::from_root(dir.path());
        for location in ModLocation::ALL {
            fs::create_dir_all(paths.dir_for(location)).unwrap();
        }
        (dir, paths)
    }

    #[test]
    fn scans_all_buckets_in_order() {
        let (_dir, paths) = install();
        write_jar(
            &paths.mods_dir.join("teleporters.jar"),
            r#"{"Group": "Acme", "Name": "Teleporters", "Dependencies": {"Acme:Core": "*"}}"#,
        );
        let folder = paths.mods_dir.join("biomes");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("manifest.json"), r#"{"Name": "Biomes"}"#).unwrap();
        write_jar(&paths.packs_dir.join("furniture.zip"), r#"{"Name": "Furniture"}"#);
        write_jar(&paths.early_plugins_dir.join("boot.jar"), r#"{"Name": "Boot"}"#);

        let scan = scan_catalog(&paths).unwrap();
        assert!(scan.warnings.is_empty(), "{:?}", scan.warnings);
        let ids = scan.mod_ids();
        assert_eq!(ids, vec!["Biomes", "Acme:Teleporters", "Furniture", "Boot"]);

        let types: Vec<ModType> = scan.mods.iter().map(|m| m.mod_type).collect();
        assert_eq!(
            types,
            vec![
                ModType::Pack,
                ModType::Plugin,
                ModType::Pack,
                ModType::EarlyPlugin
            ]
        );
        assert_eq!(scan.mods[1].dependencies, vec!["Acme:Core"]);
        assert_eq!(scan.mods[0].format, ModFormat::Directory);
    }

    #[test]
    fn bad_entries_become_warnings() {
        let (_dir, paths) = install();
        fs::write(paths.mods_dir.join("notes.txt"), "hi").unwrap();
        fs::write(paths.mods_dir.join(".hidden"), "hi").unwrap();
        fs::write(paths.mods_dir.join("broken.jar"), "not a zip").unwrap();
        write_jar(&paths.packs_dir.join("a.zip"), r#"{"Name": "Same"}"#);
        write_jar(&paths.packs_dir.join("b.zip"), r#"{"Name": "same"}"#);

        let scan = scan_catalog(&paths).unwrap();
        let ids = scan.mod_ids();
        assert_eq!(ids, vec!["broken", "Same", "packs/b.zip"]);
        assert_eq!(scan.warnings.len(), 3, "{:?}", scan.warnings);
        assert!(scan.warnings[0].starts_with("broken.jar: unreadable manifest"));
        assert!(scan.warnings[1].starts_with("Skipped notes.txt in Mods"));
        assert!(scan.warnings[2].starts_with("Duplicate mod id same"));
    }

    #[test]
    fn missing_buckets_are_fine() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::from_root(dir.path());
        let scan = scan_catalog(&paths).unwrap();
        assert!(scan.mods.is_empty());
    }
}
