use crate::library::ModLocation;
use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const GAME_NAME: &str = "Hytale";
const USER_DATA_DIR: &str = "UserData";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallPaths {
    pub root: PathBuf,
    pub mods_dir: PathBuf,
    pub packs_dir: PathBuf,
    pub early_plugins_dir: PathBuf,
}

impl InstallPaths {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            mods_dir: root.join(ModLocation::Mods.dir_name()),
            packs_dir: root.join(ModLocation::Packs.dir_name()),
            early_plugins_dir: root.join(ModLocation::EarlyPlugins.dir_name()),
        }
    }

    pub fn dir_for(&self, location: ModLocation) -> &Path {
        match location {
            ModLocation::Mods => &self.mods_dir,
            ModLocation::Packs => &self.packs_dir,
            ModLocation::EarlyPlugins => &self.early_plugins_dir,
        }
    }
}

pub fn detect_paths(root_override: Option<&Path>) -> Result<InstallPaths> {
    let root = match root_override {
        Some(path) => path.to_path_buf(),
        None => find_install_root().context("locate Hytale install")?,
    };

    if !looks_like_install_root(&root) {
        bail!(
            "invalid install root: expected mods/, packs/ or earlyplugins/ in {}",
            root.display()
        );
    }

    Ok(InstallPaths::from_root(&root))
}

pub fn looks_like_install_root(path: &Path) -> bool {
    ModLocation::ALL
        .iter()
        .any(|location| path.join(location.dir_name()).is_dir())
}

fn find_install_root() -> Option<PathBuf> {
    candidate_roots()
        .into_iter()
        .find(|candidate| looks_like_install_root(candidate))
}

fn candidate_roots() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let Some(base) = BaseDirs::new() else {
        return candidates;
    };

    candidates.push(base.data_dir().join(GAME_NAME).join(USER_DATA_DIR));
    candidates.push(base.data_local_dir().join(GAME_NAME).join(USER_DATA_DIR));

    let home = base.home_dir();
    for steam in [".local/share/Steam", ".steam/steam"] {
        candidates.push(
            home.join(steam)
                .join("steamapps/common")
                .join(GAME_NAME)
                .join(USER_DATA_DIR),
        );
    }
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn install_root_needs_a_mod_bucket() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!looks_like_install_root(dir.path()));
        assert!(detect_paths(Some(dir.path())).is_err());

        fs::create_dir(dir.path().join("earlyplugins")).unwrap();
        let paths = detect_paths(Some(dir.path())).unwrap();
        assert_eq!(paths.early_plugins_dir, dir.path().join("earlyplugins"));
        assert_eq!(paths.dir_for(ModLocation::Packs), dir.path().join("packs"));
    }
}
