use std::{
    env::current_exe,
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow};
use directories::ProjectDirs;

struct BaseLocations();
impl BaseLocations {
    fn proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(
            "net",
            "crystaldrift",
            current_exe()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "quejas".to_owned())
                .as_ref(),
        )
    }
}

trait DataPath {
    fn get_root_path() -> Result<PathBuf>;

    /// Get a subdir under the root, creating as necessary.
    fn get_or_create_subdir<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
        let root_path = Self::get_root_path()?;
        let full_path = subpath
            .map(|p| root_path.to_owned().join(p))
            .unwrap_or(root_path);
        std::fs::create_dir_all(&full_path)?;
        Ok(full_path)
    }
}

pub(crate) struct AppData();
impl DataPath for AppData {
    fn get_root_path() -> Result<PathBuf> {
        Ok(BaseLocations::proj_dirs()
            .map(|d| d.data_dir().to_owned())
            .ok_or(anyhow!("Unable to determine app data dir!"))?)
    }
}
impl AppData {
    /// Get or create a path under the app data directory.
    pub(crate) fn get_data_path<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
        Self::get_or_create_subdir(subpath)
    }
}
