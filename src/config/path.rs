//! Module for searching for manufacturer profile files

use std::{
    fs::{self, DirEntry},
    path::PathBuf,
};

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/hidtouch";

/// Returns the base path for shipped profile data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("hidtouch") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    if let Some(dir) = data_dirs.into_iter().find(|dir| dir.exists()) {
        return dir;
    }

    log::debug!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of directories in load order to find manufacturer profiles.
/// Profiles loaded later replace earlier ones with the same name.
/// E.g. ["/usr/share/hidtouch/manufacturers", "/etc/hidtouch/manufacturers.d"]
pub fn get_manufacturers_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./rootfs/usr/share/hidtouch/manufacturers"),
        get_base_path().join("manufacturers"),
        PathBuf::from("/etc/hidtouch/manufacturers.d"),
    ]
}

/// Returns the file paths in the given directories that pass `filter`, sorted
/// by file name. Files with the same name are ordered by the position of
/// their directory in `paths`.
pub fn get_multidir_sorted_files<F>(paths: &[PathBuf], filter: F) -> Vec<PathBuf>
where
    F: Fn(&DirEntry) -> bool,
{
    let mut entries: Vec<(usize, DirEntry)> = Vec::new();
    for (priority, path) in paths.iter().enumerate() {
        log::trace!("Checking {path:?} for files");
        let files = match fs::read_dir(path) {
            Ok(files) => files,
            Err(e) => {
                log::debug!("Unable to read directory: {path:?}: {e}");
                continue;
            }
        };
        for entry in files.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && filter(&entry) {
                entries.push((priority, entry));
            }
        }
    }

    entries.sort_by(|(priority_a, a), (priority_b, b)| {
        a.file_name()
            .cmp(&b.file_name())
            .then(priority_a.cmp(priority_b))
    });
    log::trace!("Got sorted entries: {entries:?}");

    entries.into_iter().map(|(_, entry)| entry.path()).collect()
}
