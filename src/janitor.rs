use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Outcome of one directory sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.removed.extend(other.removed);
        self.kept += other.kept;
        self.failed += other.failed;
    }
}

/// Removes request artifacts. Errors are logged here and never returned.
#[derive(Debug, Clone)]
pub struct FileJanitor {
    placeholder_names: Vec<String>,
}

impl Default for FileJanitor {
    fn default() -> Self {
        Self::new(vec![".gitkeep".to_string()])
    }
}

impl FileJanitor {
    pub fn new(placeholder_names: Vec<String>) -> Self {
        Self { placeholder_names }
    }

    /// Delete a file. Returns true only if this call removed it.
    pub fn remove_file<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Cleaned up file: {}", path.display());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                error!("Error cleaning up file {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Delete regular files in `directory` created before `now - retention`.
    ///
    /// Not recursive. Placeholder entries are never removed.
    pub fn sweep<P: AsRef<Path>>(&self, directory: P, retention: Duration, now: SystemTime) -> SweepReport {
        let directory = directory.as_ref();
        let mut report = SweepReport::default();

        let Some(cutoff) = now.checked_sub(retention) else {
            return report;
        };

        if !directory.is_dir() {
            warn!("Cleanup skipped, not a directory: {}", directory.display());
            return report;
        }

        for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!("Error reading {}: {}", directory.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy();
            if self.placeholder_names.iter().any(|p| p.as_str() == &*name) || !entry.file_type().is_file() {
                report.kept += 1;
                continue;
            }

            let created = match entry.metadata() {
                Ok(metadata) => created_at(&metadata),
                Err(e) => {
                    error!("Error reading metadata of {}: {}", entry.path().display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            match created {
                Some(created) if created < cutoff => {
                    if self.remove_file(entry.path()) {
                        report.removed.push(entry.path().to_path_buf());
                    } else {
                        report.failed += 1;
                    }
                }
                Some(_) => report.kept += 1,
                None => {
                    debug!("No timestamp for {}, keeping it", entry.path().display());
                    report.kept += 1;
                }
            }
        }

        report
    }
}

/// Birth time where the platform records it, otherwise last modification
fn created_at(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().or_else(|_| metadata.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_remove_missing_file_returns_false() {
        let temp = assert_fs::TempDir::new().unwrap();
        let janitor = FileJanitor::default();

        assert!(!janitor.remove_file(temp.child("never-existed.mp4").path()));
    }

    #[test]
    fn test_remove_file_is_idempotent() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("video.mp4");
        file.write_binary(b"mp4").unwrap();
        let janitor = FileJanitor::default();

        assert!(janitor.remove_file(file.path()));
        assert!(!janitor.remove_file(file.path()));
        assert!(!file.path().exists());
    }

    #[test]
    fn test_remove_directory_is_swallowed() {
        let temp = assert_fs::TempDir::new().unwrap();
        let dir = temp.child("nested");
        dir.create_dir_all().unwrap();

        assert!(!FileJanitor::default().remove_file(dir.path()));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_sweep_removes_stale_files_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a_cover.jpg").touch().unwrap();
        temp.child("b_video.mp4").touch().unwrap();
        temp.child(".gitkeep").touch().unwrap();
        temp.child("subdir").create_dir_all().unwrap();
        let janitor = FileJanitor::default();

        // Everything was created just now: nothing is older than an hour.
        let report = janitor.sweep(temp.path(), HOUR, SystemTime::now());
        assert!(report.removed.is_empty());
        assert_eq!(report.kept, 4);

        // Two hours from now both files are stale.
        let later = SystemTime::now() + 2 * HOUR;
        let report = janitor.sweep(temp.path(), HOUR, later);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.failed, 0);
        assert!(!temp.child("a_cover.jpg").path().exists());
        assert!(!temp.child("b_video.mp4").path().exists());
        assert!(temp.child(".gitkeep").path().exists());
        assert!(temp.child("subdir").path().is_dir());
    }

    #[test]
    fn test_placeholders_survive_any_age() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitkeep").touch().unwrap();
        temp.child("README").touch().unwrap();
        let janitor = FileJanitor::new(vec![".gitkeep".to_string(), "README".to_string()]);

        let far_future = SystemTime::now() + Duration::from_secs(365 * 24 * 3600);
        let report = janitor.sweep(temp.path(), Duration::ZERO, far_future);

        assert!(report.removed.is_empty());
        assert!(temp.child(".gitkeep").path().exists());
        assert!(temp.child("README").path().exists());
    }

    #[test]
    fn test_sweep_missing_directory_is_empty() {
        let temp = assert_fs::TempDir::new().unwrap();
        let report = FileJanitor::default().sweep(temp.child("gone").path(), HOUR, SystemTime::now());
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_report_merge() {
        let mut total = SweepReport { removed: vec![PathBuf::from("a")], kept: 1, failed: 0 };
        total.merge(SweepReport { removed: vec![PathBuf::from("b")], kept: 2, failed: 1 });
        assert_eq!(total.removed.len(), 2);
        assert_eq!(total.kept, 3);
        assert_eq!(total.failed, 1);
    }
}
