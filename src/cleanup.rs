//! Removal of partially generated projects.
//!
//! Cleanup runs on paths that are already failing, so it never returns an
//! error: every problem is logged and the caller is told what was left behind.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ignore::WalkBuilder;
use serde::Serialize;
use serde_json::json;

use crate::logging::Logger;
use crate::ui::Theme;

/// Trees larger than this are backed up before removal.
pub const DEFAULT_BACKUP_THRESHOLD: u64 = 1024 * 1024;

/// What [`CleanupService::cleanup`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    /// Whether the path existed when cleanup started.
    pub existed: bool,
    /// Total size of the regular files under the path.
    pub size_bytes: u64,
    /// The sibling backup, if one was made.
    pub backup: Option<PathBuf>,
    /// Whether the path is gone afterwards.
    pub removed: bool,
}

/// Deletes generated output, keeping a backup of large trees.
#[derive(Debug, Clone)]
pub struct CleanupService {
    threshold: u64,
    logger: Arc<Logger>,
    theme: Theme,
}

impl CleanupService {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            threshold: DEFAULT_BACKUP_THRESHOLD,
            logger,
            theme: Theme::detect(),
        }
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Removes `path`, backing it up first when it is larger than the
    /// threshold. A missing path is a no-op.
    pub fn cleanup(&self, path: &Path) -> CleanupOutcome {
        let mut outcome = CleanupOutcome::default();
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.logger
                    .debug("nothing to clean up", Some(json!({ "path": path.display().to_string() })));
                return outcome;
            }
            Err(e) => {
                self.report_leftover(path, &e);
                outcome.existed = true;
                return outcome;
            }
        };
        outcome.existed = true;
        outcome.size_bytes = if metadata.is_dir() {
            tree_size(path)
        } else {
            metadata.len()
        };

        if outcome.size_bytes > self.threshold {
            let target = backup_path(path);
            match copy_tree(path, &target) {
                Ok(()) => {
                    self.logger.info(
                        "backed up before cleanup",
                        Some(json!({
                            "path": path.display().to_string(),
                            "backup": target.display().to_string(),
                            "bytes": outcome.size_bytes,
                        })),
                    );
                    eprintln!(
                        "{} Backup saved to {}",
                        self.theme.paint("→", self.theme.info),
                        target.display()
                    );
                    outcome.backup = Some(target);
                }
                Err(e) => {
                    self.logger.warn(
                        &format!("could not back up {}: {}", path.display(), e),
                        Some(json!({ "backup": target.display().to_string() })),
                    );
                    // Drop whatever part of the backup was written.
                    let _ = fs::remove_dir_all(&target).or_else(|_| fs::remove_file(&target));
                }
            }
        }

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match removed {
            Ok(()) => {
                outcome.removed = true;
                self.logger
                    .info("removed", Some(json!({ "path": path.display().to_string() })));
            }
            Err(e) => self.report_leftover(path, &e),
        }
        outcome
    }

    fn report_leftover(&self, path: &Path, error: &io::Error) {
        self.logger.error_with(
            &format!("could not remove {}", path.display()),
            error,
            None,
        );
        eprintln!(
            "{} Please remove {} manually",
            self.theme.paint("⚠", self.theme.warning),
            path.display()
        );
    }
}

/// Sum of regular file sizes under `root`. Unreadable entries count as 0.
pub fn tree_size(root: &Path) -> u64 {
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// `<name>.backup-<epoch-ms>` next to `path`.
///
/// Trailing separators and `.` components are ignored, so `my-app/` and
/// `my-app` share the same sibling.
pub fn backup_path(path: &Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut normalized: PathBuf = path.components().collect();
    if normalized.file_name().is_none() {
        // `..` has no file name until resolved.
        if let Ok(resolved) = fs::canonicalize(&normalized) {
            normalized = resolved;
        }
    }

    let Some(file_name) = normalized.file_name() else {
        let mut name = OsString::from(normalized.as_os_str());
        name.push(format!(".backup-{}", millis));
        return PathBuf::from(name);
    };
    let mut name = file_name.to_os_string();
    name.push(format!(".backup-{}", millis));
    match normalized.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    if !fs::symlink_metadata(from)?.is_dir() {
        fs::copy(from, to)?;
        return Ok(());
    }

    for entry in WalkBuilder::new(from)
        .standard_filters(false)
        .follow_links(false)
        .build()
    {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = to.join(relative);
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_link(_from: &Path, _to: &Path) -> io::Result<()> {
    Ok(())
}
