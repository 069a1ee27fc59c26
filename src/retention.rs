//! Retention over the files a rolling sink has produced.
//!
//! The file set is rediscovered from the directory on every sweep; nothing is
//! cached between runs, so files left by an earlier process are counted too.

use crate::SelfLog;
use crate::rotation::PathTemplate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::Date;

/// A file on disk whose name matches the path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolledFile {
    pub path: PathBuf,
    pub date: Date,
    pub sequence: u32,
    pub modified: Option<SystemTime>,
}

/// Files matching `template`, most recently written first.
///
/// Files with the same modification time are ordered by the date and
/// sequence encoded in their names.
pub fn rolled_files(template: &PathTemplate) -> io::Result<Vec<RolledFile>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(template.directory())? {
        let entry = entry?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let name = entry.file_name();
        let Some((date, sequence)) = name.to_str().and_then(|n| template.parse_file_name(n))
        else {
            continue;
        };

        files.push(RolledFile {
            path: entry.path(),
            date,
            sequence,
            modified: entry.metadata().and_then(|m| m.modified()).ok(),
        });
    }

    files.sort_by(|a, b| (b.modified, b.date, b.sequence).cmp(&(a.modified, a.date, a.sequence)));
    Ok(files)
}

/// Highest sequence number already on disk for `date`, if any file of that
/// date exists.
pub fn latest_sequence(template: &PathTemplate, date: Date) -> Option<u32> {
    rolled_files(template)
        .ok()?
        .into_iter()
        .filter(|file| file.date == date)
        .map(|file| file.sequence)
        .max()
}

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Matching files left on disk.
    pub retained: usize,
    /// Files removed.
    pub deleted: Vec<PathBuf>,
}

/// Delete the oldest rolled files so that at most `retained_file_count_limit`
/// remain, always keeping `protected`.
///
/// `None` keeps everything. Failures to list the directory or delete a file
/// are reported to the self-log and otherwise ignored.
pub fn sweep(
    template: &PathTemplate,
    retained_file_count_limit: Option<u32>,
    protected: &Path,
    selflog: &SelfLog,
) -> SweepReport {
    let Some(limit) = retained_file_count_limit else {
        return SweepReport::default();
    };

    let files = match rolled_files(template) {
        Ok(files) => files,
        Err(e) => {
            selflog.write(format!(
                "Unable to list {} for retention: {}",
                template.directory().display(),
                e
            ));
            return SweepReport::default();
        }
    };

    // All candidates live in the same directory, so the name identifies them.
    let protected_name = protected.file_name();
    let (current, others): (Vec<_>, Vec<_>) = files
        .into_iter()
        .partition(|file| file.path.file_name() == protected_name);

    let keep = usize::try_from(limit).unwrap_or(usize::MAX).saturating_sub(1);
    let mut report = SweepReport {
        retained: current.len() + others.len().min(keep),
        deleted: Vec::new(),
    };
    remove_expired(others.into_iter().skip(keep), selflog, &mut report);
    report
}

/// Delete `expired`. A file that cannot be removed is reported and counted
/// as retained.
fn remove_expired(
    expired: impl IntoIterator<Item = RolledFile>,
    selflog: &SelfLog,
    report: &mut SweepReport,
) {
    for file in expired {
        match fs::remove_file(&file.path) {
            Ok(()) => {
                tracing::debug!(path = %file.path.display(), "removed expired log file");
                report.deleted.push(file.path);
            }
            Err(e) => {
                selflog.write(format!(
                    "Unable to remove expired log file {}: {}",
                    file.path.display(),
                    e
                ));
                report.retained += 1;
            }
        }
    }
}
