//! Reconciling a local directory tree against the remote flat file list
//!
//! Uploads walk the local tree and push one file per request so failures
//! stay attributable to a single path; downloads materialize the remote
//! listing beneath a local directory, creating implicit directories before
//! the files inside them. Batches run sequentially and collect per-item
//! failures until the policy's budget is spent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{self, NeocitiesApi};
use crate::config::SiteConfig;
use crate::error::{BatchFailure, BatchReport, Error, Result};
use crate::listing::{self, Listing, RemoteEntry};
use crate::scan::Scanner;

/// Failure budget for a sequential batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPolicy {
    /// Abort once failures exceed this count; `None` collects them all.
    pub max_failures: Option<usize>,
}

impl BatchPolicy {
    /// Stop at the first failed item.
    #[must_use]
    pub fn fail_fast() -> Self {
        Self {
            max_failures: Some(0),
        }
    }
}

/// Run `op` over `items` sequentially, recording failures per item. The
/// batch stops early once failures exceed the policy's budget; remaining
/// items are left unprocessed.
fn run_batch<T>(
    items: &[T],
    policy: BatchPolicy,
    mut op: impl FnMut(&T) -> Result<()>,
    name: impl Fn(&T) -> String,
) -> BatchReport {
    let mut report = BatchReport::default();
    for item in items {
        match op(item) {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                let path = name(item);
                debug!("{path}: {err}");
                report.failures.push(BatchFailure {
                    path,
                    reason: err.to_string(),
                });
                if policy
                    .max_failures
                    .is_some_and(|max| report.failures.len() > max)
                {
                    report.stopped_early = true;
                    break;
                }
            }
        }
    }
    report
}

/// Normalize a destination directory to an empty string or a `dir/` prefix.
fn remote_prefix(dir_on_server: Option<&str>) -> String {
    let trimmed = dir_on_server.unwrap_or("").trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Upload a local directory tree to the site.
///
/// The tree is walked with config and caller excludes applied, each local
/// relative path mapped to `dir_on_server/<normalized path>`. Files with
/// extensions the service rejects are skipped, not failed. Empty
/// directories are not uploaded; the remote model has no standalone empty
/// directories.
///
/// # Errors
/// [`Error::Argument`] if `dir` is not a directory, [`Error::PartialBatch`]
/// if any file fails to read or upload.
pub fn upload_dir(
    api: &NeocitiesApi,
    dir: &Path,
    dir_on_server: Option<&str>,
    policy: BatchPolicy,
) -> Result<BatchReport> {
    if !dir.is_dir() {
        return Err(Error::Argument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let config = SiteConfig::load(dir)?;
    let prefix = remote_prefix(dir_on_server);
    info!("uploading {} to /{prefix}", dir.display());

    let scanner = config
        .exclude
        .iter()
        .fold(Scanner::new(dir), |scanner, pattern| {
            scanner.exclude(pattern.clone())
        });

    let mut file_map = Vec::new();
    let mut skipped = 0;
    for relative in scanner.scan()? {
        if !api::allowed_extension(&relative) {
            warn!(
                "skipping {}: extension not accepted by the hosting service",
                relative.display()
            );
            skipped += 1;
            continue;
        }
        let remote = format!("{prefix}{}", listing::to_remote(&relative));
        file_map.push((dir.join(&relative), remote));
    }

    upload_batch(api, &file_map, skipped, policy)
}

/// Upload an explicit local-to-remote file mapping, one file per request.
///
/// # Errors
/// [`Error::PartialBatch`] if any file fails to read or upload.
pub fn upload_files(
    api: &NeocitiesApi,
    file_map: &[(PathBuf, String)],
    policy: BatchPolicy,
) -> Result<BatchReport> {
    let mut kept = Vec::new();
    let mut skipped = 0;
    for (local, remote) in file_map {
        if !api::allowed_extension(local) {
            warn!(
                "skipping {}: extension not accepted by the hosting service",
                local.display()
            );
            skipped += 1;
            continue;
        }
        kept.push((local.clone(), remote.clone()));
    }
    upload_batch(api, &kept, skipped, policy)
}

fn upload_batch(
    api: &NeocitiesApi,
    file_map: &[(PathBuf, String)],
    skipped: u32,
    policy: BatchPolicy,
) -> Result<BatchReport> {
    let mut report = run_batch(
        file_map,
        policy,
        |pair| api.upload(std::slice::from_ref(pair)),
        |(_, remote)| remote.clone(),
    );
    report.skipped = skipped;
    report.into_result()
}

/// Download the whole site into an existing local directory.
///
/// # Errors
/// [`Error::Argument`] if `dest` is not a directory, [`Error::PartialBatch`]
/// if any entry fails to fetch or write.
pub fn download_site(api: &NeocitiesApi, dest: &Path, policy: BatchPolicy) -> Result<BatchReport> {
    if !dest.is_dir() {
        return Err(Error::Argument(format!(
            "{} is not a directory",
            dest.display()
        )));
    }
    let info = api.info(None)?;
    let listing = api.list(None)?;
    info!(
        "downloading {} entries from https://{}.neocities.org/",
        listing.len(),
        info.sitename
    );
    materialize(&listing, dest, policy, |entry| {
        api.download_file(&info.sitename, &entry.path)
    })
}

/// Write a remote listing beneath `dest`, fetching file bodies through
/// `fetch`. Directory entries become local directories; file entries get
/// their parent directories created before the content is written. Entries
/// whose path could escape `dest` are recorded as failures and never
/// touch the filesystem.
///
/// # Errors
/// [`Error::PartialBatch`] if any entry fails.
pub fn materialize(
    listing: &Listing,
    dest: &Path,
    policy: BatchPolicy,
    mut fetch: impl FnMut(&RemoteEntry) -> Result<Vec<u8>>,
) -> Result<BatchReport> {
    // Sorting puts parent entries before their children, so an explicit
    // directory entry exists by the time a file inside it is written.
    let mut entries: Vec<&RemoteEntry> = listing.entries.iter().collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let report = run_batch(
        &entries,
        policy,
        |entry| {
            if !listing::clean_relative(&entry.path) {
                return Err(Error::Argument(format!(
                    "refusing unsafe remote path {:?}",
                    entry.path
                )));
            }
            let target = dest.join(&entry.path);
            if entry.is_directory {
                return fs::create_dir_all(&target).map_err(fs_err(&target));
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(fs_err(parent))?;
            }
            let data = fetch(entry)?;
            debug!("{} ({} bytes)", entry.path, data.len());
            fs::write(&target, data).map_err(fs_err(&target))
        },
        |entry| entry.path.clone(),
    );
    report.into_result()
}

/// Delete remote paths one request apiece, so the report can name every
/// path that failed. The service deletes directory paths recursively.
///
/// # Errors
/// [`Error::PartialBatch`] if any path fails to delete.
pub fn delete_paths(
    api: &NeocitiesApi,
    paths: &[String],
    policy: BatchPolicy,
) -> Result<BatchReport> {
    let report = run_batch(
        paths,
        policy,
        |path| api.delete(std::slice::from_ref(path)),
        String::clone,
    );
    report.into_result()
}

/// Placeholder restored as index.html, which the service refuses to delete.
const BLANK_INDEX: &str = "<!DOCTYPE html>\n<html>\n<head><title></title></head>\n<body></body>\n</html>\n";

/// Delete every file on the site except `index.html`, which is replaced
/// with a blank placeholder. `wait` is a courtesy pause before the delete
/// request; site-wide deletion right after a listing reads as scripted
/// traffic to the service.
///
/// # Errors
/// Returns the first API failure; this is a two-request operation, not a
/// per-item batch.
pub fn delete_all(api: &NeocitiesApi, wait: Duration) -> Result<usize> {
    let listing = api.list(None)?;
    let doomed: Vec<String> = listing
        .paths()
        .filter(|path| *path != "index.html")
        .map(str::to_string)
        .collect();

    info!("deleting {} remote paths", doomed.len());
    std::thread::sleep(wait);
    api.delete(&doomed)?;
    api.upload_bytes("index.html", BLANK_INDEX.as_bytes().to_vec())?;
    Ok(doomed.len())
}

fn fs_err(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    |source| Error::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}
