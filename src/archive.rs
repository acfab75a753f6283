//! Zip packaging of conversion output

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Entries at or above this size are written as zip64
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Summary of a written archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of file entries written
    pub entries: usize,
    /// Total uncompressed bytes
    pub bytes_in: u64,
}

/// Recursively zip `source_dir` into `archive_path`
///
/// Every file below `source_dir` is stored deflated at
/// `<source_dir name>/<relative path>`. Empty directories are not recorded.
/// The walk is sorted and timestamps and permissions are pinned, so the same
/// tree always yields the same bytes.
///
/// This does blocking I/O; call it from `spawn_blocking` in async code.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zarr_export::archive::compress_dir;
///
/// let summary = compress_dir(Path::new("/tmp/out/cells.czi"), Path::new("/tmp/cells.zip"))?;
/// println!("{} entries", summary.entries);
/// # Ok::<(), zarr_export::Error>(())
/// ```
pub fn compress_dir(source_dir: &Path, archive_path: &Path) -> Result<ArchiveSummary> {
    let root_name = source_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::Other(format!(
                "cannot derive archive root folder from {}",
                source_dir.display()
            ))
        })?
        .to_string();

    debug!(?source_dir, ?archive_path, root = %root_name, "creating archive");

    let file = File::create(archive_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base_options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut summary = ArchiveSummary {
        entries: 0,
        bytes_in: 0,
    };

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::Other(format!("walked outside source dir: {}", e)))?;
        let name = entry_name(&root_name, relative)?;

        let size = entry.metadata().map_err(|e| {
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata lookup failed")),
            )
        })?;
        let size = size.len();
        let options = base_options.large_file(size >= ZIP64_THRESHOLD);

        zip.start_file(name.as_str(), options)?;
        let mut input = File::open(entry.path())?;
        let copied = std::io::copy(&mut input, &mut zip)?;

        summary.entries += 1;
        summary.bytes_in += copied;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    info!(
        ?archive_path,
        entries = summary.entries,
        bytes_in = summary.bytes_in,
        "archive written"
    );
    Ok(summary)
}

/// `root/a/b` with forward slashes regardless of platform
fn entry_name(root: &str, relative: &Path) -> Result<String> {
    let mut name = String::from(root);
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::Other(format!("non UTF-8 path in output: {}", relative.display()))
                })?;
                name.push('/');
                name.push_str(part);
            }
            _ => {
                return Err(Error::Other(format!(
                    "unexpected path component in {}",
                    relative.display()
                )));
            }
        }
    }
    Ok(name)
}
