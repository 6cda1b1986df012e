//! Disk I/O and file lifecycle.
//!
//! Preallocates temp files (fallocate on Linux when available, else set_len),
//! supports concurrent offset writes (pwrite), fsync policy, and atomic
//! finalize (rename from `.part` to final name). Segmented downloads land in
//! per-segment temp files under the system temp directory (`merge`), which
//! get concatenated in index order into the per-download `.part` file built
//! here once every segment completes.

mod builder;
mod merge;
mod writer;

pub use builder::StorageWriterBuilder;
pub use merge::merge_segments;
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    std::path::PathBuf::from(o)
}

/// Directory holding per-segment temp files for all downloads, under the
/// system temp directory (not the user's chosen save directory).
pub fn segment_temp_dir() -> std::path::PathBuf {
    std::env::temp_dir().join("ddm")
}

/// Path for one segment's temp file: `<systemTempDir>/ddm/<downloadId>_<index>.part`.
pub fn segment_temp_path(download_id: i64, index: usize) -> std::path::PathBuf {
    segment_temp_dir().join(format!("{}_{}.part", download_id, index))
}
