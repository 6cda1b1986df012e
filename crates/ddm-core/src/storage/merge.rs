//! Concatenates per-segment temp files into the final merged temp file.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use super::writer::StorageWriter;
use super::{segment_temp_path, StorageWriterBuilder};

const COPY_BUF_SIZE: usize = 1024 * 1024;

/// Merges `segment_count` per-segment temp files for `download_id` (in index
/// order) into a fresh temp file at `merged_path`, syncs it, and deletes the
/// segment files. Returns the writer for `merged_path` so the caller can
/// finalize (rename) it. Segment files must already be complete; a length
/// mismatch against what was recorded aborts the merge without touching
/// `merged_path`'s siblings.
pub fn merge_segments(
    download_id: i64,
    segment_count: usize,
    merged_path: &Path,
) -> Result<StorageWriter> {
    let builder = StorageWriterBuilder::create(merged_path)
        .with_context(|| format!("create merged temp file: {}", merged_path.display()))?;
    let writer = builder.build();

    let mut offset: u64 = 0;
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    for idx in 0..segment_count {
        let seg_path = segment_temp_path(download_id, idx);
        let mut f = std::fs::File::open(&seg_path)
            .with_context(|| format!("open segment temp file: {}", seg_path.display()))?;
        let expected_len = f
            .metadata()
            .with_context(|| format!("stat segment temp file: {}", seg_path.display()))?
            .len();

        let mut copied = 0u64;
        loop {
            let n = f
                .read(&mut buf)
                .with_context(|| format!("read segment temp file: {}", seg_path.display()))?;
            if n == 0 {
                break;
            }
            writer.write_at(offset + copied, &buf[..n])?;
            copied += n as u64;
        }
        if copied != expected_len {
            anyhow::bail!(
                "short read merging segment {}: copied {} of {} bytes",
                idx,
                copied,
                expected_len
            );
        }
        offset += copied;
    }

    writer.sync()?;
    for idx in 0..segment_count {
        let seg_path = segment_temp_path(download_id, idx);
        if let Err(e) = std::fs::remove_file(&seg_path) {
            tracing::warn!(
                "failed to remove segment temp file {}: {e}",
                seg_path.display()
            );
        }
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn merges_segments_in_index_order_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();

        // A download id unlikely to collide with another test or a real job.
        let download_id = -9_182_773_410_i64;
        std::fs::create_dir_all(super::super::segment_temp_dir()).unwrap();
        std::fs::write(super::super::segment_temp_path(download_id, 0), b"hello ").unwrap();
        std::fs::write(super::super::segment_temp_path(download_id, 1), b"world!").unwrap();

        let merged_path = dir.path().join("out.part");
        let writer = merge_segments(download_id, 2, &merged_path).unwrap();
        let final_path = dir.path().join("out.bin");
        writer.finalize(&final_path).unwrap();

        let mut contents = String::new();
        std::fs::File::open(&final_path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "hello world!");
        assert!(!super::super::segment_temp_path(download_id, 0).exists());
        assert!(!super::super::segment_temp_path(download_id, 1).exists());
    }
}
