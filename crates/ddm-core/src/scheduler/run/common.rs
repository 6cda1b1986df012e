//! Shared helpers for single and parallel job run (filename resolution, paths).

use anyhow::Result;
use std::path::Path;

use crate::resume_db::ResumeDb;
use crate::storage;
use crate::url_model;

/// Resolves the directory a job's files actually land in: the job's own
/// `download_dir` override if set, else the scheduler's default. Used to
/// populate `Downloads.SavePath` at each metadata write.
pub fn effective_dir_string(job: &crate::resume_db::JobDetails, download_dir: &Path) -> String {
    job.settings
        .download_dir
        .clone()
        .unwrap_or_else(|| download_dir.to_string_lossy().to_string())
}

/// Resolve final and temp filenames and whether metadata must be (re)fetched.
/// Uses job's download_dir or `download_dir`; checks DB for existing names to avoid collisions.
pub async fn resolve_filenames(
    db: &ResumeDb,
    job_id: i64,
    job: &crate::resume_db::JobDetails,
    head: &crate::fetch_head::HeadResult,
    force_restart: bool,
    validation_failed: bool,
    download_dir: &Path,
) -> Result<(String, String, bool)> {
    let candidate_name =
        url_model::derive_filename(&job.url, head.content_disposition.as_deref());
    let effective_dir_str = job
        .settings
        .download_dir
        .as_deref()
        .or_else(|| download_dir.to_str());
    let final_name = if job.total_size.is_none() || force_restart || validation_failed {
        let existing = db
            .list_final_filenames_in_dir(effective_dir_str, Some(job_id))
            .await?;
        url_model::unique_filename_among(&candidate_name, &existing)
    } else {
        job.final_filename
            .as_deref()
            .unwrap_or(&candidate_name)
            .to_string()
    };
    let temp_name = storage::temp_path(Path::new(&final_name));
    let temp_name_str = temp_name.to_string_lossy().to_string();
    let needs_metadata = job.total_size.is_none() || force_restart || validation_failed;
    Ok((final_name, temp_name_str, needs_metadata))
}

/// Build temp and final paths from job and names.
///
/// If the final path already exists on disk: with `overwrite`, the existing
/// file is removed so the download can replace it in place; otherwise the
/// final name is uniquified with a `(n)` suffix so the existing file is never
/// silently clobbered (the naming law). A job resuming its own `.part` file
/// is unaffected either way, since uniquification only looks at the final
/// (completed) path, not the temp path.
pub fn paths_and_overwrite_check(
    job: &crate::resume_db::JobDetails,
    final_name: &str,
    temp_name_str: &str,
    download_dir: &Path,
    overwrite: bool,
) -> Result<(std::path::PathBuf, std::path::PathBuf)> {
    let effective_dir = job
        .settings
        .download_dir
        .as_deref()
        .map(std::path::Path::new)
        .unwrap_or(download_dir);
    let temp_path = effective_dir.join(job.temp_filename.as_deref().unwrap_or(temp_name_str));
    let resolved_final_name = job.final_filename.as_deref().unwrap_or(final_name);
    let mut final_path = effective_dir.join(resolved_final_name);

    if final_path.exists() {
        if overwrite {
            std::fs::remove_file(&final_path)?;
        } else {
            let unique_name = url_model::unique_filename(resolved_final_name, |candidate| {
                effective_dir.join(candidate).exists()
            });
            final_path = effective_dir.join(unique_name);
        }
    }

    Ok((temp_path, final_path))
}
