//! `ddm remove <id>` – remove a job, optionally deleting its files.

use anyhow::Result;
use ddm_core::resume_db::ResumeDb;
use std::path::Path;

pub async fn run_remove(
    db: &ResumeDb,
    id: i64,
    delete_files: bool,
    download_dir: Option<&Path>,
) -> Result<()> {
    if delete_files {
        if let Some(job) = db.get_job(id).await? {
            let dir = job
                .settings
                .download_dir
                .as_deref()
                .map(Path::new)
                .or(download_dir);

            let candidates = [job.final_filename.as_deref(), job.temp_filename.as_deref()];
            for name in candidates.into_iter().flatten() {
                let path = match dir {
                    Some(dir) => dir.join(name),
                    None => Path::new(name).to_path_buf(),
                };
                match std::fs::remove_file(&path) {
                    Ok(()) => println!("Deleted {}", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!("failed to delete {}: {e}", path.display());
                    }
                }
            }
        }
    }

    db.remove_job(id).await?;
    println!("Removed job {id}");
    Ok(())
}
