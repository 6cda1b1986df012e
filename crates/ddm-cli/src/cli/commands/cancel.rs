//! `ddm cancel <id>` – pause plus discard progress: stops a live download
//! (if one is running), deletes its `.part` file, and marks the job
//! `Cancelled`. The job row itself survives until `remove`.

use anyhow::Result;
use ddm_core::resume_db::{JobState, ResumeDb};
use std::path::Path;

use crate::cli::control_socket;

pub async fn run_cancel(db: &ResumeDb, id: i64, download_dir: Option<&Path>) -> Result<()> {
    if let Ok(socket_path) = ddm_core::control::default_control_socket_path() {
        if let Err(e) = control_socket::send_cancel(&socket_path, id).await {
            tracing::debug!("control socket notify failed (job may not be running): {e}");
        }
    }

    if let Some(job) = db.get_job(id).await? {
        let dir = job.settings.download_dir.as_deref().map(Path::new).or(download_dir);
        if let Some(name) = job.temp_filename.as_deref() {
            let path = match dir {
                Some(dir) => dir.join(name),
                None => Path::new(name).to_path_buf(),
            };
            match std::fs::remove_file(&path) {
                Ok(()) => println!("Deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("failed to delete {}: {e}", path.display()),
            }
        }
    }

    db.set_state(id, JobState::Cancelled).await?;
    println!("Cancelled job {id}");
    Ok(())
}
