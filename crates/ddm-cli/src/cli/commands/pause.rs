//! `ddm pause <id>` – pause a job.

use anyhow::Result;
use ddm_core::resume_db::{JobState, ResumeDb};

use crate::cli::control_socket;

/// Signals a live `ddm run` process (if any) over the control socket so an
/// in-flight download stops at its next cancellation check, then marks the
/// job `Paused` in the database so a future `run` won't pick it back up.
pub async fn run_pause(db: &ResumeDb, id: i64) -> Result<()> {
    if let Ok(socket_path) = ddm_core::control::default_control_socket_path() {
        if let Err(e) = control_socket::send_pause(&socket_path, id).await {
            tracing::debug!("control socket notify failed (job may not be running): {e}");
        }
    }
    db.set_state(id, JobState::Paused).await?;
    println!("Paused job {id}");
    Ok(())
}
