//! `ddm add <url>` – add a new download job.

use anyhow::Result;
use ddm_core::resume_db::{JobSettings, ResumeDb};
use std::path::Path;

pub async fn run_add(
    db: &ResumeDb,
    url: &str,
    download_dir: Option<&Path>,
    checksum: Option<&str>,
) -> Result<()> {
    let settings = JobSettings {
        download_dir: download_dir.map(|p| p.display().to_string()),
        checksum: checksum.map(|c| c.to_ascii_lowercase()),
        ..JobSettings::default()
    };
    let id = db.add_job(url, &settings).await?;
    println!("Added job {id} for URL: {url}");
    Ok(())
}
