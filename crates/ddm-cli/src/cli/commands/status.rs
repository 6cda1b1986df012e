//! `ddm status` – show status of all jobs, or `--logs <id>` for one job's history.

use anyhow::Result;
use ddm_core::resume_db::ResumeDb;

pub async fn run_status(db: &ResumeDb, logs: Option<i64>) -> Result<()> {
    if let Some(id) = logs {
        return print_logs(db, id).await;
    }

    let jobs = db.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs in database.");
    } else {
        println!("{:<6} {:<10} {:<10} {}", "ID", "STATE", "SIZE", "URL");
        for j in jobs {
            let size_str = j
                .total_size
                .map(|s| format!("{s}"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<6} {:<10} {:<10} {}",
                j.id,
                format!("{:?}", j.state).to_lowercase(),
                size_str,
                j.url
            );
        }
    }
    Ok(())
}

async fn print_logs(db: &ResumeDb, id: i64) -> Result<()> {
    let entries = db.read_last_logs(id, 200).await?;
    if entries.is_empty() {
        println!("No log entries for job {id}.");
        return Ok(());
    }
    for entry in entries {
        println!("[{}] {:<5} {}", entry.ts, entry.level, entry.message);
    }
    Ok(())
}
