//! Dispatches a decoded `Request` against the job database and builds a `Response`.

use std::collections::HashMap;

use crate::resume_db::{JobSettings, ResumeDb};

use super::message::{DownloadStatus, Request, Response};

/// Handles one request. Never returns `Err`: failures are reported as
/// `Response::Error` so the caller can always frame and send a reply.
pub async fn handle_request(db: &ResumeDb, request: Request) -> Response {
    match request {
        Request::Healthcheck { request_id } | Request::Ping { request_id } => {
            Response::Healthcheck {
                request_id,
                ok: true,
            }
        }
        Request::AddDownload(req) => handle_add_download(db, req).await,
        Request::AddMediaDownload(req) => Response::Error {
            request_id: req.request_id,
            message: "media pipeline not implemented".to_string(),
            code: "not_implemented".to_string(),
        },
        Request::GetStatus {
            request_id,
            download_id,
        } => handle_get_status(db, request_id, download_id).await,
    }
}

async fn handle_add_download(
    db: &ResumeDb,
    req: super::message::AddDownloadRequest,
) -> Response {
    if req.url.parse::<url::Url>().is_err() {
        return Response::Error {
            request_id: req.request_id,
            message: format!("invalid URL: {}", req.url),
            code: "invalid_url".to_string(),
        };
    }

    let mut custom_headers: HashMap<String, String> = req.headers.unwrap_or_default();
    if let Some(referrer) = req.referrer {
        custom_headers
            .entry("Referer".to_string())
            .or_insert(referrer);
    }

    let settings = JobSettings {
        category: req.category,
        custom_headers: if custom_headers.is_empty() {
            None
        } else {
            Some(custom_headers)
        },
        ..JobSettings::default()
    };

    match db.add_job(&req.url, &settings).await {
        Ok(download_id) => Response::AddDownload {
            request_id: req.request_id,
            download_id,
        },
        Err(e) => Response::Error {
            request_id: req.request_id,
            message: format!("add_download failed: {}", e),
            code: "internal_error".to_string(),
        },
    }
}

async fn handle_get_status(
    db: &ResumeDb,
    request_id: Option<String>,
    download_id: Option<i64>,
) -> Response {
    let downloads = match download_id {
        Some(id) => match db.get_job(id).await {
            Ok(Some(job)) => vec![DownloadStatus {
                download_id: job.id,
                url: job.url,
                state: job.state.as_str().to_string(),
                total_size: job.total_size,
                final_filename: job.final_filename,
            }],
            Ok(None) => {
                return Response::Error {
                    request_id,
                    message: format!("no such download: {}", id),
                    code: "not_found".to_string(),
                }
            }
            Err(e) => {
                return Response::Error {
                    request_id,
                    message: format!("get_status failed: {}", e),
                    code: "internal_error".to_string(),
                }
            }
        },
        None => match db.list_jobs().await {
            Ok(jobs) => jobs
                .into_iter()
                .map(|j| DownloadStatus {
                    download_id: j.id,
                    url: j.url,
                    state: j.state.as_str().to_string(),
                    total_size: j.total_size,
                    final_filename: j.final_filename,
                })
                .collect(),
            Err(e) => {
                return Response::Error {
                    request_id,
                    message: format!("get_status failed: {}", e),
                    code: "internal_error".to_string(),
                }
            }
        },
    };
    Response::GetStatus {
        request_id,
        downloads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume_db::ResumeDb;

    async fn open_memory() -> ResumeDb {
        ResumeDb::open_memory().await.expect("open in-memory db")
    }

    #[tokio::test]
    async fn healthcheck_and_ping_report_ok() {
        let db = open_memory().await;
        let resp = handle_request(
            &db,
            Request::Healthcheck {
                request_id: Some("1".to_string()),
            },
        )
        .await;
        assert_eq!(
            resp,
            Response::Healthcheck {
                request_id: Some("1".to_string()),
                ok: true
            }
        );
    }

    #[tokio::test]
    async fn add_download_creates_a_job() {
        let db = open_memory().await;
        let resp = handle_request(
            &db,
            Request::AddDownload(super::super::message::AddDownloadRequest {
                request_id: Some("42".to_string()),
                url: "https://example.com/file.iso".to_string(),
                filename: None,
                referrer: None,
                headers: None,
                category: None,
            }),
        )
        .await;
        match resp {
            Response::AddDownload {
                request_id,
                download_id,
            } => {
                assert_eq!(request_id, Some("42".to_string()));
                assert!(download_id > 0);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn add_download_rejects_invalid_url() {
        let db = open_memory().await;
        let resp = handle_request(
            &db,
            Request::AddDownload(super::super::message::AddDownloadRequest {
                request_id: None,
                url: "not a url".to_string(),
                filename: None,
                referrer: None,
                headers: None,
                category: None,
            }),
        )
        .await;
        assert!(matches!(resp, Response::Error { code, .. } if code == "invalid_url"));
    }

    #[tokio::test]
    async fn add_media_download_reports_not_implemented() {
        let db = open_memory().await;
        let resp = handle_request(
            &db,
            Request::AddMediaDownload(super::super::message::AddMediaDownloadRequest {
                request_id: None,
                manifest_url: "https://example.com/stream.m3u8".to_string(),
                media_type: "hls".to_string(),
                quality: None,
                title: None,
                referrer: None,
                headers: None,
            }),
        )
        .await;
        assert!(matches!(resp, Response::Error { code, .. } if code == "not_implemented"));
    }

    #[tokio::test]
    async fn get_status_without_id_lists_all_jobs() {
        let db = open_memory().await;
        db.add_job("https://example.com/a", &JobSettings::default())
            .await
            .unwrap();
        db.add_job("https://example.com/b", &JobSettings::default())
            .await
            .unwrap();
        let resp = handle_request(
            &db,
            Request::GetStatus {
                request_id: None,
                download_id: None,
            },
        )
        .await;
        match resp {
            Response::GetStatus { downloads, .. } => assert_eq!(downloads.len(), 2),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
