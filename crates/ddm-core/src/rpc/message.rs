//! Request/response payloads for the native-message RPC surface.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One incoming native message, `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum Request {
    #[serde(rename = "healthcheck")]
    Healthcheck { request_id: Option<String> },
    #[serde(rename = "ping")]
    Ping { request_id: Option<String> },
    #[serde(rename = "add_download")]
    AddDownload(AddDownloadRequest),
    #[serde(rename = "add_media_download")]
    AddMediaDownload(AddMediaDownloadRequest),
    #[serde(rename = "get_status")]
    GetStatus {
        request_id: Option<String>,
        #[serde(rename = "downloadId")]
        download_id: Option<i64>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AddDownloadRequest {
    #[serde(rename = "requestId")]
    pub request_id: Option<String>,
    pub url: String,
    pub filename: Option<String>,
    pub referrer: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AddMediaDownloadRequest {
    #[serde(rename = "requestId")]
    pub request_id: Option<String>,
    #[serde(rename = "manifestUrl")]
    pub manifest_url: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub quality: Option<String>,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

/// One outgoing native message. `Error`'s payload always carries `message` and `code`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum Response {
    #[serde(rename = "healthcheck")]
    Healthcheck { request_id: Option<String>, ok: bool },
    #[serde(rename = "add_download")]
    AddDownload {
        request_id: Option<String>,
        #[serde(rename = "downloadId")]
        download_id: i64,
    },
    #[serde(rename = "get_status")]
    GetStatus {
        request_id: Option<String>,
        downloads: Vec<DownloadStatus>,
    },
    #[serde(rename = "error")]
    Error {
        request_id: Option<String>,
        message: String,
        code: String,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DownloadStatus {
    #[serde(rename = "downloadId")]
    pub download_id: i64,
    pub url: String,
    pub state: String,
    #[serde(rename = "totalSize")]
    pub total_size: Option<i64>,
    #[serde(rename = "finalFilename")]
    pub final_filename: Option<String>,
}
