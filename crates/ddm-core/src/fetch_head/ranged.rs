//! Fallback probe for servers that reject or mishandle HEAD requests: issue a
//! ranged `GET bytes=0-1` and derive the same metadata from the response.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::str;
use std::time::Duration;

use super::{parse, HeadResult};

/// Performs a tiny ranged GET (`Range: bytes=0-1`) and parses the response
/// headers the same way a HEAD probe would. A `206 Partial Content` response
/// confirms range support directly; a `200 OK` means the server ignored the
/// Range header and returned the whole body (still useful for size/ETag, but
/// `accept_ranges` is false). The body itself is discarded.
pub fn probe_via_ranged_get(
    url: &str,
    custom_headers: &HashMap<String, String>,
) -> Result<HeadResult> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    easy.range("0-1")?;

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        // Discard the body; we only care about headers and status.
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform().context("ranged GET probe failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if code != 200 && code != 206 {
        anyhow::bail!("ranged GET probe {} returned HTTP {}", url, code);
    }

    let mut result = parse::parse_headers(&headers)?;
    if code == 206 {
        result.accept_ranges = true;
        if let Some(total) = content_range_total(&headers) {
            result.content_length = Some(total);
        }
    }
    Ok(result)
}

/// Extracts the `<total>` from a `Content-Range: bytes 0-1/<total>` header, if present.
fn content_range_total(lines: &[String]) -> Option<u64> {
    for line in lines {
        let line = line.trim();
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("content-range") {
            continue;
        }
        let value = value.trim();
        let total = value.rsplit('/').next()?;
        if total == "*" {
            return None;
        }
        return total.parse::<u64>().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total_parses() {
        let lines = vec!["Content-Range: bytes 0-1/5000".to_string()];
        assert_eq!(content_range_total(&lines), Some(5000));
    }

    #[test]
    fn content_range_total_missing() {
        let lines = vec!["Content-Length: 5000".to_string()];
        assert_eq!(content_range_total(&lines), None);
    }

    #[test]
    fn content_range_total_unknown_total() {
        let lines = vec!["Content-Range: bytes 0-1/*".to_string()];
        assert_eq!(content_range_total(&lines), None);
    }
}
