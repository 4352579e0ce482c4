//! Resource loading – turns an `src`/`url` reference into raw bytes.
//!
//! Three forms are accepted: `data:*;base64` URIs, `http(s)` URLs, and file
//! paths. Relative paths resolve against the base directory the caller
//! supplies (the data file's directory in the CLI).

use std::fs;
use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("cvgen/", env!("CARGO_PKG_VERSION"));

/// A blocking HTTP client with the crate's timeout and user agent.
pub(crate) fn http_client() -> Result<reqwest::blocking::Client, String> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("HTTP client init failed: {e}"))
}

/// Fetch a URL, returning the response body. Non-success statuses are errors.
pub(crate) fn fetch_url(url: &str) -> Result<Vec<u8>, String> {
    let client = http_client()?;
    let response = client
        .get(url)
        .send()
        .map_err(|e| format!("request to {url} failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("{url} returned {}", response.status()));
    }
    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| format!("reading {url} failed: {e}"))
}

/// Parse a `data:<mime>;base64,<data>` URI into raw bytes.
pub(crate) fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URI".to_string())?;
    let comma = rest
        .find(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator".to_string())?;
    let header = &rest[..comma];
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(rest[comma + 1..].trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

/// Resolve a resource reference to bytes.
pub fn load_resource(src: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, String> {
    if src.starts_with("data:") {
        return parse_data_uri(src);
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return fetch_url(src);
    }
    let path = Path::new(src);
    let resolved = if path.is_relative() {
        match base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    } else {
        path.to_path_buf()
    };
    fs::read(&resolved).map_err(|e| format!("{}: {e}", resolved.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1×1 transparent PNG
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_data_uri() {
        let src = format!("data:image/png;base64,{PNG_B64}");
        let bytes = load_resource(&src, None).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_non_base64_data_uri() {
        assert!(load_resource("data:text/plain,hello", None).is_err());
    }

    #[test]
    fn resolves_relative_path_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.bin"), b"abc").unwrap();
        let bytes = load_resource("photo.bin", Some(dir.path())).unwrap();
        assert_eq!(bytes, b"abc");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_resource("nope.png", Some(dir.path())).is_err());
    }
}
