//! Parse HTTP response header lines into name/value pairs.

/// Parse collected header lines into `(name, value)` pairs.
///
/// Each status line (`HTTP/...`) starts a new header block, so after redirects
/// only the final response's headers are returned.
pub fn parse_headers(lines: &[String]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}
