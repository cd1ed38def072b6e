use log::debug;
use percent_encoding::percent_decode_str;
use std::io::{self, BufRead, Read};

use super::Headers;

/// Upper bound on the request line plus headers.
pub const MAX_HEADER_BYTES: u64 = 1 << 20;

/// An inbound request. Read-only for every stage except the prefix stripper,
/// which derives a copy with a rewritten `path` via [`Request::with_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target exactly as received on the request line.
    pub target: String,
    /// Percent-decoded path component of the target.
    pub path: String,
    pub query: Option<String>,
    /// Protocol token from the request line, e.g. `HTTP/1.1`.
    pub version: String,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: &str, target: &str, version: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.to_string(),
            target: target.to_string(),
            path,
            query,
            version: version.to_string(),
            headers: Headers::new(),
        }
    }

    /// Shorthand for an `HTTP/1.1` request, mostly handy in tests.
    pub fn get(target: &str) -> Self {
        Self::new("GET", target, "HTTP/1.1")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Copy of this request addressed to `path`; target and query are kept.
    pub fn with_path(&self, path: String) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Reads a request line and its headers.
    ///
    /// Returns `Ok(None)` when the peer closed the connection before sending
    /// anything. Malformed input is reported as `ErrorKind::InvalidData`.
    pub fn read_from<R: BufRead>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut reader = reader.by_ref().take(MAX_HEADER_BYTES);

        let mut first_line = String::new();
        if read_capped_line(&mut reader, &mut first_line)? == 0 {
            return Ok(None);
        }
        debug!("Request line: {}", first_line.trim());

        let parts: Vec<&str> = first_line.split_whitespace().collect();
        let [method, target, version] = parts[..] else {
            return Err(invalid(format!("malformed request line: {}", first_line.trim())));
        };
        if !version.starts_with("HTTP/") {
            return Err(invalid(format!("unsupported protocol: {version}")));
        }
        let (raw_path, _) = target.split_once('?').unwrap_or((target, ""));
        if percent_decode_str(raw_path).decode_utf8().is_err() {
            return Err(invalid(format!("path is not UTF-8: {raw_path}")));
        }

        let mut request = Self::new(method, target, version);

        let mut line = String::new();
        loop {
            line.clear();
            if read_capped_line(&mut reader, &mut line)? == 0 {
                return Err(invalid("connection closed inside headers".to_string()));
            }
            if line.trim().is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) => request.headers.append(name.trim(), value.trim()),
                None => debug!("Skipping invalid header line: {}", line.trim()),
            }
        }

        Ok(Some(request))
    }
}

/// Reads one line, failing once the header budget runs out mid-line.
fn read_capped_line<R: BufRead>(reader: &mut io::Take<R>, line: &mut String) -> io::Result<usize> {
    let read = reader.read_line(line)?;
    if reader.limit() == 0 && !line.ends_with('\n') {
        return Err(invalid(format!(
            "request header exceeds {MAX_HEADER_BYTES} bytes"
        )));
    }
    Ok(read)
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Splits an origin-form or absolute-form target into a decoded path and the
/// raw query.
fn split_target(target: &str) -> (String, Option<String>) {
    let origin = match target.find("://") {
        Some(scheme_end) => {
            let rest = &target[scheme_end + 3..];
            rest.find('/').map_or("/", |i| &rest[i..])
        }
        None => target,
    };

    let (path, query) = match origin.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (origin, None),
    };
    (percent_decode_str(path).decode_utf8_lossy().into_owned(), query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn splits_path_and_query() {
        let req = Request::get("/Build/app.wasm.br?v=3");
        assert_eq!(req.path, "/Build/app.wasm.br");
        assert_eq!(req.query.as_deref(), Some("v=3"));
        assert_eq!(req.target, "/Build/app.wasm.br?v=3");
    }

    #[test]
    fn absolute_form_target() {
        let req = Request::get("http://localhost:5000/base/index.html");
        assert_eq!(req.path, "/base/index.html");
        assert_eq!(req.query, None);

        let req = Request::get("http://localhost:5000");
        assert_eq!(req.path, "/");
    }

    #[test]
    fn reads_request_line_and_headers() {
        let raw = "GET /index.html HTTP/1.1\r\nHost: localhost\r\nAccept-Encoding: br\r\n\r\n";
        let req = Request::read_from(&mut Cursor::new(raw)).unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/index.html");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.headers.get("host"), Some("localhost"));
        assert_eq!(req.headers.get("accept-encoding"), Some("br"));
    }

    #[test]
    fn empty_stream_is_not_a_request() {
        assert!(Request::read_from(&mut Cursor::new("")).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_request_line() {
        let err = Request::read_from(&mut Cursor::new("GET /\r\n\r\n")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = Request::read_from(&mut Cursor::new("GET / SPDY/3\r\n\r\n")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn path_is_decoded_target_is_not() {
        let req = Request::get("/my%20game/Build/x.wasm%2Ebr?q=a%20b");
        assert_eq!(req.path, "/my game/Build/x.wasm.br");
        assert_eq!(req.query.as_deref(), Some("q=a%20b"));
        assert_eq!(req.target, "/my%20game/Build/x.wasm%2Ebr?q=a%20b");
    }

    #[test]
    fn rejects_non_utf8_path() {
        let err = Request::read_from(&mut Cursor::new("GET /%ff%fe HTTP/1.1\r\n\r\n")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_oversized_request_line() {
        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_HEADER_BYTES as usize));
        let err = Request::read_from(&mut Cursor::new(raw)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_oversized_headers() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        let header = format!("X-Pad: {}\r\n", "p".repeat(1000));
        while raw.len() as u64 <= MAX_HEADER_BYTES {
            raw.push_str(&header);
        }
        raw.push_str("\r\n");
        let err = Request::read_from(&mut Cursor::new(raw)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn with_path_keeps_original_target() {
        let req = Request::get("/base/index.html?x=1");
        let stripped = req.with_path("/index.html".to_string());
        assert_eq!(stripped.path, "/index.html");
        assert_eq!(stripped.target, "/base/index.html?x=1");
        assert_eq!(stripped.query.as_deref(), Some("x=1"));
    }
}
