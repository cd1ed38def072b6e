use mime_guess::{from_path, mime};
use percent_encoding::utf8_percent_encode;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::path_utils::{base_name, sanitize_path};
use crate::http::response::{error, not_found, redirect, PATH_ESCAPES};
use crate::http::{Handler, Request, ResponseWriter};

const INDEX_PAGE: &str = "index.html";

/// Serves files below a root directory.
///
/// Any `Content-Type` already present on the response is kept; otherwise the
/// type is guessed from the file extension.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Handler for FileServer {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        if req.method != "GET" && req.method != "HEAD" {
            log::debug!("Rejecting {} {}", req.method, req.path);
            w.headers_mut().set("Allow", "GET, HEAD");
            return error(w, 405, "405 method not allowed");
        }

        let url_path = if req.path.starts_with('/') {
            req.path.clone()
        } else {
            format!("/{}", req.path)
        };
        log::debug!("Received request for path: {}", url_path);

        if url_path.ends_with("/index.html") {
            return redirect(w, req, "./", 301);
        }

        let path = match sanitize_path(&self.root, &url_path) {
            Ok(Some(p)) => p,
            Ok(None) => return not_found(w),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return error(w, 400, "400 bad request");
            }
            Err(e) => return io_error(w, &e),
        };

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => return io_error(w, &e),
        };

        if metadata.is_dir() {
            if !url_path.ends_with('/') {
                return redirect(w, req, &format!("{}/", base_name(&url_path)), 301);
            }
            let index = path.join(INDEX_PAGE);
            return match fs::metadata(&index) {
                Ok(m) if m.is_file() => serve_file(w, req, &index, &m),
                _ => list_directory(w, req, &path),
            };
        }

        if url_path.ends_with('/') {
            return redirect(w, req, &format!("../{}", base_name(&url_path)), 301);
        }

        serve_file(w, req, &path, &metadata)
    }
}

fn io_error(w: &mut dyn ResponseWriter, e: &io::Error) -> io::Result<()> {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => not_found(w),
        io::ErrorKind::PermissionDenied => error(w, 403, "403 Forbidden"),
        _ => {
            log::error!("Failed to serve file: {}", e);
            error(w, 500, "500 Internal Server Error")
        }
    }
}

fn serve_file(
    w: &mut dyn ResponseWriter,
    req: &Request,
    path: &Path,
    metadata: &fs::Metadata,
) -> io::Result<()> {
    if let Ok(modified) = metadata.modified() {
        w.headers_mut()
            .set("Last-Modified", httpdate::fmt_http_date(modified));
        if is_not_modified(req, modified) {
            let headers = w.headers_mut();
            headers.remove("Content-Type");
            headers.remove("Content-Length");
            headers.remove("Content-Encoding");
            w.write_header(304);
            return Ok(());
        }
    }

    let content = match fs::read(path) {
        Ok(c) => c,
        Err(e) => return io_error(w, &e),
    };

    if !w.headers().contains("Content-Type") {
        let guessed = from_path(path).first_or_octet_stream();
        let content_type = if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none() {
            format!("{guessed}; charset=utf-8")
        } else {
            guessed.to_string()
        };
        w.headers_mut().set("Content-Type", content_type);
    }
    w.headers_mut().set("Content-Length", content.len().to_string());
    w.write_header(200);

    log::debug!("Serving {} ({} bytes)", path.display(), content.len());
    if !req.is_head() {
        w.write(&content)?;
    }
    Ok(())
}

/// Compares at second precision, the resolution of HTTP dates.
fn is_not_modified(req: &Request, modified: SystemTime) -> bool {
    let Some(since) = req
        .headers
        .get("If-Modified-Since")
        .and_then(|v| httpdate::parse_http_date(v).ok())
    else {
        return false;
    };
    let seconds = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    UNIX_EPOCH + Duration::from_secs(seconds) <= since
}

fn list_directory(w: &mut dyn ResponseWriter, req: &Request, dir: &Path) -> io::Result<()> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    name.push('/');
                }
                name
            })
            .collect(),
        Err(e) => return io_error(w, &e),
    };
    names.sort();

    let mut body =
        String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n");
    for name in &names {
        body.push_str(&format!(
            "<a href=\"{}\">{}</a>\n",
            utf8_percent_encode(name, PATH_ESCAPES),
            escape_html(name)
        ));
    }
    body.push_str("</pre>\n");

    let headers = w.headers_mut();
    headers.remove("Content-Encoding");
    headers.set("Content-Type", "text/html; charset=utf-8");
    headers.set("Content-Length", body.len().to_string());
    w.write_header(200);
    if !req.is_head() {
        w.write(body.as_bytes())?;
    }
    Ok(())
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
