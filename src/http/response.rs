use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io::{self, Write};
use std::time::SystemTime;

use super::{Headers, Request};

pub const STATUS_OK: u16 = 200;

/// Bytes escaped when a decoded path is put back into a URL.
pub const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The outgoing half of an exchange.
///
/// Headers may be changed until the status is committed, either explicitly
/// through [`ResponseWriter::write_header`] or implicitly (as 200) by the first
/// [`ResponseWriter::write`]. Header changes after that point have no effect
/// on the wire.
pub trait ResponseWriter {
    fn headers(&self) -> &Headers;
    fn headers_mut(&mut self) -> &mut Headers;
    fn write_header(&mut self, status: u16);
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// Writes a plain-text error reply.
///
/// Upstream stages may already have annotated the response for an asset;
/// those annotations do not describe this body, so they are dropped.
pub fn error(w: &mut dyn ResponseWriter, status: u16, message: &str) -> io::Result<()> {
    let body = format!("{message}\n");
    let headers = w.headers_mut();
    headers.remove("Content-Encoding");
    headers.remove("Last-Modified");
    headers.set("Content-Type", "text/plain; charset=utf-8");
    headers.set("X-Content-Type-Options", "nosniff");
    headers.set("Content-Length", body.len().to_string());
    w.write_header(status);
    w.write(body.as_bytes())?;
    Ok(())
}

pub fn not_found(w: &mut dyn ResponseWriter) -> io::Result<()> {
    error(w, 404, "404 page not found")
}

/// Replies with a redirect to the decoded path `location`, carrying the
/// request's query along.
pub fn redirect(
    w: &mut dyn ResponseWriter,
    req: &Request,
    location: &str,
    status: u16,
) -> io::Result<()> {
    let location = utf8_percent_encode(location, PATH_ESCAPES);
    let location = match &req.query {
        Some(query) => format!("{location}?{query}"),
        None => location.to_string(),
    };
    let headers = w.headers_mut();
    headers.remove("Content-Encoding");
    headers.set("Location", location);
    headers.set("Content-Length", "0");
    w.write_header(status);
    Ok(())
}

/// Serializes a response onto a byte stream.
///
/// The status line and headers are held back until the first body write (or
/// [`StreamWriter::finish`]) so stages can keep editing headers until then.
pub struct StreamWriter<W: Write> {
    inner: W,
    headers: Headers,
    status: Option<u16>,
    head_sent: bool,
    head_only: bool,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            headers: Headers::new(),
            status: None,
            head_sent: false,
            head_only: false,
        }
    }

    /// Drops every body byte, as a reply to `HEAD` requires. Handlers may
    /// write bodies as usual.
    pub fn head_only(mut self, head_only: bool) -> Self {
        self.head_only = head_only;
        self
    }

    fn send_head(&mut self) -> io::Result<()> {
        let status = *self.status.get_or_insert(STATUS_OK);
        if !self.headers.contains("Date") {
            self.headers.set("Date", httpdate::fmt_http_date(SystemTime::now()));
        }
        self.headers.set("Connection", "close");

        let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
        for (name, value) in self.headers.iter() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        self.head_sent = true;
        self.inner.write_all(head.as_bytes())
    }

    /// Sends the head if nothing was written yet and flushes the stream.
    pub fn finish(mut self) -> io::Result<()> {
        if !self.head_sent {
            self.send_head()?;
        }
        self.inner.flush()
    }
}

impl<W: Write> ResponseWriter for StreamWriter<W> {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) {
        if self.status.is_some() {
            debug!("Ignoring superfluous status {}", status);
            return;
        }
        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.head_sent {
            self.send_head()?;
        }
        if !self.head_only {
            self.inner.write_all(buf)?;
        }
        Ok(buf.len())
    }
}

/// In-memory response channel with the same commit rules as [`StreamWriter`].
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: Headers,
    /// Header snapshot taken when the status was committed.
    committed: Option<(u16, Headers)>,
    pub body: Vec<u8>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed status, 200 when nothing was committed.
    pub fn status(&self) -> u16 {
        self.committed.as_ref().map_or(STATUS_OK, |(status, _)| *status)
    }

    /// Headers as they stood when the status was committed.
    pub fn header(&self, name: &str) -> Option<&str> {
        match &self.committed {
            Some((_, snapshot)) => snapshot.get(name),
            None => self.headers.get(name),
        }
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) {
        if self.committed.is_none() {
            self.committed = Some((status, self.headers.clone()));
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.committed.is_none() {
            self.write_header(STATUS_OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_writer_defers_head_until_body() {
        let mut out = Vec::new();
        {
            let mut w = StreamWriter::new(&mut out);
            w.headers_mut().set("Content-Type", "application/wasm");
            w.write_header(404);
            w.write_header(500);
            w.write(b"gone").unwrap();
            w.finish().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Type: application/wasm\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\ngone"));
    }

    #[test]
    fn stream_writer_finish_commits_ok() {
        let mut out = Vec::new();
        StreamWriter::new(&mut out).finish().unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Date: "));
    }

    #[test]
    fn error_drops_asset_annotations() {
        let mut rec = ResponseRecorder::new();
        rec.headers_mut().set("Content-Encoding", "br");
        rec.headers_mut().set("Content-Type", "application/wasm");
        not_found(&mut rec).unwrap();

        assert_eq!(rec.status(), 404);
        assert_eq!(rec.header("Content-Encoding"), None);
        assert_eq!(rec.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(rec.body_str(), "404 page not found\n");
    }

    #[test]
    fn head_only_writer_sends_no_body() {
        let mut out = Vec::new();
        {
            let mut w = StreamWriter::new(&mut out).head_only(true);
            not_found(&mut w).unwrap();
            w.finish().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 19\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn redirect_escapes_decoded_location() {
        let mut rec = ResponseRecorder::new();
        let req = Request::get("/my%20game?v=1");
        redirect(&mut rec, &req, "/my game/", 301).unwrap();
        assert_eq!(rec.header("Location"), Some("/my%20game/?v=1"));
    }

    #[test]
    fn redirect_keeps_query() {
        let mut rec = ResponseRecorder::new();
        let req = Request::get("/base?lang=en");
        redirect(&mut rec, &req, "/base/", 301).unwrap();
        assert_eq!(rec.status(), 301);
        assert_eq!(rec.header("Location"), Some("/base/?lang=en"));
    }
}
