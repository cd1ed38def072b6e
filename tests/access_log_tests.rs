use log::{LevelFilter, Log, Metadata, Record};
use rstest::rstest;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use unisrv::http::{handler_fn, Handler, Request, ResponseRecorder, ResponseWriter};
use unisrv::logging::ACCESS_TARGET;
use unisrv::middleware::{AccessLog, Pipeline, StatusRecorder, StatusState};

static ACCESS_LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct Capture;

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == ACCESS_TARGET
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            ACCESS_LINES.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;

fn capture_access_log() {
    if log::set_logger(&CAPTURE).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Access lines mentioning `target`; each test uses its own target.
fn lines_for(target: &str) -> Vec<String> {
    let needle = format!(" {target} ");
    ACCESS_LINES
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(&needle))
        .cloned()
        .collect()
}

#[rstest]
fn body_without_status_records_200() {
    let mut inner = ResponseRecorder::new();
    let mut recorder = StatusRecorder::new(&mut inner);
    recorder.write(b"hello").unwrap();

    assert_eq!(recorder.state(), StatusState::Committed(200));
    assert_eq!(recorder.status(), 200);
    assert_eq!(inner.status(), 200);
    assert_eq!(inner.body_str(), "hello");
}

#[rstest]
#[case(404)]
#[case(301)]
#[case(500)]
fn explicit_status_wins_over_later_writes(#[case] status: u16) {
    let mut inner = ResponseRecorder::new();
    let mut recorder = StatusRecorder::new(&mut inner);
    recorder.write_header(status);
    recorder.write_header(200);
    recorder.write(b"body").unwrap();

    assert_eq!(recorder.status(), status);
    assert_eq!(inner.status(), status);
}

#[rstest]
fn untouched_response_reports_200() {
    let mut inner = ResponseRecorder::new();
    let recorder = StatusRecorder::new(&mut inner);
    assert_eq!(recorder.state(), StatusState::Uncommitted);
    assert_eq!(recorder.status(), 200);
}

#[rstest]
fn recorder_passes_headers_through() {
    let mut inner = ResponseRecorder::new();
    let mut recorder = StatusRecorder::new(&mut inner);
    recorder.headers_mut().set("Content-Encoding", "br");
    assert_eq!(recorder.headers().get("Content-Encoding"), Some("br"));
    recorder.write_header(204);
    assert_eq!(inner.header("Content-Encoding"), Some("br"));
}

#[rstest]
fn one_line_per_request() {
    capture_access_log();
    let handler = Pipeline::new().stage(AccessLog).build(handler_fn(|w, _| {
        w.write_header(404);
        Ok(())
    }));

    let req = Request::new("GET", "/logged/once.wasm.br?v=1", "HTTP/1.0");
    handler.serve(&mut ResponseRecorder::new(), &req).unwrap();

    assert_eq!(
        lines_for("/logged/once.wasm.br?v=1"),
        ["\"GET /logged/once.wasm.br?v=1 HTTP/1.0\" - 404"]
    );
}

#[rstest]
fn handler_error_is_logged_and_returned() {
    capture_access_log();
    let handler = Pipeline::new().stage(AccessLog).build(handler_fn(|w, _| {
        w.write(b"partial")?;
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
    }));

    let result = handler.serve(&mut ResponseRecorder::new(), &Request::get("/logged/error"));
    assert!(result.is_err());
    assert_eq!(
        lines_for("/logged/error"),
        ["\"GET /logged/error HTTP/1.1\" - 200"]
    );
}

#[rstest]
fn panic_is_logged_then_propagated() {
    capture_access_log();
    let handler = Pipeline::new().stage(AccessLog).build(handler_fn(|w, _| {
        w.write_header(503);
        panic!("handler blew up");
    }));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        handler.serve(&mut ResponseRecorder::new(), &Request::get("/logged/panic"))
    }));
    assert!(outcome.is_err());
    assert_eq!(
        lines_for("/logged/panic"),
        ["\"GET /logged/panic HTTP/1.1\" - 503"]
    );
}
