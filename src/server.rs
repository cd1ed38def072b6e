use log::{debug, info, warn};
use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::args::Config;
use crate::handler::new_handler;
use crate::http::response::{error, not_found, redirect};
use crate::http::{BoxHandler, Handler, Request, ResponseWriter, StreamWriter};
use crate::log_error;
use crate::middleware::{AccessLog, Pipeline};

/// Routes requests under `base` to the application.
///
/// `base` without its trailing slash is redirected; any other path is not
/// part of the application and never reaches the access log.
struct Mount {
    base: String,
    app: BoxHandler,
}

impl Handler for Mount {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        if req.path.starts_with(&self.base) {
            return self.app.serve(w, req);
        }
        if self.base != "/" && req.path == self.base.trim_end_matches('/') {
            debug!("Redirecting {} to {}", req.path, self.base);
            return redirect(w, req, &self.base, 301);
        }
        not_found(w)
    }
}

/// The full application for `config`: access log around the request handler,
/// mounted at the configured base.
pub fn app(config: &Config) -> BoxHandler {
    let logged = Pipeline::new()
        .stage(AccessLog)
        .build(new_handler(&config.dir, config.options()));
    Box::new(Mount {
        base: config.base.clone(),
        app: logged,
    })
}

pub struct Server {
    listener: TcpListener,
    config: Config,
    handler: Arc<dyn Handler>,
}

impl Server {
    pub fn bind(config: Config) -> io::Result<Self> {
        let listener = TcpListener::bind(config.addr())?;
        let handler: Arc<dyn Handler> = Arc::from(app(&config));
        Ok(Self {
            listener,
            config,
            handler,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Application URL with the port actually bound.
    pub fn url(&self) -> io::Result<String> {
        Ok(self.config.url(self.local_addr()?.port()))
    }

    /// Accepts connections forever, one thread each.
    pub fn run(self) -> io::Result<()> {
        info!("Serving directory: {}", self.config.dir.display());

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            let handler = Arc::clone(&self.handler);
            let timeouts = (self.config.read_timeout, self.config.write_timeout);

            thread::spawn(move || {
                if let Err(e) = handle_connection(stream, handler.as_ref(), timeouts) {
                    log_error!(e, "Error handling connection");
                }
            });
        }

        Ok(())
    }
}

pub fn start_server(config: Config) -> io::Result<()> {
    let server = Server::bind(config)?;
    println!("server running at: {}", server.url()?);
    server.run()
}

/// A zero duration disables the timeout.
fn timeout(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn handle_connection(
    stream: TcpStream,
    handler: &dyn Handler,
    (read_timeout, write_timeout): (Duration, Duration),
) -> io::Result<()> {
    stream.set_read_timeout(timeout(read_timeout))?;
    stream.set_write_timeout(timeout(write_timeout))?;
    debug!("New connection from {:?}", stream.peer_addr().ok());

    let mut reader = BufReader::new(&stream);
    let request = match Request::read_from(&mut reader) {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!("Connection closed before a request arrived");
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            debug!("Malformed request: {}", e);
            let mut writer = StreamWriter::new(&stream);
            error(&mut writer, 400, "400 Bad Request")?;
            return writer.finish();
        }
        Err(e) => return Err(e),
    };

    let mut writer = StreamWriter::new(&stream).head_only(request.is_head());
    handler.serve(&mut writer, &request)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{handler_fn, ResponseRecorder};

    fn mounted(base: &str) -> Mount {
        Mount {
            base: base.to_string(),
            app: Box::new(handler_fn(|w, _| {
                w.write(b"app")?;
                Ok(())
            })),
        }
    }

    #[test]
    fn mount_redirects_base_without_slash() {
        let mut w = ResponseRecorder::new();
        mounted("/base/")
            .serve(&mut w, &Request::get("/base?x=1"))
            .unwrap();
        assert_eq!(w.status(), 301);
        assert_eq!(w.header("Location"), Some("/base/?x=1"));
    }

    #[test]
    fn mount_rejects_paths_outside_base() {
        let mut w = ResponseRecorder::new();
        mounted("/base/").serve(&mut w, &Request::get("/other")).unwrap();
        assert_eq!(w.status(), 404);
        assert_eq!(w.body_str(), "404 page not found\n");
    }

    #[test]
    fn zero_timeout_means_none() {
        assert_eq!(timeout(Duration::ZERO), None);
        assert_eq!(timeout(Duration::from_secs(5)), Some(Duration::from_secs(5)));
    }
}
