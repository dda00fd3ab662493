//! HTTP server exposing the cache
//!
//! Each connection carries a single `GET` request and is closed after the
//! response. Bodies are built in memory and sent with a `Content-Length`.

use async_std::io::{BufReader, WriteExt};
use async_std::net::{TcpListener, TcpStream};
use async_std::prelude::*;
use async_std::sync::Arc;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write as _;

use crate::config::{Config, IndexKeys};
use crate::error::{Error, Result};
use crate::index::cache::Cache;
use crate::render::write_mbox;
use crate::routes::Route;
use crate::types::MatchKind;

/// Characters kept as-is in generated links
const LINK_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_');

/// HTTP front end over a shared [`Cache`]
#[derive(Clone)]
pub struct HttpServer {
    cache: Cache,
    config: Arc<Config>,
}

impl HttpServer {
    pub fn new(cache: Cache, config: Arc<Config>) -> Self {
        Self { cache, config }
    }

    /// Start the HTTP server on the specified address
    pub async fn listen(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("HTTP server listening on {}", addr);
        self.listen_on(listener).await
    }

    /// Listen on an existing TcpListener (useful for testing)
    pub async fn listen_on(&self, listener: TcpListener) -> Result<()> {
        let mut incoming = listener.incoming();
        while let Some(stream) = incoming.next().await {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let connection = Connection {
                cache: self.cache.clone(),
                config: Arc::clone(&self.config),
            };

            async_std::task::spawn(async move {
                if let Err(e) = connection.handle(stream).await {
                    log::error!("Connection error: {}", e);
                }
            });
        }

        Ok(())
    }
}

/// A response before serialization
#[derive(Debug)]
struct Response {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Response {
    fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body: body.into(),
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body.into())
    }

    fn redirect(location: String) -> Self {
        let mut response = Self::text(307, format!("Moved to {}\n", location));
        response.headers.push(("Location", location));
        response
    }

    fn from_error(err: &Error) -> Self {
        match err {
            Error::Redirect(location) => Self::redirect(location.clone()),
            Error::InvalidSelector(_) | Error::InvalidRequest(_) => {
                Self::text(400, format!("{}\n", err))
            }
            Error::UnknownIndex(_) | Error::NotFound(_) => Self::text(404, "Not found\n"),
            _ => Self::text(500, "Internal error\n"),
        }
    }

    async fn write_to(&self, stream: &mut TcpStream) -> Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (name, value) in &self.headers {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
        let _ = write!(
            head,
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        );

        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&self.body).await?;
        stream.flush().await?;
        Ok(())
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

/// One client connection
struct Connection {
    cache: Cache,
    config: Arc<Config>,
}

impl Connection {
    async fn handle(&self, stream: TcpStream) -> Result<()> {
        let mut stream = stream;

        let reader = BufReader::new(stream.clone());
        let mut lines = reader.lines();

        let request_line = match lines.next().await {
            Some(line) => line?,
            None => return Ok(()),
        };
        // Drain headers; none of them affect the response.
        while let Some(line) = lines.next().await {
            if line?.trim().is_empty() {
                break;
            }
        }

        log::debug!("Client: {}", request_line);

        let response = self.respond(&request_line).await;
        log::debug!("Server: {} for {}", response.status, request_line);

        response.write_to(&mut stream).await
    }

    async fn respond(&self, request_line: &str) -> Response {
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Response::text(400, "Malformed request line\n");
        };

        if method != "GET" {
            let mut response = Response::text(405, "Only GET is supported\n");
            response.headers.push(("Allow", "GET".to_string()));
            return response;
        }

        let path = target.split('?').next().unwrap_or(target);

        match self.route(path).await {
            Ok(response) => response,
            Err(e) => {
                if !e.is_request_error() {
                    log::error!("{}: {}", path, e);
                } else {
                    log::info!("{}: {}", path, e);
                }
                Response::from_error(&e)
            }
        }
    }

    async fn route(&self, path: &str) -> Result<Response> {
        match Route::parse(path, &self.config.keys)? {
            Route::Help => Ok(Response::text(200, help_text(&self.config.keys))),
            Route::Redirect(location) => Err(Error::Redirect(location)),
            Route::List(index) => {
                let keys = self.cache.list_keys(&index).await?;
                if keys.is_empty() {
                    return Err(Error::NotFound(index));
                }
                Ok(Response::new(
                    200,
                    "text/html; charset=utf-8",
                    list_page(&index, &keys),
                ))
            }
            Route::Query(query) => {
                let files = self.cache.query(query).await?;
                if files.is_empty() {
                    return Err(Error::NotFound(path.to_string()));
                }

                let mut body = Vec::new();
                write_mbox(&mut body, &self.config.agent, &files).await?;
                Ok(Response::new(200, "text/plain; charset=utf-8", body))
            }
        }
    }
}

/// Usage listing generated from the configured indexes.
pub fn help_text(keys: &IndexKeys) -> String {
    let mut help = String::from("Perso - Maildir to HTTP daemon\n\nAvailable URLs:\n");

    for (name, kind) in keys.iter() {
        let base = match kind {
            MatchKind::CatchAll => String::new(),
            MatchKind::Address => format!("/{}/EMAIL-ADDRESS", name),
            MatchKind::Substring => format!("/{}/PARTIAL-HEADER-VALUE", name),
            MatchKind::Normal => format!("/{}/FULL-HEADER-VALUE", name),
        };
        if kind != MatchKind::CatchAll {
            let _ = writeln!(help, "  /{}", name);
        }
        let _ = writeln!(help, "  {}/latest/N", base);
        let _ = writeln!(help, "  {}/oldest/N", base);
    }

    help.push_str(
        "\nN can be a number (\"0\", \"135\"), an inclusive range (\"1-5\") \
         or a start with a count (\"6,3\": three messages from the sixth).\n",
    );
    help
}

fn list_page(index: &str, values: &[String]) -> String {
    let mut page = String::from("<!DOCTYPE html>\n<html>\n<head>\n<title>");
    let _ = write!(page, "Perso - List for {}", escape_html(index));
    page.push_str("</title>\n</head>\n<body>\n<ul>\n");

    for value in values {
        let _ = writeln!(
            page,
            r#"<li><a href="/{}/{}/latest/0">{}</a></li>"#,
            utf8_percent_encode(index, LINK_SET),
            utf8_percent_encode(value, LINK_SET),
            escape_html(value)
        );
    }

    page.push_str("</ul>\n</body>\n</html>\n");
    page
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
