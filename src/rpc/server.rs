//! JSON-RPC over HTTP/1.1. Every `POST` body is one JSON-RPC message, the JSON-RPC outcome travels in the response
//! body and the HTTP status only reports transport problems.

use crate::app_config::AppConfig;
use crate::directory::DirectoryService;
use crate::rpc::dispatch;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

const MAX_LINE_BYTES: usize = 8 * 1024;
const MAX_HEADERS: usize = 64;
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn bind(config: &AppConfig) -> io::Result<TcpListener> {
    let address = format!("{}:{}", config.server().host(), config.server().port());
    info!("🔌 Binding {}...", address);
    let listener = TcpListener::bind(&address).await?;
    info!("🔌 Binding {}... OK", listener.local_addr()?);
    Ok(listener)
}

/// Accepts connections until `shutdown` completes, each connection is served by its own task.
#[instrument(skip_all)]
pub async fn serve<F>(listener: TcpListener, directory: DirectoryService, read_timeout: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let directory = directory.clone();
                    task::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, &directory, read_timeout).await {
                            warn!(peer = %peer, "⚠️ Connection failed: {}", e);
                        }
                    });
                }
                Err(e) => warn!("⚠️ Could not accept connection: {}", e),
            },
            _ = &mut shutdown => {
                info!("🛑 Stopped accepting connections");
                return;
            }
        }
    }
}

#[instrument(skip(stream, directory, read_timeout))]
async fn handle_connection(stream: TcpStream, peer: SocketAddr, directory: &DirectoryService, read_timeout: Duration) -> Result<(), HttpError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let request = match timeout(read_timeout, read_request(&mut reader)).await {
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) => {
                debug!("Connection closed by peer");
                return Ok(());
            }
            Ok(Err(e)) => {
                let response = match e {
                    HttpError::PayloadTooLarge(_) => HttpResponse::status(413, "Payload Too Large"),
                    _ => HttpResponse::status(400, "Bad Request"),
                };
                // The peer may already be gone, the read error is the one worth reporting
                let _ = write_response(&mut writer, &response, false).await;
                return Err(e);
            }
            Err(_) => {
                debug!("⏳ No request within {:?}, closing connection", read_timeout);
                return Ok(());
            }
        };

        let keep_alive = request.keep_alive;
        let response = respond(directory, request).await;
        write_response(&mut writer, &response, keep_alive).await?;

        if !keep_alive {
            return Ok(());
        }
    }
}

async fn respond(directory: &DirectoryService, request: HttpRequest) -> HttpResponse {
    if request.method != "POST" {
        debug!(method = %request.method, path = %request.path, "Rejecting non-POST request");
        return HttpResponse::status(405, "Method Not Allowed");
    }

    match dispatch::handle(directory, &request.body).await {
        Some(response) => match serde_json::to_vec(&response) {
            Ok(body) => HttpResponse::json(body),
            Err(e) => {
                warn!("⚠️ Could not encode response: {}", e);
                HttpResponse::status(500, "Internal Server Error")
            }
        },
        None => HttpResponse::status(204, "No Content"),
    }
}

#[derive(Debug, PartialEq)]
struct HttpRequest {
    method: String,
    path: String,
    keep_alive: bool,
    body: Vec<u8>,
}

/// Reads one request, `None` if the peer closed the connection before sending anything.
async fn read_request<R>(reader: &mut R) -> Result<Option<HttpRequest>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    // Tolerate stray empty lines between pipelined requests
    loop {
        if read_line(reader, &mut line).await? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            break;
        }
    }

    let request_line = line.trim_end().to_string();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(HttpError::Malformed(format!("invalid request line '{}'", request_line)));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed(format!("unsupported version '{}'", version)));
    }

    let mut keep_alive = version != "HTTP/1.0";
    let mut content_length = 0;
    let mut headers = 0;
    loop {
        if read_line(reader, &mut line).await? == 0 {
            return Err(HttpError::Malformed("unexpected end of headers".to_string()));
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }

        headers += 1;
        if headers > MAX_HEADERS {
            return Err(HttpError::Malformed(format!("more than {} headers", MAX_HEADERS)));
        }

        let Some((name, value)) = header.split_once(':') else {
            return Err(HttpError::Malformed(format!("invalid header '{}'", header)));
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => {
                content_length = value
                    .parse::<usize>()
                    .map_err(|_| HttpError::Malformed(format!("invalid content length '{}'", value)))?;
            }
            "connection" => keep_alive = !value.eq_ignore_ascii_case("close") && (keep_alive || value.eq_ignore_ascii_case("keep-alive")),
            "transfer-encoding" => return Err(HttpError::Malformed("chunked bodies are not supported".to_string())),
            _ => {}
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Err(HttpError::PayloadTooLarge(content_length));
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Some(HttpRequest {
        method: method.to_string(),
        path: path.to_string(),
        keep_alive,
        body,
    }))
}

async fn read_line<R>(reader: &mut R, line: &mut String) -> Result<usize, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64);
    let read = limited.read_line(line).await?;

    if read == MAX_LINE_BYTES && !line.ends_with('\n') {
        return Err(HttpError::Malformed(format!("line exceeds {} bytes", MAX_LINE_BYTES)));
    }
    Ok(read)
}

#[derive(Debug)]
struct HttpResponse {
    status: u16,
    reason: &'static str,
    body: Vec<u8>,
}

impl HttpResponse {
    fn json(body: Vec<u8>) -> Self {
        HttpResponse {
            status: 200,
            reason: "OK",
            body,
        }
    }

    fn status(status: u16, reason: &'static str) -> Self {
        HttpResponse {
            status,
            reason,
            body: Vec::new(),
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &HttpResponse, keep_alive: bool) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, response.reason);
    match response.status {
        204 => {}
        405 => head.push_str("Allow: POST\r\nContent-Length: 0\r\n"),
        _ if response.body.is_empty() => head.push_str("Content-Length: 0\r\n"),
        _ => head.push_str(&format!("Content-Type: application/json\r\nContent-Length: {}\r\n", response.body.len())),
    }
    head.push_str(if keep_alive { "Connection: keep-alive\r\n\r\n" } else { "Connection: close\r\n\r\n" });

    writer.write_all(head.as_bytes()).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("request body of {0} bytes exceeds the limit of {max} bytes", max = MAX_BODY_BYTES)]
    PayloadTooLarge(usize),
}
