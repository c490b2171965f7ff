//! Loopback HTTP server capturing ingest requests.
//!
//! Each accepted connection carries exactly one request. The server records
//! it, answers with the next scripted status, closes the connection, and
//! forwards the capture over a channel.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// One request as seen by the server.
#[derive(Debug, Default)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    /// Value of the first header named `name` (lowercase).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v.as_str()))
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }

    fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|len| len.parse().ok())
            .unwrap_or(0)
    }
}

fn capture(stream: &TcpStream) -> std::io::Result<CapturedRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut reader = BufReader::new(stream);
    let mut request = CapturedRequest::default();
    let mut line = String::new();

    reader.read_line(&mut line)?;
    if let Some((method, rest)) = line.trim_end().split_once(' ') {
        request.method = method.to_owned();
        request.path = rest.split(' ').next().unwrap_or_default().to_owned();
    }
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            request
                .headers
                .push((name.trim().to_ascii_lowercase(), value.trim().to_owned()));
        }
    }

    let mut body = vec![0u8; request.content_length()];
    reader.read_exact(&mut body)?;
    request.body = String::from_utf8_lossy(&body).into_owned();
    Ok(request)
}

/// Serve one connection per entry in `statuses`, answering in order.
pub fn spawn_scripted_server(
    listener: TcpListener,
    statuses: Vec<u16>,
) -> (SocketAddr, mpsc::Receiver<CapturedRequest>) {
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for status in statuses {
            let Ok((mut stream, _)) = listener.accept() else {
                break;
            };
            let request = capture(&stream).unwrap_or_default();
            let reason = if (200..300).contains(&status) { "OK" } else { "Scripted" };
            let _ = write!(
                stream,
                "HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            let _ = tx.send(request);
        }
    });

    (addr, rx)
}

/// An address nothing listens on.
pub fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    listener.local_addr().expect("listener has address")
}
