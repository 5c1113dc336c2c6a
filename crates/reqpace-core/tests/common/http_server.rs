//! Minimal HTTP/1.1 server for transport integration tests.
//!
//! Routes:
//! - `/ok`             200 with body `hello`
//! - `/echo`           200 echoing the request's Content-Type line and body
//! - `/flaky`          503 on the first request, 200 `recovered` afterwards
//! - `/slow`           200 `late` after 2.5 seconds
//! - `/hang`           reads the request and never answers
//! - anything else     404

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Starts a server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345"). The server runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let flaky_hits = Arc::new(AtomicUsize::new(0));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let hits = Arc::clone(&flaky_hits);
            thread::spawn(move || handle(stream, &hits));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

struct RawRequest {
    path: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Option<RawRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let mut content_length = 0usize;
    let mut content_type = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
            }
            if name.eq_ignore_ascii_case("expect") {
                let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
            }
        }
    }
    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some(RawRequest {
        path,
        content_type,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nX-Test: a:b\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn handle(mut stream: TcpStream, flaky_hits: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    match request.path.as_str() {
        "/ok" => respond(&mut stream, "200 OK", b"hello"),
        "/echo" => {
            let mut body = format!(
                "content-type={}\n",
                request.content_type.unwrap_or_default()
            )
            .into_bytes();
            body.extend_from_slice(&request.body);
            respond(&mut stream, "200 OK", &body);
        }
        "/flaky" => {
            if flaky_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                respond(&mut stream, "503 Service Unavailable", b"busy");
            } else {
                respond(&mut stream, "200 OK", b"recovered");
            }
        }
        "/slow" => {
            thread::sleep(Duration::from_millis(2500));
            respond(&mut stream, "200 OK", b"late");
        }
        "/hang" => thread::sleep(Duration::from_secs(30)),
        _ => respond(&mut stream, "404 Not Found", b"not found"),
    }
}
