//! Minimal HTTP/1.1 server for tests that exercise real client code.
//!
//! Answers each connection once from a fixed route table and closes it.
//! Unknown paths get a 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

/// Raw response text
pub fn response(status: u16, reason: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body));
    out
}

pub fn html(status: u16, reason: &str, body: &str) -> String {
    response(status, reason, &[("Content-Type", "text/html")], body)
}

pub fn redirect(location: &str) -> String {
    response(302, "Found", &[("Location", location)], "")
}

/// Serve the routes built by `routes` (which receives the base URL) on an
/// ephemeral port. Returns the base URL, e.g. `http://127.0.0.1:40123`.
pub fn serve<F>(routes: F) -> String
where
    F: FnOnce(&str) -> Vec<(&'static str, String)>,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let routes: HashMap<&'static str, String> = routes(&base).into_iter().collect();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let path = read_request_path(&mut stream);
            let reply = routes
                .get(path.as_str())
                .cloned()
                .unwrap_or_else(|| html(404, "Not Found", "missing"));
            let _ = stream.write_all(reply.as_bytes());
            let _ = stream.flush();
        }
    });

    base
}

/// Path of the request line without the query, after draining headers and body
fn read_request_path(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break buf.len(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end.min(buf.len())]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body_read = buf.len().saturating_sub(header_end);
    while body_read < content_length {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => body_read += n,
        }
    }

    head.split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string()
}
