//! Minimal scripted HTTP server for exercising network code in tests.
//!
//! No mocking crate is pulled in for this: the handful of canned responses the
//! tests need fits in a plain `TcpListener` loop.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

pub struct TestServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl TestServer {
    /// Total requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Add or replace a route (only meaningful for route-mode servers).
    pub fn set_route(&self, path: &str, body: Vec<u8>) {
        self.routes.lock().unwrap().insert(path.to_string(), body);
    }
}

/// Serve a fixed sequence of `(status, body)` responses, one per request,
/// repeating the last entry once the script is exhausted.
pub fn serve_script(script: Vec<(u16, Vec<u8>)>) -> TestServer {
    assert!(!script.is_empty(), "script must contain at least one response");
    let hits = Arc::new(AtomicUsize::new(0));
    let routes = Arc::new(Mutex::new(HashMap::new()));

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let thread_hits = Arc::clone(&hits);
    thread::spawn(move || {
        let mut served = 0usize;
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            if read_request_path(&stream).is_none() {
                continue;
            }
            thread_hits.fetch_add(1, Ordering::SeqCst);
            let (status, body) = &script[served.min(script.len() - 1)];
            served += 1;
            respond(&stream, *status, body);
        }
    });

    TestServer {
        base_url,
        hits,
        routes,
    }
}

/// Serve a path → body map with 200 responses; unknown paths get a 404.
pub fn serve_routes(routes: impl IntoIterator<Item = (String, Vec<u8>)>) -> TestServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let routes = Arc::new(Mutex::new(routes.into_iter().collect::<HashMap<_, _>>()));

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let thread_hits = Arc::clone(&hits);
    let thread_routes = Arc::clone(&routes);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let Some(path) = read_request_path(&stream) else {
                continue;
            };
            thread_hits.fetch_add(1, Ordering::SeqCst);
            let body = thread_routes.lock().unwrap().get(&path).cloned();
            match body {
                Some(body) => respond(&stream, 200, &body),
                None => respond(&stream, 404, b""),
            }
        }
    });

    TestServer {
        base_url,
        hits,
        routes,
    }
}

fn read_request_path(stream: &TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let path = request_line.split_whitespace().nth(1)?.to_string();

    // Drain headers; the tests only ever issue bodyless GETs.
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) => break,
            Ok(_) if header == "\r\n" || header == "\n" => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    Some(path)
}

fn respond(mut stream: &TcpStream, status: u16, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Error",
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}
