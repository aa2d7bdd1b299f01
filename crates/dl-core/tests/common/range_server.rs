//! Minimal HTTP/1.1 server with HEAD and Range GET support for integration tests.
//!
//! Serves a single static body on every path, one request per connection.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// GET ignores Range and always answers 200 with the full body.
    pub ignore_ranges: bool,
    /// Advertise `Accept-Ranges: none` on HEAD.
    pub refuse_ranges: bool,
    /// Omit Content-Length (body delimited by connection close).
    pub hide_length: bool,
    /// Answer HEAD with this status instead of 200.
    pub head_status: Option<u16>,
    pub content_disposition: Option<String>,
}

/// Handle to a running server; the listener thread lives until process exit.
pub struct RangeServer {
    pub base_url: String,
    log: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl RangeServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `(method, Range header)` of every request seen so far.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.log.lock().unwrap().clone()
    }
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with(body, ServerOptions::default())
}

pub fn start_with(body: Vec<u8>, opts: ServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    let log = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            let log = Arc::clone(&server_log);
            thread::spawn(move || handle(stream, &body, &opts, &log));
        }
    });
    RangeServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        log,
    }
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(0) | Err(_) => return None,
            Ok(_) => buf.push(byte[0]),
        }
        if buf.len() > 16 * 1024 {
            return None;
        }
    }
    String::from_utf8(buf).ok()
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: &ServerOptions,
    log: &Mutex<Vec<(String, Option<String>)>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_head(&mut stream) else {
        return;
    };
    let method = request
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    let range_header = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("range")
            .then(|| value.trim().to_string())
    });
    log.lock()
        .unwrap()
        .push((method.clone(), range_header.clone()));

    let total = body.len();
    let mut extra = String::from("Connection: close\r\n");
    if let Some(cd) = &opts.content_disposition {
        extra.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }

    if method == "HEAD" {
        let status = opts.head_status.unwrap_or(200);
        if status == 200 {
            if !opts.hide_length {
                extra.push_str(&format!("Content-Length: {}\r\n", total));
            }
            let ranges = if opts.refuse_ranges { "none" } else { "bytes" };
            extra.push_str(&format!("Accept-Ranges: {}\r\n", ranges));
        } else {
            extra.push_str("Content-Length: 0\r\n");
        }
        let _ = write!(stream, "HTTP/1.1 {} X\r\n{}\r\n", status, extra);
        return;
    }
    if method != "GET" {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let range = range_header
        .as_deref()
        .filter(|_| !opts.ignore_ranges)
        .and_then(parse_range);
    let (status, slice) = match range {
        Some((first, last)) if first < total => {
            let end = (last + 1).min(total);
            extra.push_str(&format!(
                "Content-Range: bytes {}-{}/{}\r\n",
                first,
                end - 1,
                total
            ));
            ("206 Partial Content", &body[first..end])
        }
        Some(_) => {
            extra.push_str(&format!("Content-Range: bytes */{}\r\n", total));
            ("416 Range Not Satisfiable", &body[0..0])
        }
        None => ("200 OK", body),
    };
    if !opts.hide_length {
        extra.push_str(&format!("Content-Length: {}\r\n", slice.len()));
    }
    let _ = write!(stream, "HTTP/1.1 {}\r\n{}\r\n", status, extra);
    let _ = stream.write_all(slice);
}

/// `bytes=a-b` → inclusive `(a, b)`; `bytes=a-` runs to the end.
fn parse_range(value: &str) -> Option<(usize, usize)> {
    let spec = value.strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let first = a.trim().parse().ok()?;
    let last = match b.trim() {
        "" => usize::MAX - 1,
        s => s.parse().ok()?,
    };
    (first <= last).then_some((first, last))
}
