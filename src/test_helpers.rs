//! Shared test utilities for the unmark test suite.
//!
//! Provides deterministic clocks for the history ledger, ready-made ledger
//! entries, synthetic striped images whose rows can be told apart after a
//! band has been cut out, and a one-shot local HTTP stub.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let src = striped_image(4, 10);
//! assert_eq!(*src.get_pixel(0, 3), row_color(3));
//!
//! let ledger = Ledger::with_clock(&store, StepClock::starting_at(1_000));
//! ledger.add(new_image_entry("out.png")).unwrap();
//! ```

use std::cell::Cell;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread::JoinHandle;

use image::{Rgba, RgbaImage};

use crate::history::Clock;
use crate::platform::PlatformTag;
use crate::types::{MediaKind, NewEntry, RecordKind};

// =========================================================================
// Clocks
// =========================================================================

/// Clock that returns `start`, `start + step`, `start + 2*step`, ...
pub struct StepClock {
    next: Cell<i64>,
    step: i64,
}

impl StepClock {
    /// Advances by one millisecond per reading.
    pub fn starting_at(start: i64) -> Self {
        Self {
            next: Cell::new(start),
            step: 1,
        }
    }

    /// Always returns the same instant.
    pub fn frozen_at(at: i64) -> Self {
        Self {
            next: Cell::new(at),
            step: 0,
        }
    }
}

impl Clock for StepClock {
    fn now_millis(&self) -> i64 {
        let now = self.next.get();
        self.next.set(now + self.step);
        now
    }
}

// =========================================================================
// Ledger entries
// =========================================================================

/// A local-crop entry pointing at `path`.
pub fn new_image_entry(path: &str) -> NewEntry {
    NewEntry {
        kind: RecordKind::FromImage,
        media_type: MediaKind::Image,
        source_url: None,
        platform: None,
        title: Some("本地图片去水印".to_string()),
        author: None,
        result_urls: vec![path.to_string()],
        cover_url: Some(path.to_string()),
        saved_to_album: false,
    }
}

/// A parsed-link entry for a Douyin video at `url`.
pub fn new_url_entry(url: &str) -> NewEntry {
    NewEntry {
        kind: RecordKind::FromUrl,
        media_type: MediaKind::Video,
        source_url: Some(url.to_string()),
        platform: Some(PlatformTag::Douyin),
        title: Some("test video".to_string()),
        author: Some("tester".to_string()),
        result_urls: vec![format!("{url}/video.mp4")],
        cover_url: Some(format!("{url}/cover.jpg")),
        saved_to_album: false,
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

/// A colour unique to row `y` (for any image under 65536 rows).
pub fn row_color(y: u32) -> Rgba<u8> {
    Rgba([(y & 0xff) as u8, ((y >> 8) & 0xff) as u8, 0x80, 0xff])
}

/// Image where every pixel of row `y` is [`row_color`]`(y)`.
pub fn striped_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, y| row_color(y))
}

/// Write a striped PNG to `path`.
pub fn write_striped_png(path: &Path, width: u32, height: u32) {
    striped_image(width, height).save(path).unwrap();
}

/// Write a striped JPEG to `path`. Colours are lossy; only the size is exact.
pub fn write_striped_jpeg(path: &Path, width: u32, height: u32) {
    let rgb = image::DynamicImage::ImageRgba8(striped_image(width, height)).to_rgb8();
    rgb.save(path).unwrap();
}

// =========================================================================
// HTTP stub
// =========================================================================

/// Serve `responses` on a local port, one connection per response, in order.
///
/// Returns the base URL and a handle yielding the raw requests received.
/// Join the handle only after every response has been requested.
pub fn serve_sequence(responses: Vec<(u16, Vec<u8>)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request(&mut stream));
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reason_phrase(status),
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
            stream.flush().unwrap();
        }
        requests
    });
    (base, handle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// Read one request: headers, then `Content-Length` bytes of body.
fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let body_len = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}
