//! Download bridge and album directory.
//!
//! The album is a plain directory. Saving media means copying a local file
//! into it under a fresh name, after downloading it first when the source
//! is an `http(s)` URL:
//!
//! ```text
//! https://cdn/.../video.mp4 ──download──▶ <temp>/unmark-downloads/dl-….mp4
//!                                                │
//!                                                ▼ copy
//!                                  <album>/VID_<millis>_<rand>.mp4
//! ```
//!
//! Progress is reported as whole percentages, 0 to 100. A permission problem
//! on the album directory is reported as [`AlbumError::PermissionDenied`],
//! separately from every other failure, so the caller can tell the user to
//! fix the directory rather than retry.

use crate::types::{file_extension, is_video_name};
use rand::Rng;
use reqwest::blocking::Client;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlbumError {
    #[error("Download failed with HTTP status {0}")]
    Status(u16),
    #[error("Download failed: {0}")]
    Network(String),
    #[error("Download timed out")]
    Timeout,
    #[error("Permission denied writing to {0}; check the album directory permissions")]
    PermissionDenied(PathBuf),
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for AlbumError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AlbumError::Timeout
        } else {
            AlbumError::Network(e.to_string())
        }
    }
}

/// A batch save that stopped early. Files in `saved` stay in the album.
#[derive(Error, Debug)]
#[error("Saving {failed} failed after {count} saved: {error}", count = .saved.len())]
pub struct BatchError {
    pub saved: Vec<PathBuf>,
    pub failed: String,
    #[source]
    pub error: AlbumError,
}

/// Whether `source` must be downloaded before it can be saved.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn unique_name(prefix: &str, ext: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{prefix}_{millis}_{suffix:06}.{ext}")
}

/// Percentage for `done` of `total`, rounded.
fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Stream `url` into a new file in `dest_dir`.
///
/// When the server sends `Content-Length`, `on_progress` gets each new
/// percentage as chunks arrive; it always gets 100 once the file is complete.
pub fn download(
    client: &Client,
    url: &str,
    dest_dir: &Path,
    on_progress: &mut dyn FnMut(u8),
) -> Result<PathBuf, AlbumError> {
    let mut response = client.get(url).send()?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(AlbumError::Status(status));
    }

    fs::create_dir_all(dest_dir)?;
    let ext = file_extension(url).unwrap_or("bin");
    let path = dest_dir.join(unique_name("dl", ext));
    let total = response.content_length();
    let received = stream_to_file(&mut response, total, &path, on_progress)?;

    tracing::debug!(%url, bytes = received, path = %path.display(), "downloaded");
    Ok(path)
}

/// Write `body` to a new file at `path`, reporting progress against `total`.
///
/// On any failure the partial file is removed.
fn stream_to_file(
    body: &mut impl Read,
    total: Option<u64>,
    path: &Path,
    on_progress: &mut dyn FnMut(u8),
) -> Result<u64, AlbumError> {
    let result = fs::File::create(path)
        .map_err(AlbumError::from)
        .and_then(|file| copy_body(body, io::BufWriter::new(file), total, on_progress));
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn copy_body(
    body: &mut impl Read,
    mut out: impl Write,
    total: Option<u64>,
    on_progress: &mut dyn FnMut(u8),
) -> Result<u64, AlbumError> {
    let mut received = 0u64;
    let mut last = None;
    let mut chunk = [0u8; 16 * 1024];
    loop {
        let n = match body.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(AlbumError::Network(e.to_string())),
        };
        out.write_all(&chunk[..n])?;
        received += n as u64;
        if let Some(total) = total {
            let p = percent(received, total);
            if last != Some(p) {
                on_progress(p);
                last = Some(p);
            }
        }
    }
    out.flush()?;
    if last != Some(100) {
        on_progress(100);
    }
    Ok(received)
}

/// The album directory plus the client used to fetch remote media.
pub struct Album {
    dir: PathBuf,
    staging: PathBuf,
    client: Client,
}

impl Album {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, AlbumError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            dir: dir.into(),
            staging: std::env::temp_dir().join("unmark-downloads"),
            client,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the album directory exists (or can be created) and is writable.
    pub fn check_permission(&self) -> bool {
        if fs::create_dir_all(&self.dir).is_err() {
            return false;
        }
        let probe = self.dir.join(".unmark-write-probe");
        let writable = fs::write(&probe, b"").is_ok();
        let _ = fs::remove_file(&probe);
        writable
    }

    pub fn save_image(&self, source: &str) -> Result<PathBuf, AlbumError> {
        self.save(source, "IMG", "jpg", &mut |_| {})
    }

    pub fn save_video(
        &self,
        source: &str,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<PathBuf, AlbumError> {
        self.save(source, "VID", "mp4", on_progress)
    }

    /// Save either kind, choosing by the source's extension.
    pub fn save_any(
        &self,
        source: &str,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<PathBuf, AlbumError> {
        if is_video_name(source) {
            self.save_video(source, on_progress)
        } else {
            self.save_image(source)
        }
    }

    /// Save images one at a time, stopping at the first failure.
    ///
    /// `on_progress` gets the rounded share of completed items after each one.
    pub fn save_images(
        &self,
        sources: &[String],
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<Vec<PathBuf>, BatchError> {
        let total = sources.len() as u64;
        let mut saved = Vec::with_capacity(sources.len());
        for source in sources {
            match self.save_image(source) {
                Ok(path) => saved.push(path),
                Err(error) => {
                    tracing::warn!(%source, saved = saved.len(), error = %error, "batch save stopped");
                    return Err(BatchError {
                        saved,
                        failed: source.clone(),
                        error,
                    });
                }
            }
            on_progress(percent(saved.len() as u64, total));
        }
        Ok(saved)
    }

    fn save(
        &self,
        source: &str,
        prefix: &str,
        default_ext: &str,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<PathBuf, AlbumError> {
        if is_remote(source) {
            let local = download(&self.client, source, &self.staging, on_progress)?;
            let result = self.import(&local, prefix, default_ext);
            let _ = fs::remove_file(&local);
            result
        } else {
            let local = Path::new(source);
            if !local.is_file() {
                return Err(AlbumError::SourceMissing(local.to_path_buf()));
            }
            self.import(local, prefix, default_ext)
        }
    }

    /// Copy a local file into the album under a fresh name.
    fn import(&self, local: &Path, prefix: &str, default_ext: &str) -> Result<PathBuf, AlbumError> {
        let denied = |e: io::Error| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                AlbumError::PermissionDenied(self.dir.clone())
            } else {
                AlbumError::Io(e)
            }
        };
        fs::create_dir_all(&self.dir).map_err(denied)?;

        let name = local.to_string_lossy();
        let ext = file_extension(&name)
            .filter(|e| *e != "bin")
            .unwrap_or(default_ext)
            .to_ascii_lowercase();
        let dest = self.dir.join(unique_name(prefix, &ext));
        fs::copy(local, &dest).map_err(denied)?;

        tracing::info!(path = %dest.display(), "saved to album");
        Ok(dest)
    }
}
