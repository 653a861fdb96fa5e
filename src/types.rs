//! Shared types used across the parse, crop, and history flows.
//!
//! [`HistoryEntry`] is the persisted record shape. Its serialized field names
//! (`type`, `mediaType`, `resultUrls`, ...) are the on-disk layout of the
//! ledger and must stay stable.

use crate::platform::PlatformTag;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a history entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "url")]
    FromUrl,
    #[serde(rename = "image")]
    FromImage,
    #[serde(rename = "video")]
    FromVideo,
}

/// What kind of media an entry (or parse result) points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaKind {
    #[default]
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "images")]
    ImageSet,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::ImageSet => "images",
        }
    }
}

/// A single ledger record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub media_type: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub result_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default)]
    pub saved_to_album: bool,
}

/// An entry as submitted to the ledger, before it is assigned an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub kind: RecordKind,
    pub media_type: MediaKind,
    pub source_url: Option<String>,
    pub platform: Option<PlatformTag>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub result_urls: Vec<String>,
    pub cover_url: Option<String>,
    pub saved_to_album: bool,
}

impl NewEntry {
    pub(crate) fn into_entry(self, id: String, created_at: i64) -> HistoryEntry {
        HistoryEntry {
            id,
            kind: self.kind,
            media_type: self.media_type,
            source_url: self.source_url,
            platform: self.platform,
            title: self.title,
            author: self.author,
            result_urls: self.result_urls,
            cover_url: self.cover_url,
            created_at,
            saved_to_album: self.saved_to_album,
        }
    }
}

/// Partial update merged into an existing entry. `None` fields are left untouched.
///
/// `id` and `created_at` are not updatable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub kind: Option<RecordKind>,
    pub media_type: Option<MediaKind>,
    pub source_url: Option<String>,
    pub platform: Option<PlatformTag>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub result_urls: Option<Vec<String>>,
    pub cover_url: Option<String>,
    pub saved_to_album: Option<bool>,
}

impl EntryUpdate {
    pub fn saved() -> Self {
        Self {
            saved_to_album: Some(true),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, entry: &mut HistoryEntry) {
        if let Some(v) = self.kind {
            entry.kind = v;
        }
        if let Some(v) = self.media_type {
            entry.media_type = v;
        }
        if let Some(v) = self.source_url {
            entry.source_url = Some(v);
        }
        if let Some(v) = self.platform {
            entry.platform = Some(v);
        }
        if let Some(v) = self.title {
            entry.title = Some(v);
        }
        if let Some(v) = self.author {
            entry.author = Some(v);
        }
        if let Some(v) = self.result_urls {
            entry.result_urls = v;
        }
        if let Some(v) = self.cover_url {
            entry.cover_url = Some(v);
        }
        if let Some(v) = self.saved_to_album {
            entry.saved_to_album = v;
        }
    }
}

/// Structured answer from the parse oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub success: bool,
    pub platform: PlatformTag,
    #[serde(default)]
    pub media_type: MediaKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResult {
    /// Direct media URLs in display order: the video, or every image of a set.
    pub fn media_urls(&self) -> Vec<String> {
        match self.media_type {
            MediaKind::Video => self.video_url.iter().cloned().collect(),
            MediaKind::Image | MediaKind::ImageSet => {
                self.image_urls.clone().unwrap_or_default()
            }
        }
    }
}

/// Kind of a locally picked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Image,
    Video,
}

/// A locally picked file, handed explicitly from the picker to the process flow.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedMedia {
    pub kind: LocalKind,
    pub path: PathBuf,
    pub size: u64,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "mkv", "webm"];

/// Whether a file name or URL path ends in a video extension.
pub fn is_video_name(name: &str) -> bool {
    file_extension(name).is_some_and(|e| VIDEO_EXTENSIONS.iter().any(|v| e.eq_ignore_ascii_case(v)))
}

/// Extension of the last path segment, ignoring any URL query or fragment.
pub fn file_extension(name: &str) -> Option<&str> {
    let path = name.split(['?', '#']).next().unwrap_or(name);
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

impl SelectedMedia {
    /// Describe a file on disk, classifying it by extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        let is_video = is_video_name(&path.to_string_lossy());
        Ok(Self {
            kind: if is_video {
                LocalKind::Video
            } else {
                LocalKind::Image
            },
            path: path.to_path_buf(),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_stored_field_names() {
        let entry = HistoryEntry {
            id: "1_abc".into(),
            kind: RecordKind::FromUrl,
            media_type: MediaKind::ImageSet,
            source_url: Some("https://xhslink.com/a".into()),
            platform: Some(PlatformTag::Xiaohongshu),
            title: None,
            author: None,
            result_urls: vec!["https://x/1.jpg".into()],
            cover_url: None,
            created_at: 42,
            saved_to_album: false,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "url");
        assert_eq!(json["mediaType"], "images");
        assert_eq!(json["platform"], "xiaohongshu");
        assert_eq!(json["resultUrls"][0], "https://x/1.jpg");
        assert_eq!(json["createdAt"], 42);
        assert_eq!(json["savedToAlbum"], false);
        assert!(json.get("title").is_none());
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut entry = NewEntry {
            kind: RecordKind::FromImage,
            media_type: MediaKind::Image,
            source_url: None,
            platform: None,
            title: Some("local".into()),
            author: None,
            result_urls: vec!["/tmp/a.png".into()],
            cover_url: Some("/tmp/a.png".into()),
            saved_to_album: false,
        }
        .into_entry("id".into(), 7);
        let before = entry.clone();

        EntryUpdate::saved().apply(&mut entry);

        assert!(entry.saved_to_album);
        assert_eq!(
            HistoryEntry {
                saved_to_album: false,
                ..entry
            },
            before
        );
    }

    #[test]
    fn media_urls_for_video_and_sets() {
        let mut result: ParseResult = serde_json::from_value(serde_json::json!({
            "success": true,
            "platform": "douyin",
            "mediaType": "video",
            "videoUrl": "https://v/1.mp4"
        }))
        .unwrap();
        assert_eq!(result.media_urls(), vec!["https://v/1.mp4".to_string()]);

        result.media_type = MediaKind::ImageSet;
        result.image_urls = Some(vec!["a".into(), "b".into()]);
        assert_eq!(result.media_urls(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn selected_media_classifies_by_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let video = tmp.path().join("clip.MP4");
        let image = tmp.path().join("shot.png");
        std::fs::write(&video, b"v").unwrap();
        std::fs::write(&image, b"img").unwrap();

        assert_eq!(SelectedMedia::from_path(&video).unwrap().kind, LocalKind::Video);
        let picked = SelectedMedia::from_path(&image).unwrap();
        assert_eq!(picked.kind, LocalKind::Image);
        assert_eq!(picked.size, 3);
    }

    #[test]
    fn extension_ignores_query_and_directories() {
        assert_eq!(file_extension("https://cdn/v/demo.mp4?sig=1#t"), Some("mp4"));
        assert_eq!(file_extension("/tmp/a.b/photo"), None);
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert!(is_video_name("https://f.video.weibocdn.com/demo-video.MOV"));
        assert!(!is_video_name("https://sns-img.xiaohongshu.com/demo1.jpg"));
    }
}
