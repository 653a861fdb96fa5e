//! Share-link parsing: from pasted text to direct, watermark-free media URLs.
//!
//! The parse oracle is a black box behind [`MediaSource`]. Two sources exist:
//!
//! | Source | Backing | Selected by |
//! |---|---|---|
//! | [`HttpSource`] | `POST {base_url}/api/parse` | `[parse] mode = "network"` |
//! | [`FixtureSource`] | canned per-platform responses | `[parse] mode = "fixture"` |
//!
//! [`parse_share_text`] is the entry point used by the CLI. It pulls the URL
//! out of a share caption, refuses unsupported platforms before any request
//! is made, and checks that the oracle actually returned something to save.

use crate::config::ParseConfig;
use crate::platform::{self, PlatformTag};
use crate::types::{MediaKind, NewEntry, ParseResult, RecordKind};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TITLE: &str = "未知标题";
const DEFAULT_AUTHOR: &str = "未知作者";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No link found in the input")]
    EmptyInput,
    #[error("Unsupported platform for {0}; try a Douyin, Kuaishou or Xiaohongshu link")]
    UnsupportedPlatform(String),
    #[error("Network request failed: {0}")]
    Network(String),
    #[error("Parse request timed out")]
    Timeout,
    #[error("Parse rejected: {0}")]
    Rejected(String),
    #[error("Parse returned no media URLs")]
    EmptyResult,
}

impl From<reqwest::Error> for ParseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ParseError::Timeout
        } else {
            ParseError::Network(e.to_string())
        }
    }
}

/// Anything that can turn a platform URL into a [`ParseResult`].
pub trait MediaSource {
    fn fetch(&self, url: &str, platform: PlatformTag) -> Result<ParseResult, ParseError>;
}

/// Which [`MediaSource`] the configuration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Fixture,
    Network,
}

// ============================================================================
// Network source
// ============================================================================

/// Parse oracle reached over HTTP.
pub struct HttpSource {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    url: &'a str,
    platform: PlatformTag,
}

/// Response body as the server sends it: every field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParseResponse {
    #[serde(default)]
    success: bool,
    platform: Option<PlatformTag>,
    media_type: Option<MediaKind>,
    title: Option<String>,
    author: Option<String>,
    author_avatar: Option<String>,
    video_url: Option<String>,
    image_urls: Option<Vec<String>>,
    cover_url: Option<String>,
    duration: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    message: Option<String>,
}

fn non_empty(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Interpret an `/api/parse` response.
///
/// Anything but a 200 with `success: true` is a rejection carrying the
/// server's `message` when there is one. Missing metadata gets placeholder
/// values and the requested platform.
pub fn decode_parse_response(
    status: u16,
    body: &str,
    requested: PlatformTag,
) -> Result<ParseResult, ParseError> {
    let raw: RawParseResponse = serde_json::from_str(body).unwrap_or_default();
    if status != 200 || !raw.success {
        return Err(ParseError::Rejected(non_empty(raw.message, "解析失败")));
    }
    Ok(ParseResult {
        success: true,
        platform: raw.platform.unwrap_or(requested),
        media_type: raw.media_type.unwrap_or_default(),
        title: non_empty(raw.title, DEFAULT_TITLE),
        author: non_empty(raw.author, DEFAULT_AUTHOR),
        author_avatar: raw.author_avatar,
        video_url: raw.video_url,
        image_urls: raw.image_urls,
        cover_url: raw.cover_url,
        duration: raw.duration,
        width: raw.width,
        height: raw.height,
        error: None,
    })
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ParseError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MediaSource for HttpSource {
    fn fetch(&self, url: &str, platform: PlatformTag) -> Result<ParseResult, ParseError> {
        let endpoint = format!("{}/api/parse", self.base_url);
        tracing::debug!(%endpoint, %platform, "requesting parse");
        let response = self
            .client
            .post(&endpoint)
            .json(&ParseRequest { url, platform })
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        decode_parse_response(status, &body, platform)
    }
}

// ============================================================================
// Fixture source
// ============================================================================

/// Canned responses, one per platform. No network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSource;

fn video_fixture(
    platform: PlatformTag,
    title: &str,
    author: &str,
    video_url: &str,
    cover_url: &str,
    duration: u32,
) -> ParseResult {
    ParseResult {
        success: true,
        platform,
        media_type: MediaKind::Video,
        title: title.to_string(),
        author: author.to_string(),
        author_avatar: None,
        video_url: Some(video_url.to_string()),
        image_urls: None,
        cover_url: Some(cover_url.to_string()),
        duration: Some(duration),
        width: None,
        height: None,
        error: None,
    }
}

/// The canned response for `platform`, or `None` for [`PlatformTag::Unknown`].
pub fn fixture_result(platform: PlatformTag) -> Option<ParseResult> {
    let result = match platform {
        PlatformTag::Douyin => ParseResult {
            author_avatar: Some(
                "https://p3.douyinpic.com/aweme/100x100/aweme-avatar/default.jpeg".to_string(),
            ),
            ..video_fixture(
                platform,
                "这是一个抖音视频示例标题 #热门 #推荐",
                "抖音创作者",
                "https://v.douyin.com/demo-video.mp4",
                "https://p3.douyinpic.com/img/demo-cover.jpeg",
                15,
            )
        },
        PlatformTag::Kuaishou => video_fixture(
            platform,
            "快手短视频示例",
            "快手用户",
            "https://v.kuaishou.com/demo-video.mp4",
            "https://tx2.a.kwimgs.com/demo-cover.jpeg",
            30,
        ),
        PlatformTag::Xiaohongshu => ParseResult {
            success: true,
            platform,
            media_type: MediaKind::ImageSet,
            title: "小红书笔记分享 | 超实用的生活技巧".to_string(),
            author: "小红书博主".to_string(),
            author_avatar: None,
            video_url: None,
            image_urls: Some(
                (1..=3)
                    .map(|i| format!("https://sns-img.xiaohongshu.com/demo{i}.jpg"))
                    .collect(),
            ),
            cover_url: Some("https://sns-img.xiaohongshu.com/demo-cover.jpg".to_string()),
            duration: None,
            width: None,
            height: None,
            error: None,
        },
        PlatformTag::Weibo => video_fixture(
            platform,
            "微博视频分享",
            "微博用户",
            "https://f.video.weibocdn.com/demo-video.mp4",
            "https://wx4.sinaimg.cn/demo-cover.jpg",
            60,
        ),
        PlatformTag::Pipixia => video_fixture(
            platform,
            "皮皮虾搞笑视频",
            "皮皮虾用户",
            "https://v.pipix.com/demo-video.mp4",
            "https://p3.pstatp.com/demo-cover.jpg",
            20,
        ),
        PlatformTag::Xigua => video_fixture(
            platform,
            "西瓜视频精选",
            "西瓜创作者",
            "https://v.ixigua.com/demo-video.mp4",
            "https://p3.pstatp.com/demo-cover.jpg",
            180,
        ),
        PlatformTag::Unknown => return None,
    };
    Some(result)
}

impl MediaSource for FixtureSource {
    fn fetch(&self, url: &str, platform: PlatformTag) -> Result<ParseResult, ParseError> {
        tracing::debug!(%url, %platform, "serving fixture parse result");
        fixture_result(platform).ok_or_else(|| ParseError::Rejected("不支持的平台".to_string()))
    }
}

/// Build the source named by the `[parse]` config section.
pub fn source_from_config(
    config: &ParseConfig,
    timeout: Duration,
) -> Result<Box<dyn MediaSource>, ParseError> {
    match config.mode {
        SourceMode::Fixture => Ok(Box::new(FixtureSource)),
        SourceMode::Network => Ok(Box::new(HttpSource::new(&config.base_url, timeout)?)),
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// The link inside a share caption, or the trimmed input when none is found.
pub fn resolve_input(input: &str) -> String {
    platform::extract_url(input).unwrap_or_else(|| input.trim().to_string())
}

/// A successful parse, with the URL and platform it was made for.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub url: String,
    pub platform: PlatformTag,
    pub result: ParseResult,
}

impl ParseOutcome {
    /// History record for this parse.
    pub fn to_new_entry(&self) -> NewEntry {
        NewEntry {
            kind: RecordKind::FromUrl,
            media_type: self.result.media_type,
            source_url: Some(self.url.clone()),
            platform: Some(self.platform),
            title: Some(self.result.title.clone()),
            author: Some(self.result.author.clone()),
            result_urls: self.result.media_urls(),
            cover_url: self.result.cover_url.clone(),
            saved_to_album: false,
        }
    }
}

/// Parse pasted text (a URL or a whole share caption).
pub fn parse_share_text(
    source: &dyn MediaSource,
    input: &str,
) -> Result<ParseOutcome, ParseError> {
    let url = resolve_input(input);
    if url.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let platform = platform::identify(&url);
    if platform == PlatformTag::Unknown {
        return Err(ParseError::UnsupportedPlatform(url));
    }

    let result = source.fetch(&url, platform)?;
    if result.media_urls().is_empty() {
        return Err(ParseError::EmptyResult);
    }
    tracing::info!(%platform, media = result.media_type.label(), "parsed share link");
    Ok(ParseOutcome {
        url,
        platform,
        result,
    })
}
