//! Platform identification for share links and share captions.
//!
//! ## Precedence
//!
//! Platforms are matched against [`PLATFORM_MATCHERS`], an ordered list of
//! `(tag, patterns)` pairs. The first tag with any matching pattern wins, so
//! a platform whose domains could shadow another's must be declared first.
//! No current patterns overlap, but the order is part of the contract and is
//! exposed through [`declaration_order`].
//!
//! Matching is containment, not URL parsing: a domain fragment anywhere in
//! the input counts. Inputs are single URLs or short captions, so the
//! occasional false positive from an embedded foreign domain is accepted.
//!
//! ## Share captions
//!
//! Share messages wrap the link in marketing copy, often with CJK text glued
//! directly onto the end of the URL:
//!
//! ```text
//! 看看这个视频 https://v.douyin.com/abc123/ 超好看
//! 3.87 复制打开抖音https://v.douyin.com/abc123/看看
//! ```
//!
//! [`extract_url`] stops at the first whitespace or CJK ideograph.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Closed set of supported short-video platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformTag {
    Douyin,
    Kuaishou,
    Xiaohongshu,
    Weibo,
    Pipixia,
    Xigua,
    Unknown,
}

impl PlatformTag {
    /// Product name as shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            PlatformTag::Douyin => "抖音",
            PlatformTag::Kuaishou => "快手",
            PlatformTag::Xiaohongshu => "小红书",
            PlatformTag::Weibo => "微博",
            PlatformTag::Pipixia => "皮皮虾",
            PlatformTag::Xigua => "西瓜视频",
            PlatformTag::Unknown => "未知平台",
        }
    }

    /// Stable lower-case identifier (also the serialized form).
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformTag::Douyin => "douyin",
            PlatformTag::Kuaishou => "kuaishou",
            PlatformTag::Xiaohongshu => "xiaohongshu",
            PlatformTag::Weibo => "weibo",
            PlatformTag::Pipixia => "pipixia",
            PlatformTag::Xigua => "xigua",
            PlatformTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `(tag, domain patterns)` table. Evaluated top to bottom.
pub const PLATFORM_MATCHERS: &[(PlatformTag, &[&str])] = &[
    (
        PlatformTag::Douyin,
        &[r"v\.douyin\.com", r"www\.douyin\.com", r"www\.iesdouyin\.com"],
    ),
    (
        PlatformTag::Kuaishou,
        &[r"v\.kuaishou\.com", r"www\.kuaishou\.com", r"v\.kwai\.com"],
    ),
    (
        PlatformTag::Xiaohongshu,
        &[r"xhslink\.com", r"www\.xiaohongshu\.com", r"xiaohongshu\.com"],
    ),
    (
        PlatformTag::Weibo,
        &[r"weibo\.com", r"weibo\.cn", r"m\.weibo\.cn"],
    ),
    (PlatformTag::Pipixia, &[r"h5\.pipix\.com", r"www\.pipix\.com"]),
    (PlatformTag::Xigua, &[r"www\.ixigua\.com", r"m\.ixigua\.com"]),
];

static COMPILED_MATCHERS: LazyLock<Vec<(PlatformTag, Vec<Regex>)>> = LazyLock::new(|| {
    PLATFORM_MATCHERS
        .iter()
        .map(|(tag, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("platform pattern must compile"))
                .collect();
            (*tag, compiled)
        })
        .collect()
});

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://[^\s\x{4e00}-\x{9fa5}]+").expect("url pattern must compile")
});

/// Tags in the order they are tried by [`identify`].
pub fn declaration_order() -> Vec<PlatformTag> {
    PLATFORM_MATCHERS.iter().map(|(tag, _)| *tag).collect()
}

/// Map arbitrary input (URL or share text) to a platform tag.
///
/// Never fails: anything unrecognised, including the empty string, is
/// [`PlatformTag::Unknown`].
pub fn identify(input: &str) -> PlatformTag {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return PlatformTag::Unknown;
    }
    COMPILED_MATCHERS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&normalized)))
        .map(|(tag, _)| *tag)
        .unwrap_or(PlatformTag::Unknown)
}

/// Pull the first `http(s)://` URL out of free text.
pub fn extract_url(text: &str) -> Option<String> {
    URL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

pub fn is_supported(input: &str) -> bool {
    identify(input) != PlatformTag::Unknown
}

/// Loose URL shape check: an `http://` or `https://` scheme followed by something.
pub fn is_valid_url(input: &str) -> bool {
    let lower = input.trim().to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.len() > scheme.len() && lower.starts_with(scheme))
}

/// Advertised platform entry for help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub tag: PlatformTag,
    pub name: &'static str,
    pub domains: &'static [&'static str],
}

/// Supported platforms with the domains users are told to paste from.
pub fn supported_platforms() -> Vec<PlatformInfo> {
    let advertised: [(PlatformTag, &'static [&'static str]); 6] = [
        (PlatformTag::Douyin, &["v.douyin.com", "www.douyin.com"]),
        (PlatformTag::Kuaishou, &["v.kuaishou.com"]),
        (PlatformTag::Xiaohongshu, &["xhslink.com", "xiaohongshu.com"]),
        (PlatformTag::Weibo, &["weibo.com", "weibo.cn"]),
        (PlatformTag::Pipixia, &["h5.pipix.com"]),
        (PlatformTag::Xigua, &["www.ixigua.com"]),
    ];
    advertised
        .into_iter()
        .map(|(tag, domains)| PlatformInfo {
            tag,
            name: tag.display_name(),
            domains,
        })
        .collect()
}
