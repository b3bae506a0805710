//! Quality extraction from release filenames.
//!
//! Each attribute axis is detected by its own independent rule, so one
//! unmatched axis never blocks another. Parses filenames like:
//! - "Formula1.2026.Round05.Sprint.2160p.F1TV.WEB-DL.AAC2.0.H.265-EGORTECH"
//! - "NBA.2026.04.22.Pacers.vs.Celtics.720p60.ESPN.WEBRip.x264-WhiteWolf"

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use matchday_core::quality::QualityInfo;

// No trailing boundary on the NNNNp forms: "1080p50" still carries 1080p.
static RE_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(2160p|1440p|1080p|720p|576p|480p)|\b(4k|uhd)\b").unwrap()
});

static RE_FRAME_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:\d{3,4}p)?(\d{2,3})\s?fps\b|\b\d{3,4}p(\d{2})\b").unwrap());

static RE_BIT_DEPTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(8|10)[-. ]?bit\b").unwrap());

// Trailing dash-delimited group, optionally before the extension.
static RE_TRAILING_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-([A-Za-z0-9]{2,20})$").unwrap());

static VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "flv", "webm", "ts", "mpg", "mpeg", "ogv",
];

/// Streaming/broadcast services whose tags imply a WEB-DL source.
static BROADCASTERS: &[&str] = &[
    "F1TV", "AMZN", "NF", "SKY", "ESPN", "TNT", "DAZN", "PCOK", "MOTORTREND", "NBC", "FOX",
    "TSN", "BBC", "ITV",
];

/// Groups that release without a trailing dash tag; only tokens of three or
/// more characters are trusted, so "DL" from "WEB-DL" is never a group.
static KNOWN_GROUPS: &[&str] = &[
    "EGORTECH", "SMCGILL1969", "F1Carreras", "WhiteWolf", "VERUM", "NTb", "FLUX",
];

/// Extract quality attributes from a filename.
///
/// `captured` entries for `resolution`, `source` and `release_group` (or its
/// `group` alias) override filename-derived detection for that field only;
/// every other axis still comes from the filename. Unknown attributes stay
/// absent; extraction never fails.
pub fn extract(filename: &str, captured: Option<&HashMap<String, String>>) -> QualityInfo {
    let stem = strip_extension(filename);

    let mut info = QualityInfo {
        resolution: detect_resolution(stem),
        source: None,
        release_group: detect_release_group(stem),
        is_proper: has_token(stem, "proper"),
        is_repack: has_token(stem, "repack") || has_token(stem, "rerip"),
        codec: detect_codec(stem),
        hdr_format: detect_hdr(stem),
        frame_rate: detect_frame_rate(stem),
        bit_depth: detect_bit_depth(stem),
        audio: detect_audio(stem),
        broadcaster: detect_broadcaster(stem),
    };
    info.source = detect_source(stem, info.broadcaster.is_some());

    if let Some(captured) = captured {
        if let Some(value) = captured.get("resolution") {
            info.resolution = normalize_resolution(value).or(info.resolution);
        }
        if let Some(value) = captured.get("source") {
            info.source = normalize_source(value).or(info.source);
        }
        if let Some(value) = captured.get("release_group").or_else(|| captured.get("group")) {
            info.release_group = Some(value.clone());
        }
    }

    debug!(
        filename,
        resolution = ?info.resolution,
        source = ?info.source,
        group = ?info.release_group,
        "extracted quality"
    );
    info
}

fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if VIDEO_EXTENSIONS.contains(&filename[pos + 1..].to_lowercase().as_str()) => {
            &filename[..pos]
        }
        _ => filename,
    }
}

fn has_token(stem: &str, token: &str) -> bool {
    stem.to_lowercase()
        .replace(['.', '_', '-'], " ")
        .split_whitespace()
        .any(|t| t == token)
}

fn detect_resolution(stem: &str) -> Option<String> {
    let caps = RE_RESOLUTION.captures(stem)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| normalize_resolution(m.as_str()))
}

/// Fold resolution synonyms into the `NNNNp` vocabulary.
fn normalize_resolution(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "4k" | "uhd" | "2160" => Some("2160p".to_string()),
        "1440" => Some("1440p".to_string()),
        "1080" => Some("1080p".to_string()),
        "720" => Some("720p".to_string()),
        "576" => Some("576p".to_string()),
        "480" | "sd" => Some("480p".to_string()),
        _ if lower.ends_with('p') && lower[..lower.len() - 1].chars().all(|c| c.is_ascii_digit()) => {
            Some(lower)
        }
        _ => None,
    }
}

fn detect_source(stem: &str, has_broadcaster: bool) -> Option<String> {
    let upper = stem.to_uppercase();
    if upper.contains("BLURAY") || upper.contains("BLU-RAY") || upper.contains("BDRIP") {
        return Some("bluray".to_string());
    }
    if upper.contains("WEB-DL") || upper.contains("WEBDL") {
        return Some("webdl".to_string());
    }
    if upper.contains("WEBRIP") || upper.contains("WEB-RIP") {
        return Some("webrip".to_string());
    }
    if upper.contains("HDTV") {
        return Some("hdtv".to_string());
    }
    if upper.contains("DVDRIP") || upper.contains("DVD") {
        return Some("dvd".to_string());
    }
    // A bare WEB tag or a known streaming service implies WEB-DL.
    if has_token(stem, "web") || has_broadcaster {
        return Some("webdl".to_string());
    }
    None
}

/// Fold source synonyms into the closed vocabulary.
fn normalize_source(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    match upper.as_str() {
        "BLURAY" | "BLU-RAY" | "BDRIP" => Some("bluray".to_string()),
        "WEB" | "WEB-DL" | "WEBDL" => Some("webdl".to_string()),
        "WEBRIP" | "WEB-RIP" => Some("webrip".to_string()),
        "HDTV" => Some("hdtv".to_string()),
        "DVD" | "DVDRIP" => Some("dvd".to_string()),
        _ if BROADCASTERS.contains(&upper.as_str()) => Some("webdl".to_string()),
        _ => None,
    }
}

fn detect_codec(stem: &str) -> Option<String> {
    let upper = stem.to_uppercase();
    if upper.contains("X265") || upper.contains("H265") || upper.contains("H.265") || upper.contains("HEVC") {
        Some("h265".to_string())
    } else if upper.contains("X264") || upper.contains("H264") || upper.contains("H.264") || upper.contains("AVC") {
        Some("h264".to_string())
    } else if upper.contains("AV1") {
        Some("av1".to_string())
    } else if upper.contains("XVID") {
        Some("xvid".to_string())
    } else {
        None
    }
}

fn detect_hdr(stem: &str) -> Option<String> {
    let upper = stem.to_uppercase();
    if upper.contains("DOLBY VISION") || upper.contains("DOLBYVISION") || upper.contains("DOVI")
        || has_token(stem, "dv")
    {
        Some("dv".to_string())
    } else if upper.contains("HDR10+") || upper.contains("HDR10PLUS") {
        Some("hdr10plus".to_string())
    } else if upper.contains("HDR10") || has_token(stem, "hdr") {
        Some("hdr10".to_string())
    } else if upper.contains("HLG") {
        Some("hlg".to_string())
    } else {
        None
    }
}

fn detect_frame_rate(stem: &str) -> Option<u32> {
    let caps = RE_FRAME_RATE.captures(stem)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|fps| (24..=120).contains(fps))
}

fn detect_bit_depth(stem: &str) -> Option<u32> {
    RE_BIT_DEPTH.captures(stem).and_then(|c| c[1].parse().ok())
}

fn detect_audio(stem: &str) -> Option<String> {
    let upper = stem.to_uppercase();
    if upper.contains("ATMOS") {
        Some("atmos".to_string())
    } else if upper.contains("TRUEHD") {
        Some("truehd".to_string())
    } else if upper.contains("DTS-HD") || upper.contains("DTSHD") {
        Some("dtshd".to_string())
    } else if upper.contains("DTS") {
        Some("dts".to_string())
    } else if upper.contains("EAC3") || upper.contains("E-AC3") || upper.contains("DDP") || upper.contains("DD+") {
        Some("eac3".to_string())
    } else if upper.contains("AC3") || upper.contains("DD5") || has_token(stem, "dd") {
        Some("ac3".to_string())
    } else if upper.contains("AAC") {
        Some("aac".to_string())
    } else if upper.contains("FLAC") {
        Some("flac".to_string())
    } else if upper.contains("OPUS") {
        Some("opus".to_string())
    } else {
        None
    }
}

fn detect_broadcaster(stem: &str) -> Option<String> {
    let tokens: Vec<String> = stem
        .replace(['.', '_', '-'], " ")
        .split_whitespace()
        .map(str::to_uppercase)
        .collect();
    BROADCASTERS
        .iter()
        .find(|b| tokens.iter().any(|t| t == *b))
        .map(|b| b.to_string())
}

/// A dash-delimited trailing token is the strongest signal; otherwise only
/// known group names of three or more characters are accepted, to avoid
/// mistaking tags like "DL" for a group.
fn detect_release_group(stem: &str) -> Option<String> {
    if let Some(caps) = RE_TRAILING_GROUP.captures(stem) {
        let candidate = &caps[1];
        // "WEB-DL" and friends end in a dash-delimited token too; reject
        // tokens that are really source/audio tags.
        if !is_reserved_tag(candidate) {
            return Some(candidate.to_string());
        }
    }
    let tokens: Vec<&str> = stem.split(['.', '_', '-', ' ']).collect();
    KNOWN_GROUPS
        .iter()
        .find(|g| g.len() >= 3 && tokens.iter().any(|t| t.eq_ignore_ascii_case(g)))
        .map(|g| g.to_string())
}

fn is_reserved_tag(token: &str) -> bool {
    const RESERVED: &[&str] = &[
        "DL", "RIP", "WEB", "HDTV", "PROPER", "REPACK", "RERIP", "HEVC", "AV1", "AAC", "AC3",
        "EAC3", "DTS", "ATMOS", "FLAC", "OPUS", "HDR", "HDR10", "DV", "HLG", "SDR",
    ];
    RESERVED.iter().any(|r| token.eq_ignore_ascii_case(r))
        || token.chars().all(|c| c.is_ascii_digit())
}
