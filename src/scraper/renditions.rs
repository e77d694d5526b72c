use serde_json::Value;

use super::types::DownloadLink;

/// One encoded variant of a video as listed by the upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    pub itag: Option<u32>,
    pub url: String,
    pub mime_type: String,
    pub height: Option<u32>,
    pub bitrate: Option<u64>,
    pub average_bitrate: Option<u64>,
    pub has_audio_track: bool,
}

impl Rendition {
    pub fn has_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio_track || self.mime_type.starts_with("audio/")
    }

    pub fn is_combined(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Audio bitrate in kbps: the nominal rate for well-known itags, otherwise
    /// the measured bitrate rounded to the nearest kbps.
    pub fn audio_kbps(&self) -> Option<u32> {
        self.itag
            .and_then(known_audio_kbps)
            .or_else(|| {
                self.average_bitrate
                    .or(self.bitrate)
                    .and_then(|bps| u32::try_from(bps.saturating_add(500) / 1000).ok())
            })
    }

    fn from_json(format: &Value) -> Option<Self> {
        // Cipher-protected entries carry no direct url and can't be downloaded as-is.
        let url = format.get("url").and_then(|u| u.as_str()).filter(|u| !u.is_empty())?;
        let mime_type = format.get("mimeType").and_then(|m| m.as_str()).unwrap_or_default();

        let has_audio_track = ["audioQuality", "audioSampleRate", "audioChannels"]
            .iter()
            .any(|key| format.get(key).is_some_and(|v| !v.is_null()));

        Some(Self {
            itag: format.get("itag").and_then(|i| i.as_u64()).and_then(|i| u32::try_from(i).ok()),
            url: url.to_string(),
            mime_type: mime_type.to_ascii_lowercase(),
            height: format.get("height").and_then(|h| h.as_u64()).and_then(|h| u32::try_from(h).ok()),
            bitrate: as_u64_lenient(format.get("bitrate")),
            average_bitrate: as_u64_lenient(format.get("averageBitrate")),
            has_audio_track,
        })
    }
}

/// Some APIs send numbers as strings.
fn as_u64_lenient(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Nominal audio bitrates YouTube assigns to its fixed itags.
fn known_audio_kbps(itag: u32) -> Option<u32> {
    match itag {
        18 => Some(96),
        22 => Some(192),
        139 => Some(48),
        140 => Some(128),
        141 => Some(256),
        171 => Some(128),
        249 => Some(48),
        250 => Some(64),
        251 => Some(160),
        _ => None,
    }
}

/// Collects renditions from the `formats` and `adaptiveFormats` arrays of a
/// streaming-data object.
pub fn renditions_from_json(streaming: &Value) -> Vec<Rendition> {
    ["formats", "adaptiveFormats"]
        .iter()
        .filter_map(|key| streaming.get(key).and_then(|f| f.as_array()))
        .flatten()
        .filter_map(Rendition::from_json)
        .collect()
}

/// Highest-resolution rendition that has both picture and sound.
/// Video-only renditions are never substituted.
pub fn select_video(renditions: &[Rendition]) -> Option<&Rendition> {
    renditions
        .iter()
        .filter(|r| r.is_combined())
        .max_by_key(|r| (r.height.unwrap_or(0), r.bitrate.unwrap_or(0)))
}

/// Highest-bitrate audio-only rendition.
pub fn select_audio(renditions: &[Rendition]) -> Option<&Rendition> {
    renditions
        .iter()
        .filter(|r| r.is_audio_only())
        .max_by_key(|r| (r.audio_kbps().unwrap_or(0), r.bitrate.unwrap_or(0)))
}

/// Up to two links, ordered `[video, audio]`.
pub fn download_links(renditions: &[Rendition]) -> Vec<DownloadLink> {
    let mut links = Vec::with_capacity(2);

    if let Some(video) = select_video(renditions) {
        let quality = match video.height {
            Some(h) => format!("{h}p (Video)"),
            None => "Video".to_string(),
        };
        links.push(DownloadLink {
            quality,
            url: video.url.clone(),
        });
    }

    if let Some(audio) = select_audio(renditions) {
        let quality = match audio.audio_kbps() {
            Some(kbps) => format!("MP3 ({kbps}kbps)"),
            None => "MP3".to_string(),
        };
        links.push(DownloadLink {
            quality,
            url: audio.url.clone(),
        });
    }

    links
}

/// A thumbnail entry as listed by the upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub fn thumbnails_from_json(list: Option<&Value>) -> Vec<Thumbnail> {
    list.and_then(|l| l.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|t| {
                    let url = t.get("url")?.as_str()?.to_string();
                    Some(Thumbnail {
                        url,
                        width: t.get("width").and_then(|w| w.as_u64()).and_then(|w| u32::try_from(w).ok()),
                        height: t.get("height").and_then(|h| h.as_u64()).and_then(|h| u32::try_from(h).ok()),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The largest thumbnail. Uses dimensions when every entry has them, since
/// list order isn't guaranteed; otherwise trusts the upstream's ascending
/// order and takes the last one.
pub fn largest_thumbnail(thumbnails: &[Thumbnail]) -> Option<&Thumbnail> {
    let all_sized = thumbnails.iter().all(|t| t.width.is_some() && t.height.is_some());
    if all_sized {
        thumbnails
            .iter()
            .max_by_key(|t| u64::from(t.width.unwrap_or(0)) * u64::from(t.height.unwrap_or(0)))
    } else {
        thumbnails.last()
    }
}
