//! Media descriptors and download selection

/// Kind of media attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Voice,
    Animation,
    Sticker,
    Document,
    Poll,
    Contact,
    Location,
    Venue,
    Dice,
    WebPage,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice",
            MediaKind::Animation => "animation",
            MediaKind::Sticker => "sticker",
            MediaKind::Document => "document",
            MediaKind::Poll => "poll",
            MediaKind::Contact => "contact",
            MediaKind::Location => "location",
            MediaKind::Venue => "venue",
            MediaKind::Dice => "dice",
            MediaKind::WebPage => "web_page",
        }
    }

    /// Whether the media carries a downloadable file
    pub fn is_downloadable(&self) -> bool {
        matches!(
            self,
            MediaKind::Photo
                | MediaKind::Video
                | MediaKind::Audio
                | MediaKind::Voice
                | MediaKind::Animation
                | MediaKind::Sticker
                | MediaKind::Document
        )
    }

    fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Photo => "jpg",
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
            MediaKind::Voice => "ogg",
            _ => "dat",
        }
    }

    fn default_mime_type(&self) -> &'static str {
        match self {
            MediaKind::Photo => "image/jpeg",
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Voice => "audio/ogg",
            _ => "application/octet-stream",
        }
    }
}

/// Document attributes relevant to classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentTraits {
    pub video: bool,
    pub audio: bool,
    pub voice: bool,
    pub animated: bool,
}

/// Classify a document by its attributes, falling back to its MIME type
pub fn classify_document(traits: DocumentTraits, mime_type: Option<&str>) -> MediaKind {
    if traits.voice {
        return MediaKind::Voice;
    }
    if traits.animated || mime_type == Some("image/gif") {
        return MediaKind::Animation;
    }
    if traits.video {
        return MediaKind::Video;
    }
    if traits.audio {
        return MediaKind::Audio;
    }

    match mime_type {
        Some(mime) if mime.starts_with("video/") => MediaKind::Video,
        Some(mime) if mime.starts_with("audio/") => MediaKind::Audio,
        _ => MediaKind::Document,
    }
}

/// Media attached to a message, as reported by the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub kind: MediaKind,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// File name and content type chosen for a download response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDownloadPlan {
    pub file_name: String,
    pub mime_type: String,
}

/// Match a download selector against a message's media.
///
/// `photo`, `video`, `document` and `audio` select by kind; any other
/// selector must equal the media's file id.
pub fn select_media(media: &MediaRecord, selector: &str) -> Option<MediaDownloadPlan> {
    if !media.kind.is_downloadable() {
        return None;
    }

    let by_kind = match selector.to_ascii_lowercase().as_str() {
        "photo" => media.kind == MediaKind::Photo,
        "video" => media.kind == MediaKind::Video,
        "audio" => media.kind == MediaKind::Audio,
        "document" => media.kind == MediaKind::Document,
        _ => false,
    };
    let by_id = media.file_id.as_deref() == Some(selector);

    if !by_kind && !by_id {
        return None;
    }

    let stem = media.file_id.as_deref().unwrap_or("downloaded_media");
    let file_name = match (&media.file_name, media.kind) {
        // Photos never carry a real name
        (Some(name), kind) if !name.is_empty() && kind != MediaKind::Photo => name.clone(),
        (_, kind) => format!("{}.{}", stem, kind.default_extension()),
    };
    let mime_type = media
        .mime_type
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| media.kind.default_mime_type().to_string());

    Some(MediaDownloadPlan {
        file_name,
        mime_type,
    })
}
