//! Attachment stream descriptions returned by probers.

use serde::{Deserialize, Serialize};

/// One attachment stream inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentStream {
    /// Stream index as numbered by the container (ffprobe numbering).
    pub index: u32,
    /// File name recorded in the container, if any.
    pub file_name: Option<String>,
    /// MIME type recorded in the container, if any.
    pub mime_type: Option<String>,
    /// Payload size in bytes, when the prober knows it without extracting.
    pub size: Option<u64>,
}

/// Metadata reported by a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbedAttachment {
    /// MIME type, `None` when the container did not record one.
    pub mime_type: Option<String>,
    /// Embedded file name, `None` when the container did not record one.
    pub file_name: Option<String>,
}

impl ProbedAttachment {
    /// Build from raw container tags. Blank strings count as absent.
    pub fn new(mime_type: Option<String>, file_name: Option<String>) -> Self {
        Self {
            mime_type: non_blank(mime_type),
            file_name: non_blank(file_name),
        }
    }
}

impl From<&AttachmentStream> for ProbedAttachment {
    fn from(stream: &AttachmentStream) -> Self {
        Self::new(stream.mime_type.clone(), stream.file_name.clone())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tags_are_absent() {
        let probed = ProbedAttachment::new(Some("  ".into()), Some(String::new()));
        assert_eq!(probed, ProbedAttachment::default());
    }

    #[test]
    fn tags_are_trimmed() {
        let probed = ProbedAttachment::new(Some(" font/ttf ".into()), Some("Arial.ttf".into()));
        assert_eq!(probed.mime_type.as_deref(), Some("font/ttf"));
        assert_eq!(probed.file_name.as_deref(), Some("Arial.ttf"));
    }

    #[test]
    fn from_stream_copies_tags() {
        let stream = AttachmentStream {
            index: 3,
            file_name: Some("cover.jpg".into()),
            mime_type: Some("image/jpeg".into()),
            size: Some(1024),
        };
        let probed = ProbedAttachment::from(&stream);
        assert_eq!(probed.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(probed.file_name.as_deref(), Some("cover.jpg"));
    }

    #[test]
    fn stream_serializes() {
        let stream = AttachmentStream {
            index: 2,
            file_name: None,
            mime_type: Some("text/vtt".into()),
            size: None,
        };
        let json = serde_json::to_value(&stream).unwrap();
        assert_eq!(json["index"], 2);
        assert_eq!(json["mime_type"], "text/vtt");
    }
}
