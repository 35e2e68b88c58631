//! Message attachments and reply snapshots carried inside the envelope.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ATTACHMENT_SIZE, REPLY_PREVIEW_CHARS, REPLY_PREVIEW_ELLIPSIS};
use crate::error::ValidationError;
use crate::types::MessageId;

/// A file inlined into a message as a base64 data URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    /// `data:<mime>;base64,<payload>`
    pub payload: String,
}

impl Attachment {
    /// Encode raw file bytes, rejecting anything above the attachment limit.
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, ValidationError> {
        if bytes.len() > MAX_ATTACHMENT_SIZE {
            return Err(ValidationError::AttachmentTooLarge {
                size: bytes.len(),
                max: MAX_ATTACHMENT_SIZE,
            });
        }
        let mime_type = mime_type.into();
        let payload = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        Ok(Self {
            file_name: file_name.into(),
            mime_type,
            payload,
        })
    }

    /// Wrap an existing data URI, taking the MIME type from its header.
    pub fn from_data_uri(
        file_name: impl Into<String>,
        data_uri: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let payload = data_uri.into();
        let (mime_type, _) = split_data_uri(&payload)?;
        let attachment = Self {
            file_name: file_name.into(),
            mime_type: mime_type.to_string(),
            payload,
        };
        attachment.validate()?;
        Ok(attachment)
    }

    /// Size of the decoded payload, computed from the base64 length.
    pub fn decoded_len(&self) -> Result<usize, ValidationError> {
        let (_, data) = split_data_uri(&self.payload)?;
        let data = data.trim_end();
        let padding = data.bytes().rev().take_while(|b| *b == b'=').count();
        let full = (data.len() / 4) * 3 + ((data.len() % 4) * 3) / 4;
        Ok(full.saturating_sub(padding.min(2)))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let size = self.decoded_len()?;
        if size > MAX_ATTACHMENT_SIZE {
            return Err(ValidationError::AttachmentTooLarge {
                size,
                max: MAX_ATTACHMENT_SIZE,
            });
        }
        Ok(())
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

fn split_data_uri(uri: &str) -> Result<(&str, &str), ValidationError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ValidationError::InvalidDataUri("missing data: scheme".into()))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| ValidationError::InvalidDataUri("missing payload separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ValidationError::InvalidDataUri("payload is not base64".into()))?;
    Ok((mime, data))
}

/// Snapshot of the message being replied to, taken when the reply is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub id: MessageId,
    pub body_preview: String,
    pub sender_display_name: String,
}

impl ReplyRef {
    pub fn new(
        id: MessageId,
        body_preview: impl Into<String>,
        sender_display_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            body_preview: body_preview.into(),
            sender_display_name: sender_display_name.into(),
        }
    }

    /// Build a reply from a full message body, truncating the preview.
    pub fn from_body(id: MessageId, body: &str, sender_display_name: impl Into<String>) -> Self {
        Self::new(id, preview(body), sender_display_name)
    }
}

pub fn preview(body: &str) -> String {
    if body.chars().count() <= REPLY_PREVIEW_CHARS {
        return body.to_string();
    }
    let mut out: String = body.chars().take(REPLY_PREVIEW_CHARS).collect();
    out.push_str(REPLY_PREVIEW_ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_builds_data_uri() {
        let att = Attachment::from_bytes("dot.png", "image/png", &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(att.payload, "data:image/png;base64,AQIDBAU=");
        assert_eq!(att.decoded_len().unwrap(), 5);
        assert!(att.is_image());
    }

    #[test]
    fn test_oversized_attachment_rejected() {
        let bytes = vec![0u8; MAX_ATTACHMENT_SIZE + 1];
        let err = Attachment::from_bytes("big.bin", "application/octet-stream", &bytes).unwrap_err();
        assert_eq!(
            err,
            ValidationError::AttachmentTooLarge {
                size: MAX_ATTACHMENT_SIZE + 1,
                max: MAX_ATTACHMENT_SIZE
            }
        );
    }

    #[test]
    fn test_limit_is_inclusive() {
        let bytes = vec![7u8; MAX_ATTACHMENT_SIZE];
        let att = Attachment::from_bytes("edge.bin", "application/octet-stream", &bytes).unwrap();
        assert_eq!(att.decoded_len().unwrap(), MAX_ATTACHMENT_SIZE);
        assert!(att.validate().is_ok());
    }

    #[test]
    fn test_from_data_uri() {
        let att = Attachment::from_data_uri("a.gif", "data:image/gif;base64,R0lG").unwrap();
        assert_eq!(att.mime_type, "image/gif");
        assert!(Attachment::from_data_uri("x", "http://example.com/a.png").is_err());
        assert!(Attachment::from_data_uri("x", "data:text/plain,hello").is_err());
    }

    #[test]
    fn test_reply_preview_truncation() {
        let short = ReplyRef::from_body(MessageId::from("m1"), "hello", "Bob");
        assert_eq!(short.body_preview, "hello");

        let long_body = "x".repeat(41);
        let long = ReplyRef::from_body(MessageId::from("m2"), &long_body, "Bob");
        assert_eq!(long.body_preview, format!("{}...", "x".repeat(40)));
    }
}
