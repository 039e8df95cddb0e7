//! Uploaded file record and its inline data URL encoding.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{now_millis, LuminaError, Result};

/// MIME type recorded when the uploader does not know one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An uploaded asset kept inline as a base64 data URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    /// Unique identifier for the file
    pub id: String,
    /// File name as uploaded
    pub name: String,
    /// MIME type captured at upload time
    #[serde(alias = "type")]
    pub mime_type: String,
    /// Payload size in bytes
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    #[serde(alias = "dataUrl")]
    pub data: String,
    /// Upload time in milliseconds since epoch
    pub uploaded_at: i64,
    /// Generated description, overwritten by each successful analysis
    #[serde(
        default,
        alias = "aiAnalysis",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_description: Option<String>,
}

impl FileItem {
    /// Builds a file record from raw bytes.
    ///
    /// Fails with [`LuminaError::Encoding`] when the name is blank or the MIME
    /// type is not of the form `type/subtype`.
    pub fn from_bytes(bytes: &[u8], name: &str, mime_type: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(LuminaError::Encoding {
                message: "file name is empty".to_string(),
            });
        }
        let mime_type = normalize_mime_type(mime_type)?;

        Ok(FileItem {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            data: encode_data_url(&mime_type, bytes),
            mime_type,
            size: bytes.len() as u64,
            uploaded_at: now_millis(),
            ai_description: None,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Base64 payload without the data URL header.
    pub fn base64_payload(&self) -> &str {
        split_data_url(&self.data)
            .map(|(_, payload)| payload)
            .unwrap_or("")
    }
}

/// Lowercases and validates a MIME type; blank becomes [`DEFAULT_MIME_TYPE`].
///
/// Parameters such as `; charset=utf-8` are dropped.
pub fn normalize_mime_type(mime_type: &str) -> Result<String> {
    if mime_type.trim().is_empty() {
        return Ok(DEFAULT_MIME_TYPE.to_string());
    }
    let essence = mime_type.split(';').next().unwrap_or_default();
    let mime_type = essence.trim().to_ascii_lowercase();

    let valid = match mime_type.split_once('/') {
        Some((kind, sub)) => {
            let token = |s: &str| {
                !s.is_empty()
                    && s
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
            };
            token(kind) && token(sub)
        }
        None => false,
    };

    if valid {
        Ok(mime_type)
    } else {
        Err(LuminaError::Encoding {
            message: format!("invalid MIME type: {}", mime_type),
        })
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Splits a base64 data URL into its MIME type and payload.
pub fn split_data_url(data_url: &str) -> Option<(&str, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    Some((mime_type, payload))
}

/// Decodes the payload of a base64 data URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (_, payload) = split_data_url(data_url).ok_or_else(|| LuminaError::Encoding {
        message: "not a base64 data URL".to_string(),
    })?;
    BASE64.decode(payload).map_err(|e| LuminaError::Encoding {
        message: format!("invalid base64 payload: {}", e),
    })
}
