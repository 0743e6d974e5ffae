//! Format descriptors as delivered in player responses

use crate::error::SigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One downloadable stream variant.
///
/// Only the URL-bearing fields are interpreted; everything else in the player
/// response is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Format ID (itag)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itag: Option<u32>,
    /// Direct URL, present once resolved or when the stream is not ciphered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Urlencoded `s`, `sp` and `url` parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_cipher: Option<String>,
    /// Legacy name of `signature_cipher`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Bitrate in bits per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    /// Quality label (e.g., "720p")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<String>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormatDescriptor {
    /// Format with a direct URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Format carrying a `signatureCipher`
    pub fn with_signature_cipher(cipher: impl Into<String>) -> Self {
        Self {
            signature_cipher: Some(cipher.into()),
            ..Default::default()
        }
    }

    /// Check if the URL still has to be taken from a cipher
    pub fn is_ciphered(&self) -> bool {
        non_empty(&self.url).is_none()
    }

    /// Text the URL is resolved from: the URL itself, else the cipher.
    /// Empty strings count as missing.
    pub fn source(&self) -> Option<&str> {
        non_empty(&self.url)
            .or(non_empty(&self.signature_cipher))
            .or(non_empty(&self.cipher))
    }

    /// Short label for log lines
    pub fn label(&self) -> String {
        match self.itag {
            Some(itag) => format!("itag {}", itag),
            None => "format without itag".to_string(),
        }
    }
}

/// Read format descriptors from JSON.
///
/// Accepts a plain array of formats, a `streamingData` object, or a whole
/// player response; `formats` come before `adaptiveFormats`.
pub fn formats_from_json(value: Value) -> Result<Vec<FormatDescriptor>, SigError> {
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Object(mut object) => {
            if let Some(streaming_data) = object.remove("streamingData") {
                return formats_from_json(streaming_data);
            }

            let mut formats = Vec::new();
            for key in ["formats", "adaptiveFormats"] {
                if let Some(list) = object.remove(key) {
                    let mut parsed: Vec<FormatDescriptor> = serde_json::from_value(list)?;
                    formats.append(&mut parsed);
                }
            }

            if formats.is_empty() {
                return Err(SigError::FormatError(
                    "no formats or adaptiveFormats found".to_string(),
                ));
            }
            Ok(formats)
        }
        _ => Err(SigError::FormatError(
            "expected an array or object of formats".to_string(),
        )),
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
