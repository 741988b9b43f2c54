use serde::Serialize;

use crate::{
    error::Result,
    image::{DecodeResult, ImageHeader},
};

/// The structured outcome of an info or decode call, serialised as JSON with
/// camelCase keys. Fields that do not apply are left out.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Error message, set when the call failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Width in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    /// Height in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u16>,
    /// Channels per pixel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_components: Option<u8>,
    /// Bits per sample
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_precision: Option<u8>,
    /// Payload size of the Zen segment, when one was processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zen_chunk_size: Option<usize>,
}

impl Report {
    /// Report for a metadata query.
    pub fn info(result: &Result<ImageHeader>) -> Self {
        match result {
            Ok(header) => Self::from_header(header),
            Err(err) => Self::from_error(err),
        }
    }

    /// Report for a decode call.
    pub fn decode(result: &Result<DecodeResult>) -> Self {
        match result {
            Ok(decoded) => Self {
                zen_chunk_size: decoded.zen_chunk_size,
                ..Self::from_header(&decoded.header)
            },
            Err(err) => Self::from_error(err),
        }
    }

    fn from_header(header: &ImageHeader) -> Self {
        Self {
            width: Some(header.width),
            height: Some(header.height),
            num_components: Some(header.num_components),
            data_precision: Some(header.data_precision),
            ..Default::default()
        }
    }

    fn from_error(err: &crate::error::Error) -> Self {
        let report = err.header().map(Self::from_header).unwrap_or_default();
        Self {
            error: Some(err.to_string()),
            ..report
        }
    }

    /// True when the report describes a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Compact JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON text.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
