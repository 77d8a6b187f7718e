use serde::{Deserialize, Serialize};
use validator::Validate;

use super::DegradedNotice;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NarrationRequest {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Text must be between 1 and 10000 characters"
    ))]
    pub text: String,
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NarrationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<DegradedNotice>,
    pub mcp_server: &'static str,
}
