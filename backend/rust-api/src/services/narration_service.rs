use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::AzureSpeechConfig;
use crate::metrics::track_upstream_call;
use crate::models::DegradedKind;

const SERVICE_LABEL: &str = "azure_speech";
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("Speech synthesis is not configured")]
    SynthesisUnavailable,

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),
}

impl NarrationError {
    pub fn degraded_kind(&self) -> DegradedKind {
        match self {
            NarrationError::SynthesisUnavailable => DegradedKind::SynthesisUnavailable,
            NarrationError::SynthesisFailed(_) => DegradedKind::SynthesisFailed,
        }
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` to audio with `voice`, or the configured default voice.
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, NarrationError>;
}

pub struct AzureSpeechClient {
    http: Client,
    config: AzureSpeechConfig,
}

impl AzureSpeechClient {
    pub fn new(config: AzureSpeechConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    async fn synthesize_once(
        &self,
        key: &str,
        region: &str,
        ssml: String,
    ) -> Result<Vec<u8>, NarrationError> {
        let url = format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", region);

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .header(reqwest::header::USER_AGENT, "skillsprout-api")
            .body(ssml)
            .send()
            .await
            .map_err(|e| NarrationError::SynthesisFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NarrationError::SynthesisFailed(format!(
                "Azure Speech returned {}: {}",
                status, error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| NarrationError::SynthesisFailed(e.to_string()))?;

        if audio.is_empty() {
            return Err(NarrationError::SynthesisFailed(
                "Azure Speech returned no audio".to_string(),
            ));
        }

        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeechClient {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, NarrationError> {
        let (Some(key), Some(region)) = (
            self.config.key.as_deref().filter(|k| !k.is_empty()),
            self.config.region.as_deref().filter(|r| !r.is_empty()),
        ) else {
            return Err(NarrationError::SynthesisUnavailable);
        };

        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.config.voice.as_str());
        let ssml = build_ssml(text, voice);

        track_upstream_call(SERVICE_LABEL, self.synthesize_once(key, region, ssml)).await
    }
}

/// Wraps `text` in a single-voice SSML document.
pub fn build_ssml(text: &str, voice: &str) -> String {
    let lang = voice_language(voice);
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{text}</voice></speak>",
        lang = escape_xml(lang),
        voice = escape_xml(voice),
        text = escape_xml(text),
    )
}

/// `"en-US-JennyNeural"` -> `"en-US"`
fn voice_language(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(second)) => &voice[..second],
        _ => "en-US",
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
