//! Generative Language REST client implementing `AiGateway`.
//!
//! # Responsibility
//! - Translate gateway requests into `models/{model}:generateContent` calls.
//! - Map HTTP/transport/decode failures into `GatewayError`.
//!
//! # Invariants
//! - Every request carries the configured timeout; a hung call ends as
//!   `GatewayError::Transport`.
//! - The API key travels in a header and is never logged.
//! - Logs carry request kind, model, byte sizes and durations only.

use crate::config::{GatewayConfig, SPEECH_SAMPLE_RATE};
use crate::gateway::prompt::{
    self, CHAT_SYSTEM_INSTRUCTION, IMAGE_ANALYSIS_FALLBACK, IMAGE_ANALYSIS_INSTRUCTION,
    TRANSCRIPTION_INSTRUCTION,
};
use crate::gateway::{AiGateway, GatewayError, GatewayResult};
use crate::model::chat::{ChatMessage, ChatReply, ChatRole, SourceLink, SpeechClip};
use crate::model::observation::{ObservationScore, TeacherObservation};
use crate::model::report::{AiReport, ReportSection};
use crate::model::rubric::{Dimension, Rubric};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;

const API_KEY_HEADER: &str = "x-goog-api-key";
const IMAGE_MIME_TYPE: &str = "image/jpeg";
const AUDIO_MIME_TYPE: &str = "audio/wav";
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some(ChatRole::User.as_str().to_string()),
            parts,
        }
    }
}

impl GenerateContentRequest {
    fn prompt(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            system_instruction: None,
            tools: Vec::new(),
            generation_config: None,
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub(crate) fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<String>()
    }

    /// Base64 payload of the first inline-data part of the first candidate.
    pub(crate) fn inline_data(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }

    /// Web sources cited by the first candidate.
    pub(crate) fn source_links(&self) -> Vec<SourceLink> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter(|web| !web.uri.is_empty())
                    .map(|web| SourceLink {
                        title: web.title.clone(),
                        uri: web.uri.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }
}

/// JSON schema forcing the four report sections.
pub(crate) fn report_response_schema() -> Value {
    let properties = ReportSection::ALL
        .iter()
        .map(|section| (section.key().to_string(), json!({ "type": "STRING" })))
        .collect::<serde_json::Map<_, _>>();
    let required = ReportSection::ALL
        .iter()
        .map(|section| section.key())
        .collect::<Vec<_>>();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

pub(crate) fn report_request(
    observation: &TeacherObservation,
    rubric: &Rubric,
) -> GenerateContentRequest {
    let prompt_text = prompt::report_prompt(observation, rubric);
    let mut request = GenerateContentRequest::prompt(vec![Part::text(prompt_text)]);
    request.generation_config = Some(json!({
        "responseMimeType": "application/json",
        "responseSchema": report_response_schema(),
    }));
    request
}

pub(crate) fn chat_request(message: &str, history: &[ChatMessage]) -> GenerateContentRequest {
    let mut contents = history
        .iter()
        .map(|turn| Content {
            role: Some(turn.role.as_str().to_string()),
            parts: vec![Part::text(turn.text.clone())],
        })
        .collect::<Vec<_>>();
    contents.push(Content::user(vec![Part::text(message)]));

    GenerateContentRequest {
        contents,
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part::text(CHAT_SYSTEM_INSTRUCTION)],
        }),
        tools: vec![json!({ "googleSearch": {} })],
        generation_config: None,
    }
}

pub(crate) fn speech_request(text: &str, voice: &str) -> GenerateContentRequest {
    let mut request = GenerateContentRequest::prompt(vec![Part::text(prompt::speech_prompt(text))]);
    request.contents[0].role = None;
    request.generation_config = Some(json!({
        "responseModalities": ["AUDIO"],
        "speechConfig": {
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
        },
    }));
    request
}

/// `AiGateway` backed by the Generative Language REST API.
pub struct GeminiGateway {
    http_client: reqwest::Client,
    config: GatewayConfig,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("eduobserva/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn generate(
        &self,
        kind: &'static str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingApiKey)?;
        let url = format!("{}/models/{model}:generateContent", self.config.base_url);
        let started_at = Instant::now();
        debug!("event=ai_request module=gateway status=start kind={kind} model={model}");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                let err = GatewayError::Transport(err.to_string());
                log_failure(kind, model, started_at, &err);
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = GatewayError::Status {
                code: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            };
            log_failure(kind, model, started_at, &err);
            return Err(err);
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| {
                let err = GatewayError::MalformedResponse(err.to_string());
                log_failure(kind, model, started_at, &err);
                err
            })?;

        info!(
            "event=ai_request module=gateway status=ok kind={kind} model={model} duration_ms={} candidates={}",
            started_at.elapsed().as_millis(),
            parsed.candidates.len()
        );
        Ok(parsed)
    }
}

fn log_failure(kind: &str, model: &str, started_at: Instant, err: &GatewayError) {
    warn!(
        "event=ai_request module=gateway status=error kind={kind} model={model} duration_ms={} error_code={}",
        started_at.elapsed().as_millis(),
        err.code()
    );
}

#[async_trait]
impl AiGateway for GeminiGateway {
    async fn generate_report(
        &self,
        observation: &TeacherObservation,
        rubric: &Rubric,
    ) -> GatewayResult<AiReport> {
        let request = report_request(observation, rubric);
        let response = self
            .generate("report", &self.config.fast_model, &request)
            .await?;
        prompt::decode_report(&response.text())
    }

    async fn generate_suggestion(
        &self,
        dimension: &Dimension,
        scores: &BTreeMap<String, ObservationScore>,
    ) -> GatewayResult<String> {
        let request = GenerateContentRequest::prompt(vec![Part::text(prompt::suggestion_prompt(
            dimension, scores,
        ))]);
        let response = self
            .generate("suggestion", &self.config.fast_model, &request)
            .await?;
        Ok(response.text())
    }

    async fn analyze_image(&self, image: &[u8]) -> GatewayResult<String> {
        debug!("event=ai_image module=gateway status=start bytes={}", image.len());
        let request = GenerateContentRequest::prompt(vec![
            Part::inline(IMAGE_MIME_TYPE, image),
            Part::text(IMAGE_ANALYSIS_INSTRUCTION),
        ]);
        let response = self
            .generate("image_analysis", &self.config.pro_model, &request)
            .await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Ok(IMAGE_ANALYSIS_FALLBACK.to_string());
        }
        Ok(text)
    }

    async fn transcribe_audio(&self, audio: &[u8]) -> GatewayResult<String> {
        debug!("event=ai_audio module=gateway status=start bytes={}", audio.len());
        let request = GenerateContentRequest::prompt(vec![
            Part::inline(AUDIO_MIME_TYPE, audio),
            Part::text(TRANSCRIPTION_INSTRUCTION),
        ]);
        let response = self
            .generate("transcription", &self.config.fast_model, &request)
            .await?;
        Ok(response.text())
    }

    async fn chat(&self, message: &str, history: &[ChatMessage]) -> GatewayResult<ChatReply> {
        let request = chat_request(message, history);
        let response = self
            .generate("chat", &self.config.pro_model, &request)
            .await?;
        Ok(ChatReply {
            text: response.text(),
            source_links: response.source_links(),
        })
    }

    async fn speak(&self, text: &str) -> GatewayResult<SpeechClip> {
        let request = speech_request(text, &self.config.voice);
        let response = self
            .generate("speech", &self.config.tts_model, &request)
            .await?;
        let inline = response.inline_data().ok_or(GatewayError::EmptyResponse)?;
        let pcm = BASE64
            .decode(inline.data.as_bytes())
            .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?;
        Ok(SpeechClip {
            pcm,
            sample_rate: SPEECH_SAMPLE_RATE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        chat_request, report_response_schema, speech_request, GenerateContentRequest,
        GenerateContentResponse, GeminiGateway, Part,
    };
    use crate::config::GatewayConfig;
    use crate::gateway::{AiGateway, GatewayError};
    use crate::model::chat::ChatMessage;

    #[test]
    fn inline_part_serializes_base64_with_camel_case_keys() {
        let request = GenerateContentRequest::prompt(vec![
            Part::inline("image/jpeg", b"abc"),
            Part::text("describe"),
        ]);
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "YWJj");
        assert_eq!(parts[1]["text"], "describe");
        assert!(json.get("tools").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn report_schema_requires_all_sections() {
        let schema = report_response_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert_eq!(schema["properties"]["dialogueProposal"]["type"], "STRING");
    }

    #[test]
    fn chat_request_replays_history_then_appends_message() {
        let history = vec![ChatMessage::model("hola"), ChatMessage::user("pregunta")];
        let json = serde_json::to_value(chat_request("nueva", &history)).unwrap();
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "nueva");
        assert!(json["tools"][0].get("googleSearch").is_some());
        assert!(json["systemInstruction"]["parts"][0]["text"].is_string());
    }

    #[test]
    fn speech_request_asks_for_audio_with_voice() {
        let json = serde_json::to_value(speech_request("texto", "Kore")).unwrap();
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Lee profesionalmente: texto");
    }

    #[test]
    fn response_extracts_text_and_grounding_links() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hola "}, {"text": "mundo"}]},
                    "groundingMetadata": {"groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"retrievedContext": {}},
                        {"web": {"uri": "", "title": "sin uri"}}
                    ]}
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Hola mundo");
        let links = response.source_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].uri, "https://a.example");
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
        assert!(response.inline_data().is_none());
        assert!(response.source_links().is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let gateway = GeminiGateway::new(GatewayConfig::default()).unwrap();
        let err = gateway.transcribe_audio(b"RIFF").await.unwrap_err();
        assert_eq!(err, GatewayError::MissingApiKey);
    }
}
