//! Generative-AI gateway boundary.
//!
//! # Responsibility
//! - Define the request shapes the core consumes from the AI provider.
//! - Classify provider failures into one `GatewayError` taxonomy with a
//!   user-facing message.
//!
//! # Invariants
//! - Gateway failures are never fatal to the caller; they are returned for
//!   the call site to turn into text or a retryable state.
//! - No automatic retry or backoff happens inside the gateway.

use crate::model::chat::{ChatMessage, ChatReply, SpeechClip};
use crate::model::observation::{ObservationScore, TeacherObservation};
use crate::model::report::AiReport;
use crate::model::rubric::{Dimension, Rubric};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Generic message shown when any AI call fails.
pub const GATEWAY_FAILURE_MESSAGE: &str = "Error al conectar con la IA.";

/// AI provider call failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No API key configured.
    MissingApiKey,
    /// Network, TLS or timeout failure before a response arrived.
    Transport(String),
    /// Provider answered with a non-success status.
    Status { code: u16, body: String },
    /// Provider answered without usable content.
    EmptyResponse,
    /// Response content does not match the expected shape.
    MalformedResponse(String),
}

impl GatewayError {
    /// Text for the affected UI region.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "La clave de acceso a la IA no está configurada.",
            Self::MalformedResponse(_) => "La IA devolvió una respuesta con formato inválido.",
            Self::Transport(_) | Self::Status { .. } | Self::EmptyResponse => {
                GATEWAY_FAILURE_MESSAGE
            }
        }
    }

    /// Stable, content-free code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "missing_api_key",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::EmptyResponse => "empty_response",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "AI gateway API key is not configured"),
            Self::Transport(details) => write!(f, "AI gateway transport error: {details}"),
            Self::Status { code, body } => write!(f, "AI gateway returned status {code}: {body}"),
            Self::EmptyResponse => write!(f, "AI gateway returned no content"),
            Self::MalformedResponse(details) => {
                write!(f, "AI gateway returned malformed content: {details}")
            }
        }
    }
}

impl Error for GatewayError {}

/// Requests the core makes to the generative-AI provider.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Generates the four-section narrative report for one observation.
    async fn generate_report(
        &self,
        observation: &TeacherObservation,
        rubric: &Rubric,
    ) -> GatewayResult<AiReport>;

    /// Suggests improvements for one dimension from the draft scores.
    async fn generate_suggestion(
        &self,
        dimension: &Dimension,
        scores: &BTreeMap<String, ObservationScore>,
    ) -> GatewayResult<String>;

    /// Describes the teaching practice visible in a JPEG image.
    async fn analyze_image(&self, image: &[u8]) -> GatewayResult<String>;

    /// Transcribes a WAV audio clip.
    async fn transcribe_audio(&self, audio: &[u8]) -> GatewayResult<String>;

    /// Answers one assistant turn given the prior transcript.
    async fn chat(&self, message: &str, history: &[ChatMessage]) -> GatewayResult<ChatReply>;

    /// Synthesizes speech for read-aloud.
    async fn speak(&self, text: &str) -> GatewayResult<SpeechClip>;
}
