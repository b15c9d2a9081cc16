#![allow(dead_code)]

use async_trait::async_trait;
use eduobserva_core::gateway::{AiGateway, GatewayError, GatewayResult};
use eduobserva_core::model::rubric::{Criterion, Dimension, Rubric};
use eduobserva_core::{
    AiReport, ChatMessage, ChatReply, ObservationScore, SpeechClip, TeacherObservation,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Two dimensions with two criteria each: `d1` (`c1`, `c2`), `d2` (`c3`, `c4`).
pub fn small_rubric() -> Rubric {
    Rubric::new(vec![
        Dimension::new(
            "d1",
            "Dimensión Uno",
            "Book",
            vec![
                Criterion::new("c1", "Criterio 1", "Primero"),
                Criterion::new("c2", "Criterio 2", "Segundo"),
            ],
        ),
        Dimension::new(
            "d2",
            "Dimensión Dos",
            "Users",
            vec![
                Criterion::new("c3", "Criterio 3", "Tercero"),
                Criterion::new("c4", "Criterio 4", "Cuarto"),
            ],
        ),
    ])
    .unwrap()
}

/// Gateway double answering from canned results and recording calls.
#[derive(Default)]
pub struct FakeGateway {
    pub text: Option<String>,
    pub report: Option<AiReport>,
    pub chat_reply: Option<ChatReply>,
    pub calls: Mutex<Vec<String>>,
    pub last_history_len: Mutex<Option<usize>>,
}

impl FakeGateway {
    pub fn answering(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn text_result(&self) -> GatewayResult<String> {
        self.text
            .clone()
            .ok_or_else(|| GatewayError::Transport("offline".to_string()))
    }
}

#[async_trait]
impl AiGateway for FakeGateway {
    async fn generate_report(
        &self,
        _observation: &TeacherObservation,
        _rubric: &Rubric,
    ) -> GatewayResult<AiReport> {
        self.record("report");
        self.report
            .clone()
            .ok_or_else(|| GatewayError::MalformedResponse("missing field".to_string()))
    }

    async fn generate_suggestion(
        &self,
        _dimension: &Dimension,
        _scores: &BTreeMap<String, ObservationScore>,
    ) -> GatewayResult<String> {
        self.record("suggestion");
        self.text_result()
    }

    async fn analyze_image(&self, _image: &[u8]) -> GatewayResult<String> {
        self.record("image");
        self.text_result()
    }

    async fn transcribe_audio(&self, _audio: &[u8]) -> GatewayResult<String> {
        self.record("audio");
        self.text_result()
    }

    async fn chat(&self, _message: &str, history: &[ChatMessage]) -> GatewayResult<ChatReply> {
        self.record("chat");
        *self.last_history_len.lock().unwrap() = Some(history.len());
        self.chat_reply
            .clone()
            .ok_or_else(|| GatewayError::Status {
                code: 503,
                body: "unavailable".to_string(),
            })
    }

    async fn speak(&self, _text: &str) -> GatewayResult<SpeechClip> {
        self.record("speak");
        Err(GatewayError::EmptyResponse)
    }
}
