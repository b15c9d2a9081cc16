//! Chat transcript and speech payload types.

use serde::{Deserialize, Serialize};

/// Author of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    /// Role name expected by the generative-AI API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// Web source cited by a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub uri: String,
}

/// One turn of the assistant conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_links: Vec<SourceLink>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            source_links: Vec::new(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            source_links: Vec::new(),
        }
    }
}

/// Gateway answer to a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub source_links: Vec<SourceLink>,
}

/// Synthesized speech as raw PCM for the host to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechClip {
    /// 16-bit little-endian mono PCM.
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl SpeechClip {
    /// Decodes the PCM payload into samples. A trailing odd byte is dropped.
    pub fn samples(&self) -> Vec<i16> {
        self.pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// Playback length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.pcm.len() as u64 / 2) * 1000 / u64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::SpeechClip;

    #[test]
    fn samples_decode_little_endian_pairs() {
        let clip = SpeechClip {
            pcm: vec![0x01, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x09],
            sample_rate: 24_000,
        };
        assert_eq!(clip.samples(), vec![1, i16::MAX, i16::MIN]);
    }

    #[test]
    fn duration_uses_sample_rate() {
        let clip = SpeechClip {
            pcm: vec![0; 48_000],
            sample_rate: 24_000,
        };
        assert_eq!(clip.duration_ms(), 1000);
    }
}
