//! Pedagogical assistant chat session.
//!
//! # Invariants
//! - The transcript always starts with the assistant greeting.
//! - At most one request is in flight; input sent meanwhile is refused.
//! - Every accepted user turn is followed by exactly one model turn, either
//!   the reply or the apology message.

use crate::gateway::AiGateway;
use crate::model::chat::{ChatMessage, ChatReply};
use log::{info, warn};

pub const CHAT_GREETING: &str = "¡Hola! Soy tu asistente pedagógico. ¿En qué puedo ayudarte hoy con tus supervisiones o estrategias educativas?";
pub const CHAT_APOLOGY: &str = "Lo siento, hubo un error al procesar tu consulta.";

/// Result of one `ChatSession::send` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The gateway answered and the reply was appended.
    Replied,
    /// The gateway failed and the apology was appended.
    Apologized,
    /// Blank input; nothing changed.
    IgnoredBlank,
    /// Another request is in flight; nothing changed.
    Busy,
}

/// Chat transcript plus in-flight state.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    in_flight: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_history(Vec::new())
    }

    /// Restores a session from a prior transcript.
    ///
    /// The greeting is inserted when `history` does not already start with it.
    pub fn with_history(history: Vec<ChatMessage>) -> Self {
        let greeting = ChatMessage::model(CHAT_GREETING);
        let mut messages = Vec::with_capacity(history.len() + 1);
        if history.first() != Some(&greeting) {
            messages.push(greeting);
        }
        messages.extend(history);
        Self {
            messages,
            in_flight: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Appends the user turn and returns the prior transcript to send.
    ///
    /// Blank input and input sent while busy are refused with the matching
    /// outcome and leave the transcript unchanged.
    pub fn begin_send(&mut self, message: &str) -> Result<Vec<ChatMessage>, SendOutcome> {
        if message.trim().is_empty() {
            return Err(SendOutcome::IgnoredBlank);
        }
        if self.in_flight {
            return Err(SendOutcome::Busy);
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(message));
        self.in_flight = true;
        Ok(history)
    }

    /// Appends the model turn for a finished request.
    pub fn complete_send(&mut self, reply: Option<ChatReply>) -> SendOutcome {
        self.in_flight = false;
        match reply {
            Some(reply) => {
                self.messages.push(ChatMessage {
                    source_links: reply.source_links,
                    ..ChatMessage::model(reply.text)
                });
                SendOutcome::Replied
            }
            None => {
                self.messages.push(ChatMessage::model(CHAT_APOLOGY));
                SendOutcome::Apologized
            }
        }
    }

    /// Sends one user message and waits for the reply.
    pub async fn send<G: AiGateway + ?Sized>(&mut self, gateway: &G, message: &str) -> SendOutcome {
        let history = match self.begin_send(message) {
            Ok(history) => history,
            Err(outcome) => return outcome,
        };

        let reply = match gateway.chat(message, &history).await {
            Ok(reply) => {
                info!(
                    "event=chat_reply module=chat status=ok turns={} sources={}",
                    history.len() + 1,
                    reply.source_links.len()
                );
                Some(reply)
            }
            Err(err) => {
                warn!(
                    "event=chat_reply module=chat status=error error_code={}",
                    err.code()
                );
                None
            }
        };
        self.complete_send(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatSession, SendOutcome, CHAT_APOLOGY, CHAT_GREETING};
    use crate::model::chat::{ChatMessage, ChatReply, ChatRole};

    #[test]
    fn new_session_starts_with_greeting() {
        let session = ChatSession::new();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, ChatRole::Model);
        assert_eq!(session.messages()[0].text, CHAT_GREETING);
    }

    #[test]
    fn restored_history_keeps_single_greeting() {
        let first = ChatSession::new();
        let restored = ChatSession::with_history(first.messages().to_vec());
        assert_eq!(restored.messages().len(), 1);

        let restored = ChatSession::with_history(vec![ChatMessage::user("hola")]);
        assert_eq!(restored.messages().len(), 2);
        assert_eq!(restored.messages()[0].text, CHAT_GREETING);
    }

    #[test]
    fn begin_send_refuses_blank_and_busy() {
        let mut session = ChatSession::new();
        assert_eq!(session.begin_send("   "), Err(SendOutcome::IgnoredBlank));

        let history = session.begin_send("pregunta").expect("first send accepted");
        assert_eq!(history.len(), 1);
        assert_eq!(session.begin_send("otra"), Err(SendOutcome::Busy));
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn complete_send_appends_reply_or_apology() {
        let mut session = ChatSession::new();
        session.begin_send("uno").expect("accepted");
        let outcome = session.complete_send(Some(ChatReply {
            text: "respuesta".to_string(),
            source_links: Vec::new(),
        }));
        assert_eq!(outcome, SendOutcome::Replied);
        assert!(!session.is_in_flight());

        session.begin_send("dos").expect("accepted");
        assert_eq!(session.complete_send(None), SendOutcome::Apologized);
        assert_eq!(session.messages().last().map(|m| m.text.as_str()), Some(CHAT_APOLOGY));
        assert_eq!(session.messages().len(), 5);
    }
}
