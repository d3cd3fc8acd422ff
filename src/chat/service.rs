// Chat round-trip: relay the transcript for a reply, then persist the pair
use super::{expand_records, ChatMessage, ChatRecord, ChatRole, RelayMessage, RelayReply, SIGNED_OUT_GREETING};
use crate::error::{AppError, Result};
use crate::session::Session;
use async_trait::async_trait;

/// Most recent transcript messages relayed with a new utterance, the utterance included.
pub const RELAY_WINDOW: usize = 20;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, token: &str, messages: &[RelayMessage]) -> Result<RelayReply>;
    async fn append_record(&self, token: &str, message: &str, response: &str) -> Result<()>;
    async fn records(&self, token: &str) -> Result<Vec<ChatRecord>>;
}

/// State behind the chat widget: the visible transcript plus the last user-facing notice.
pub struct ChatService<B> {
    backend: B,
    transcript: Vec<ChatMessage>,
    notice: Option<String>,
}

impl<B: ChatBackend> ChatService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            transcript: vec![ChatMessage::assistant(SIGNED_OUT_GREETING)],
            notice: None,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replaces the transcript with the stored history. Signed-out users get a greeting
    /// and no request is made.
    pub async fn load_history(&mut self, session: Option<&Session>) -> Result<&[ChatMessage]> {
        let Some(session) = session else {
            self.transcript = vec![ChatMessage::assistant(SIGNED_OUT_GREETING)];
            return Ok(&self.transcript);
        };

        match self.backend.records(&session.token).await {
            Ok(records) => {
                tracing::debug!("Loaded {} chat records for user {}", records.len(), session.user.id);
                self.transcript = expand_records(records);
                Ok(&self.transcript)
            }
            Err(e) => {
                tracing::error!("Error fetching chat history: {}", e);
                self.notice = Some(e.user_message().to_string());
                Err(e)
            }
        }
    }

    /// Sends one utterance and appends the assistant reply. Blank input is ignored.
    ///
    /// Nothing leaves the process when `session` is `None`. The pair is persisted only after
    /// the reply arrives; a failed write is logged and the turn is simply missing on reload.
    pub async fn send(&mut self, session: Option<&Session>, content: &str) -> Result<Option<&ChatMessage>> {
        let Some(session) = session else {
            let err = AppError::Unauthenticated;
            self.notice = Some(err.user_message().to_string());
            return Err(err);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        self.notice = None;
        self.transcript.push(ChatMessage::user(content));

        let outgoing = relay_window(&self.transcript);

        let reply = match self.backend.complete(&session.token, &outgoing).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Error in send_message: {}", e);
                self.notice = Some(e.user_message().to_string());
                return Err(e);
            }
        };

        self.transcript.push(ChatMessage::assistant(reply.content.clone()));

        if let Err(e) = self
            .backend
            .append_record(&session.token, content, &reply.content)
            .await
        {
            tracing::warn!("Chat turn for user {} was not persisted: {}", session.user.id, e);
        }

        Ok(self.transcript.last())
    }
}

/// The tail of the transcript the model gets to see; long histories stay within its context.
fn relay_window(transcript: &[ChatMessage]) -> Vec<RelayMessage> {
    let relayable: Vec<&ChatMessage> = transcript
        .iter()
        .filter(|message| message.role != ChatRole::System)
        .collect();
    let skip = relayable.len().saturating_sub(RELAY_WINDOW);
    relayable[skip..].iter().copied().map(RelayMessage::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::EMPTY_HISTORY_GREETING;
    use crate::error::{GENERIC_FAILURE, SIGN_IN_REQUIRED};
    use crate::session::tests::session_for;
    use crate::session::UserRole;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        network_calls: AtomicUsize,
        stored: Mutex<Vec<ChatRecord>>,
        seen: Mutex<Vec<Vec<RelayMessage>>>,
        fail_completion: bool,
        fail_persist: bool,
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn complete(&self, _token: &str, messages: &[RelayMessage]) -> Result<RelayReply> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(messages.to_vec());
            if self.fail_completion {
                return Err(AppError::Upstream { status: 500, message: "boom".to_string() });
            }
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(RelayReply { content: format!("echo: {}", last), role: ChatRole::Assistant })
        }

        async fn append_record(&self, _token: &str, message: &str, response: &str) -> Result<()> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_persist {
                return Err(AppError::Upstream { status: 503, message: "unavailable".to_string() });
            }
            self.stored.lock().unwrap().push(ChatRecord {
                message: message.to_string(),
                response: response.to_string(),
                timestamp: Utc::now(),
            });
            Ok(())
        }

        async fn records(&self, _token: &str) -> Result<Vec<ChatRecord>> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.stored.lock().unwrap().clone())
        }
    }

    fn signed_in() -> Session {
        session_for("sam@example.com", UserRole::User)
    }

    #[tokio::test]
    async fn test_signed_out_send_never_touches_network() {
        let mut chat = ChatService::new(FakeBackend::default());
        let before = chat.transcript().to_vec();

        let err = chat.send(None, "hello?").await.unwrap_err();

        assert!(matches!(err, AppError::Unauthenticated));
        assert_eq!(chat.backend().network_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chat.transcript(), before.as_slice());
        assert_eq!(chat.notice(), Some(SIGN_IN_REQUIRED));
    }

    #[tokio::test]
    async fn test_send_appends_reply_and_persists_pair() {
        let mut chat = ChatService::new(FakeBackend::default());
        let session = signed_in();

        let reply = chat.send(Some(&session), "plan my day").await.unwrap().cloned().unwrap();

        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "echo: plan my day");
        let stored = chat.backend().stored.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "plan my day");
        assert_eq!(stored[0].response, "echo: plan my day");

        // greeting + user + assistant
        assert_eq!(chat.transcript().len(), 3);
        let sent = chat.backend().seen.lock().unwrap()[0].clone();
        assert_eq!(sent.last().unwrap().role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces_generic_notice() {
        let backend = FakeBackend { fail_completion: true, ..Default::default() };
        let mut chat = ChatService::new(backend);
        let session = signed_in();

        assert!(chat.send(Some(&session), "hi").await.is_err());

        assert_eq!(chat.notice(), Some(GENERIC_FAILURE));
        assert_eq!(chat.transcript().last().unwrap().role, ChatRole::User);
        assert!(chat.backend().stored.lock().unwrap().is_empty());
        // one attempt, no retry
        assert_eq!(chat.backend().network_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_visible_reply() {
        let backend = FakeBackend { fail_persist: true, ..Default::default() };
        let mut chat = ChatService::new(backend);
        let session = signed_in();

        let reply = chat.send(Some(&session), "remember this").await.unwrap().cloned();
        assert!(reply.is_some());
        assert_eq!(chat.notice(), None);

        chat.load_history(Some(&session)).await.unwrap();
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript()[0].content, EMPTY_HISTORY_GREETING);
    }

    #[tokio::test]
    async fn test_history_round_trip_preserves_turns() {
        let mut chat = ChatService::new(FakeBackend::default());
        let session = signed_in();

        chat.send(Some(&session), "one").await.unwrap();
        chat.send(Some(&session), "two").await.unwrap();
        let live: Vec<(ChatRole, String)> = chat.transcript()[1..]
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect();

        let reloaded: Vec<(ChatRole, String)> = chat
            .load_history(Some(&session))
            .await
            .unwrap()
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect();

        assert_eq!(reloaded, live);
    }

    #[tokio::test]
    async fn test_signed_out_history_is_greeting_only() {
        let mut chat = ChatService::new(FakeBackend::default());
        let history = chat.load_history(None).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, SIGNED_OUT_GREETING);
        assert_eq!(chat.backend().network_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_history_is_relayed_as_recent_window() {
        let backend = FakeBackend::default();
        {
            let mut stored = backend.stored.lock().unwrap();
            for i in 0..2000 {
                stored.push(ChatRecord {
                    message: format!("question {}", i),
                    response: format!("answer {}", i),
                    timestamp: Utc::now(),
                });
            }
        }
        let mut chat = ChatService::new(backend);
        let session = signed_in();

        chat.load_history(Some(&session)).await.unwrap();
        chat.send(Some(&session), "what next?").await.unwrap();

        let sent = chat.backend().seen.lock().unwrap()[0].clone();
        assert_eq!(sent.len(), RELAY_WINDOW);
        assert_eq!(sent.last().unwrap().content, "what next?");
        assert_eq!(sent[sent.len() - 2].content, "answer 1999");
        // the full history is still shown
        assert_eq!(chat.transcript().len(), 4002);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mut chat = ChatService::new(FakeBackend::default());
        let session = signed_in();

        assert!(chat.send(Some(&session), "   ").await.unwrap().is_none());
        assert_eq!(chat.backend().network_calls.load(Ordering::SeqCst), 0);
    }
}
