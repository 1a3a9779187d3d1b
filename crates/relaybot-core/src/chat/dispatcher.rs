//! Per-session mailboxes that keep each chat's requests in arrival order.
//!
//! Every session key gets a bounded `mpsc` mailbox drained by one worker
//! task, so a session's requests run strictly one after another while
//! different sessions run on their own tasks. Replies go out through a
//! [`ReplySink`] implemented by the front-end.
//!
//! A worker whose mailbox stays empty for the idle timeout retires and
//! removes its mailbox; the next request for that session spawns a new one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use relaybot_types::chat::SessionKey;

use super::orchestrator::TurnOrchestrator;

/// Buffer size for per-session mailboxes.
const MAILBOX_BUFFER: usize = 32;

/// How long an idle session worker lives before retiring.
pub const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

type Mailboxes = DashMap<SessionKey, mpsc::Sender<SessionRequest>>;

/// Work item queued for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    /// A plain user message to send through the model.
    UserTurn(String),
    /// Clear the session history.
    Reset,
    /// Check that the inference backend is reachable.
    CheckInference,
    /// Fixed text delivered in turn, without touching history or the model.
    Notice(String),
}

/// Errors from dispatching into a session mailbox.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The session already has a full backlog of pending requests.
    #[error("mailbox full for session {0}")]
    MailboxFull(SessionKey),

    /// The session worker is gone and could not be restarted.
    #[error("session worker for {0} is not running")]
    WorkerGone(SessionKey),
}

/// Front-end side of the dispatcher: where replies are delivered.
pub trait ReplySink: Send + Sync + 'static {
    /// Deliver `text` to the chat identified by `key`.
    fn deliver(&self, key: &SessionKey, text: String) -> impl Future<Output = ()> + Send;

    /// Called right before a user turn goes to the model (typing indicators).
    fn turn_started(&self, _key: &SessionKey) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Routes requests into per-session mailboxes, spawning workers lazily.
pub struct SessionDispatcher<S: ReplySink> {
    orchestrator: Arc<TurnOrchestrator>,
    sink: Arc<S>,
    mailboxes: Arc<Mailboxes>,
    idle_timeout: Duration,
}

impl<S: ReplySink> SessionDispatcher<S> {
    pub fn new(orchestrator: Arc<TurnOrchestrator>, sink: Arc<S>) -> Self {
        Self {
            orchestrator,
            sink,
            mailboxes: Arc::new(DashMap::new()),
            idle_timeout: WORKER_IDLE_TIMEOUT,
        }
    }

    /// Override how long an idle worker waits before retiring.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Queue `request` behind any pending work for the same session.
    ///
    /// Returns immediately; the reply is delivered through the sink.
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, key: SessionKey, request: SessionRequest) -> Result<(), DispatchError> {
        let sender = self.mailbox(&key);
        match sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DispatchError::MailboxFull(key)),
            Err(TrySendError::Closed(request)) => {
                // The worker retired between lookup and send; replace it once.
                debug!(session = %key, "session worker retired, restarting");
                self.mailboxes
                    .remove_if(&key, |_, current| current.same_channel(&sender));
                match self.mailbox(&key).try_send(request) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Full(_)) => Err(DispatchError::MailboxFull(key)),
                    Err(TrySendError::Closed(_)) => Err(DispatchError::WorkerGone(key)),
                }
            }
        }
    }

    /// Number of sessions with a live worker.
    pub fn active_sessions(&self) -> usize {
        self.mailboxes.len()
    }

    /// Drop every mailbox; workers finish their backlog and exit.
    pub fn close(&self) {
        self.mailboxes.clear();
    }

    fn mailbox(&self, key: &SessionKey) -> mpsc::Sender<SessionRequest> {
        self.mailboxes
            .entry(key.clone())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::channel(MAILBOX_BUFFER);
                let worker = SessionWorker {
                    key: key.clone(),
                    own_mailbox: tx.downgrade(),
                    mailboxes: self.mailboxes.clone(),
                    orchestrator: self.orchestrator.clone(),
                    sink: self.sink.clone(),
                    idle_timeout: self.idle_timeout,
                };
                tokio::spawn(worker.run(rx));
                debug!(session = %key, "spawned session worker");
                tx
            })
            .clone()
    }
}

struct SessionWorker<S: ReplySink> {
    key: SessionKey,
    own_mailbox: mpsc::WeakSender<SessionRequest>,
    mailboxes: Arc<Mailboxes>,
    orchestrator: Arc<TurnOrchestrator>,
    sink: Arc<S>,
    idle_timeout: Duration,
}

impl<S: ReplySink> SessionWorker<S> {
    async fn run(self, mut rx: mpsc::Receiver<SessionRequest>) {
        loop {
            match tokio::time::timeout(self.idle_timeout, rx.recv()).await {
                Ok(Some(request)) => self.handle(request).await,
                Ok(None) => break,
                Err(_) => {
                    self.retire();
                    rx.close();
                    // Requests sent just before the close are still buffered.
                    while let Some(request) = rx.recv().await {
                        self.handle(request).await;
                    }
                    break;
                }
            }
        }
        debug!(session = %self.key, "session worker stopped");
    }

    /// Remove this worker's mailbox unless it was already replaced.
    fn retire(&self) {
        self.mailboxes.remove_if(&self.key, |_, current| {
            self.own_mailbox
                .upgrade()
                .is_some_and(|own| own.same_channel(current))
        });
        debug!(session = %self.key, "session worker idle, retiring");
    }

    async fn handle(&self, request: SessionRequest) {
        let key = &self.key;
        let reply = match request {
            SessionRequest::UserTurn(text) => {
                self.sink.turn_started(key).await;
                self.orchestrator.handle_user_turn(key, &text).await
            }
            SessionRequest::Reset => self.orchestrator.reset(key).await,
            SessionRequest::CheckInference => self.orchestrator.check_inference().await,
            SessionRequest::Notice(text) => text,
        };
        self.sink.deliver(key, reply).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use relaybot_types::chat::TrimPolicy;
    use relaybot_types::config::ReplyConfig;
    use relaybot_types::llm::{InferenceError, Message};
    use tokio::sync::Notify;

    use crate::chat::orchestrator::TurnSettings;
    use crate::chat::store::ConversationStore;
    use crate::llm::box_client::BoxInferenceClient;
    use crate::llm::provider::InferenceClient;

    struct SlowEcho;

    impl InferenceClient for SlowEcho {
        fn name(&self) -> &str {
            "slow-echo"
        }

        fn model(&self) -> &str {
            "slow-echo-1"
        }

        async fn complete(&self, messages: &[Message]) -> Result<String, InferenceError> {
            // Earlier messages sleep longer, so any reordering would show.
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let n: u64 = last.trim_start_matches('m').parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(50 - n * 10)).await;
            Ok(format!("re:{last}"))
        }

        async fn health_check(&self) -> Result<(), InferenceError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: StdMutex<Vec<(SessionKey, String)>>,
        typing: StdMutex<Vec<SessionKey>>,
        notify: Notify,
    }

    impl RecordingSink {
        async fn wait_for(&self, count: usize) -> Vec<(SessionKey, String)> {
            loop {
                let notified = self.notify.notified();
                {
                    let delivered = self.delivered.lock().unwrap();
                    if delivered.len() >= count {
                        return delivered.clone();
                    }
                }
                notified.await;
            }
        }
    }

    impl ReplySink for RecordingSink {
        async fn deliver(&self, key: &SessionKey, text: String) {
            self.delivered.lock().unwrap().push((key.clone(), text));
            self.notify.notify_waiters();
        }

        async fn turn_started(&self, key: &SessionKey) {
            self.typing.lock().unwrap().push(key.clone());
        }
    }

    fn dispatcher() -> (SessionDispatcher<RecordingSink>, Arc<RecordingSink>) {
        let store = Arc::new(ConversationStore::new(20, TrimPolicy::Pinned).unwrap());
        let orchestrator = Arc::new(TurnOrchestrator::new(
            store,
            Arc::new(BoxInferenceClient::new(SlowEcho)),
            TurnSettings {
                system_prompt: "S".to_string(),
                inference_timeout: Duration::from_secs(5),
                replies: ReplyConfig::default(),
            },
        ));
        let sink = Arc::new(RecordingSink::default());
        (SessionDispatcher::new(orchestrator, sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_replies_arrive_in_dispatch_order() {
        let (dispatcher, sink) = dispatcher();
        let k = SessionKey::from(7_i64);

        for i in 0..4 {
            dispatcher
                .dispatch(k.clone(), SessionRequest::UserTurn(format!("m{i}")))
                .unwrap();
        }

        let delivered = tokio::time::timeout(Duration::from_secs(5), sink.wait_for(4))
            .await
            .unwrap();
        let texts: Vec<&str> = delivered.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["re:m0", "re:m1", "re:m2", "re:m3"]);
        assert_eq!(sink.typing.lock().unwrap().len(), 4);
        assert_eq!(dispatcher.active_sessions(), 1);
    }

    #[tokio::test]
    async fn test_reset_is_ordered_behind_pending_turn() {
        let (dispatcher, sink) = dispatcher();
        let k = SessionKey::from("ordered");

        dispatcher
            .dispatch(k.clone(), SessionRequest::UserTurn("m0".to_string()))
            .unwrap();
        dispatcher.dispatch(k.clone(), SessionRequest::Reset).unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), sink.wait_for(2))
            .await
            .unwrap();
        assert_eq!(delivered[0].1, "re:m0");
        assert_eq!(delivered[1].1, ReplyConfig::default().reset_confirmation);
        // The reset ran after the turn, so nothing from the turn survives.
        assert!(dispatcher.orchestrator.store().get_history(&k).is_empty());
    }

    #[tokio::test]
    async fn test_each_session_gets_its_own_worker() {
        let (dispatcher, sink) = dispatcher();

        dispatcher
            .dispatch(SessionKey::from("a"), SessionRequest::UserTurn("m1".to_string()))
            .unwrap();
        dispatcher
            .dispatch(SessionKey::from("b"), SessionRequest::CheckInference)
            .unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), sink.wait_for(2))
            .await
            .unwrap();
        assert_eq!(dispatcher.active_sessions(), 2);
        assert!(delivered.contains(&(SessionKey::from("a"), "re:m1".to_string())));
        assert!(delivered.contains(&(
            SessionKey::from("b"),
            "slow-echo connected!\nModel: slow-echo-1".to_string()
        )));

        dispatcher.close();
        assert_eq!(dispatcher.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_notice_is_ordered_behind_pending_turn() {
        let (dispatcher, sink) = dispatcher();
        let k = SessionKey::from("notice");

        dispatcher
            .dispatch(k.clone(), SessionRequest::UserTurn("m0".to_string()))
            .unwrap();
        dispatcher
            .dispatch(k.clone(), SessionRequest::Notice("hello".to_string()))
            .unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), sink.wait_for(2))
            .await
            .unwrap();
        assert_eq!(delivered[0].1, "re:m0");
        assert_eq!(delivered[1].1, "hello");
        // Notices never reach the history.
        let history = dispatcher.orchestrator.store().get_history(&k);
        assert!(history.iter().all(|m| m.content != "hello"));
        assert_eq!(sink.typing.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_retires_and_restarts_on_demand() {
        let (dispatcher, sink) = dispatcher();
        let dispatcher = dispatcher.with_idle_timeout(Duration::from_secs(60));
        let k = SessionKey::from("idle");

        dispatcher
            .dispatch(k.clone(), SessionRequest::UserTurn("m1".to_string()))
            .unwrap();
        sink.wait_for(1).await;
        assert_eq!(dispatcher.active_sessions(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        for _ in 0..100 {
            if dispatcher.active_sessions() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(dispatcher.active_sessions(), 0);

        // History outlives the worker; the next request gets a fresh worker.
        dispatcher
            .dispatch(k.clone(), SessionRequest::UserTurn("m2".to_string()))
            .unwrap();
        let delivered = sink.wait_for(2).await;
        assert_eq!(delivered[1].1, "re:m2");
        assert_eq!(dispatcher.active_sessions(), 1);
        assert_eq!(dispatcher.orchestrator.store().len(&k), 5);
    }

    #[tokio::test]
    async fn test_full_mailbox_is_reported() {
        let (dispatcher, _sink) = dispatcher();
        let k = SessionKey::from("flood");

        let mut full = None;
        for i in 0..(MAILBOX_BUFFER + 8) {
            if let Err(e) = dispatcher.dispatch(k.clone(), SessionRequest::UserTurn(format!("m{}", i % 5))) {
                full = Some(e);
                break;
            }
        }
        assert!(matches!(full, Some(DispatchError::MailboxFull(_))));
    }
}
