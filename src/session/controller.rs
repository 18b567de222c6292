use std::sync::{Arc, Weak};

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::models::{Conversation, Message};
use crate::api::{ChatGateway, GatewayError};
use crate::identity::UserId;
use crate::render::Suggestion;
use crate::session::{
    ActiveSession, ConversationList, FailureKind, RejectReason, SendOutcome, SessionSnapshot,
};

struct Inner {
    gateway: Arc<dyn ChatGateway>,
    user_id: UserId,
    session: Mutex<ActiveSession>,
    conversations: RwLock<ConversationList>,
    refresh: Mutex<Option<JoinHandle<()>>>,
    revision: watch::Sender<u64>,
    shutdown: CancellationToken,
}

impl Inner {
    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Drives the active session and the conversation list against a gateway.
///
/// Cheap to clone; all clones share one session. A send that has been
/// dispatched runs to completion even if the caller stops awaiting it, and
/// background list refreshes are cancelled once the last clone is dropped.
#[derive(Clone)]
pub struct ChatController {
    inner: Arc<Inner>,
}

impl ChatController {
    pub fn new(gateway: Arc<dyn ChatGateway>, user_id: UserId) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                gateway,
                user_id,
                session: Mutex::new(ActiveSession::default()),
                conversations: RwLock::new(ConversationList::default()),
                refresh: Mutex::new(None),
                revision,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Revision counter bumped after every visible state change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.lock().await.snapshot()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.inner.conversations.read().await.items().to_vec()
    }

    pub async fn search_conversations(&self, query: &str) -> Vec<Conversation> {
        self.inner
            .conversations
            .read()
            .await
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Title of the open conversation, if the list knows it.
    pub async fn active_title(&self) -> Option<String> {
        let active = self
            .inner
            .session
            .lock()
            .await
            .conversation_id()
            .map(str::to_string);
        self.inner
            .conversations
            .read()
            .await
            .active_title(active.as_deref())
            .map(str::to_string)
    }

    pub async fn send_suggestion(&self, suggestion: &Suggestion) -> SendOutcome {
        self.send(&suggestion.prompt()).await
    }

    /// Appends `content` optimistically, posts it and appends the reply or a
    /// fallback message. The user message is never rolled back.
    pub async fn send(&self, content: &str) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Rejected(RejectReason::Empty);
        }

        let (conversation_id, epoch) = {
            let mut session = self.inner.session.lock().await;
            if session.loading {
                debug!("Send rejected: a message is already in flight");
                return SendOutcome::Rejected(RejectReason::Busy);
            }
            session.push_user(Message::user(content));
            session.loading = true;
            (session.conversation_id.clone(), session.epoch)
        };
        self.inner.notify();

        let inner = Arc::clone(&self.inner);
        let content = content.to_string();
        let round_trip = tokio::spawn(async move {
            let result = inner
                .gateway
                .send_message(&content, conversation_id.as_deref(), Some(&inner.user_id))
                .await;
            settle_send(&inner, epoch, result).await
        });

        match round_trip.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Only reachable if the runtime is shutting down under us
                warn!("Send task did not complete: {}", e);
                let mut session = self.inner.session.lock().await;
                session.loading = false;
                drop(session);
                self.inner.notify();
                SendOutcome::Failed(FailureKind::Transport)
            }
        }
    }

    /// Starts a fresh, unsaved session. No backend call.
    pub async fn new_chat(&self) {
        self.inner.session.lock().await.reset();
        self.inner.notify();
    }

    /// Replaces the session with the stored conversation. On failure the
    /// current session is left exactly as it was.
    pub async fn select_conversation(&self, id: &str) -> Result<(), GatewayError> {
        match self.inner.gateway.get_conversation(id).await {
            Ok(conversation) => {
                self.inner
                    .session
                    .lock()
                    .await
                    .open(id.to_string(), conversation);
                self.inner.notify();
                info!("Opened conversation {}", id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load conversation {}: {}", id, e);
                Err(e)
            }
        }
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError> {
        if let Err(e) = self.inner.gateway.delete_conversation(id).await {
            warn!("Failed to delete conversation {}: {}", id, e);
            return Err(e);
        }

        cancel_refresh(&self.inner).await;
        self.inner.conversations.write().await.remove(id);
        {
            let mut session = self.inner.session.lock().await;
            if session.conversation_id.as_deref() == Some(id) {
                session.reset();
            }
        }
        self.inner.notify();
        info!("Deleted conversation {}", id);

        spawn_refresh(&self.inner).await;
        Ok(())
    }

    pub async fn rename_conversation(&self, id: &str, title: &str) -> Result<(), GatewayError> {
        if let Err(e) = self.inner.gateway.update_conversation_title(id, title).await {
            warn!("Failed to rename conversation {}: {}", id, e);
            return Err(e);
        }

        cancel_refresh(&self.inner).await;
        self.inner.conversations.write().await.rename(id, title);
        self.inner.notify();

        spawn_refresh(&self.inner).await;
        Ok(())
    }

    /// Deletes every conversation of the current user and starts over.
    pub async fn clear_conversations(&self) -> Result<(), GatewayError> {
        if let Err(e) = self
            .inner
            .gateway
            .clear_conversations(Some(&self.inner.user_id))
            .await
        {
            warn!("Failed to clear conversations: {}", e);
            return Err(e);
        }

        cancel_refresh(&self.inner).await;
        self.inner.conversations.write().await.clear();
        self.inner.session.lock().await.reset();
        self.inner.notify();
        Ok(())
    }

    /// Re-fetches the list and waits for it. Failures leave the list as is.
    pub async fn refresh_conversations(&self) -> Result<(), GatewayError> {
        let items = self
            .inner
            .gateway
            .get_conversations(Some(&self.inner.user_id))
            .await
            .map_err(|e| {
                warn!("Failed to load conversations: {}", e);
                e
            })?;

        self.inner.conversations.write().await.replace(items);
        self.inner.notify();
        Ok(())
    }

    /// Waits for the pending background refresh, if any.
    pub async fn wait_background(&self) {
        let handle = self.inner.refresh.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn settle_send(
    inner: &Arc<Inner>,
    epoch: u64,
    result: Result<crate::api::models::ChatReply, GatewayError>,
) -> SendOutcome {
    let outcome = {
        let mut session = inner.session.lock().await;
        let same_session = session.epoch == epoch;

        let outcome = match result {
            Ok(reply) => {
                if same_session {
                    session.push_reply(Message::model(reply.response));
                    session.adopt_id(&reply.conversation_id);
                } else {
                    debug!(
                        "Session changed while waiting; reply for {} not shown",
                        reply.conversation_id
                    );
                }
                SendOutcome::Replied {
                    conversation_id: reply.conversation_id,
                }
            }
            Err(e) => {
                warn!("Send message error: {}", e);
                let kind = if e.is_transport() {
                    FailureKind::Transport
                } else {
                    FailureKind::Backend
                };
                if same_session {
                    session.push_reply(Message::model(kind.fallback_text()));
                }
                SendOutcome::Failed(kind)
            }
        };

        session.loading = false;
        outcome
    };
    inner.notify();

    if matches!(outcome, SendOutcome::Replied { .. }) {
        spawn_refresh(inner).await;
    }
    outcome
}

/// Aborts the pending background refresh, if any.
async fn cancel_refresh(inner: &Inner) {
    if let Some(handle) = inner.refresh.lock().await.take() {
        handle.abort();
    }
}

/// Detached list reload. Supersedes any refresh still running and holds only
/// a weak reference, so it never keeps a dropped controller alive. Results
/// that land after a local change to the list are discarded.
async fn spawn_refresh(inner: &Arc<Inner>) {
    let seen = inner.conversations.read().await.revision();
    let gateway = Arc::clone(&inner.gateway);
    let user_id = inner.user_id.clone();
    let token = inner.shutdown.clone();
    let weak: Weak<Inner> = Arc::downgrade(inner);

    let handle = tokio::spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = gateway.get_conversations(Some(&user_id)) => result,
        };

        let Some(inner) = weak.upgrade() else {
            return;
        };
        match result {
            Ok(items) => {
                if inner.conversations.write().await.replace_if_unchanged(items, seen) {
                    inner.notify();
                } else {
                    debug!("Conversation list changed locally; refresh result dropped");
                }
            }
            Err(e) => warn!("Background conversation refresh failed: {}", e),
        }
    });

    let previous = inner.refresh.lock().await.replace(handle);
    if let Some(previous) = previous {
        previous.abort();
    }
}
