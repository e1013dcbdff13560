//! Lazily loaded, AI-backed clothing advice with a rule-based fallback.
//!
//! The model is loaded at most once per [`AdviceEngine`], on a background
//! task started by the first caller that needs it. Until that load succeeds,
//! and forever after it fails, advice comes from [`crate::fallback`].

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Handle, sync::watch};
use tracing::{debug, info, warn};

use crate::{
    fallback,
    llm::{DisabledSource, Generation, ModelError, ModelSource, TextModel},
    model::AdviceRequest,
    prompt,
};

/// Observable load progress. Moves only forward:
/// `Unloaded -> Loading -> Ready | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl LoadStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

#[derive(Debug)]
enum LoadState {
    Unloaded,
    Loading,
    Ready(Arc<dyn TextModel>),
    Failed,
}

impl LoadState {
    fn status(&self) -> LoadStatus {
        match self {
            Self::Unloaded => LoadStatus::Unloaded,
            Self::Loading => LoadStatus::Loading,
            Self::Ready(_) => LoadStatus::Ready,
            Self::Failed => LoadStatus::Failed,
        }
    }
}

#[derive(Debug)]
struct Inner {
    source: Arc<dyn ModelSource>,
    runtime: Handle,
    state: Mutex<LoadState>,
    status_tx: watch::Sender<LoadStatus>,
}

impl Inner {
    async fn load(&self) {
        let next = match self.source.load().await {
            Ok(model) => {
                info!(source = %self.source.describe(), "advice model ready");
                LoadState::Ready(model)
            }
            Err(ModelError::Disabled) => {
                debug!("AI advice disabled, using rule-based advice");
                LoadState::Failed
            }
            Err(err) => {
                warn!(
                    source = %self.source.describe(),
                    error = %err,
                    "advice model failed to load, using rule-based advice for this session"
                );
                LoadState::Failed
            }
        };

        let mut state = self.state.lock();
        self.status_tx.send_replace(next.status());
        *state = next;
    }
}

/// Cheap to clone; clones share one model slot.
#[derive(Debug, Clone)]
pub struct AdviceEngine {
    inner: Arc<Inner>,
}

impl AdviceEngine {
    /// The load, once started, runs on `runtime`.
    pub fn new(source: Arc<dyn ModelSource>, runtime: Handle) -> Self {
        let (status_tx, _) = watch::channel(LoadStatus::Unloaded);

        Self {
            inner: Arc::new(Inner {
                source,
                runtime,
                state: Mutex::new(LoadState::Unloaded),
                status_tx,
            }),
        }
    }

    /// Engine that only ever gives rule-based advice.
    pub fn disabled(runtime: Handle) -> Self {
        Self::new(Arc::new(DisabledSource), runtime)
    }

    /// Start the background load if nobody has yet. Never blocks and
    /// never reports errors.
    pub fn ensure_loading_started(&self) {
        {
            let mut state = self.inner.state.lock();
            if !matches!(*state, LoadState::Unloaded) {
                return;
            }
            *state = LoadState::Loading;
            self.inner.status_tx.send_replace(LoadStatus::Loading);
        }

        info!(source = %self.inner.source.describe(), "loading advice model in background");

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move { inner.load().await });
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.state.lock(), LoadState::Ready(_))
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.state.lock().status()
    }

    /// Watch load progress.
    pub fn subscribe(&self) -> watch::Receiver<LoadStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Wait up to `timeout` for the load to finish one way or the other,
    /// returning whatever status was reached.
    pub async fn wait_until_settled(&self, timeout: Duration) -> LoadStatus {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so `wait_for` only ends on a match.
        let _ = tokio::time::timeout(timeout, rx.wait_for(LoadStatus::is_settled)).await;
        self.status()
    }

    /// Ask the model for advice. `None` when the model is not ready or the
    /// generation failed; failures are logged, not returned.
    pub async fn generate_advice(&self, request: &AdviceRequest) -> Option<String> {
        let model = match &*self.inner.state.lock() {
            LoadState::Ready(model) => Arc::clone(model),
            _ => return None,
        };

        let messages = prompt::advice_messages(request);
        let result = model
            .chat(&messages, &prompt::ADVICE_SAMPLING)
            .await
            .and_then(Generation::into_text);

        match result {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %err, "advice generation failed, falling back to rules");
                None
            }
        }
    }

    /// Advice for `request`, from the model when it is ready and answers,
    /// otherwise from the fallback rule. Also kicks off the model load on
    /// first use.
    pub async fn get_advice(&self, request: &AdviceRequest) -> String {
        self.ensure_loading_started();

        if self.is_ready()
            && let Some(text) = self.generate_advice(request).await
        {
            return text;
        }

        fallback::advise(request)
    }
}
