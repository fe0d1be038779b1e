use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    error::ErrorKind,
    frame::{DataUnit, ResponsePdu, ServerAddress},
    Error,
};

/// How a reply is resolved once its response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// The response is decoded into a [`DataUnit`].
    Common,
    /// The response is handed back untouched through [`Reply::raw_result()`].
    Raw,
}

#[derive(Debug, Clone, Default)]
struct ReplyState {
    raw_result: Option<ResponsePdu>,
    result: Option<DataUnit>,
    error: Option<Error>,
    finished: bool,
}

/// Handle to the eventual outcome of one request.
///
/// Clones share the same state, so the queue can keep one handle to resolve
/// while the caller polls or awaits another.
#[derive(Debug, Clone)]
pub struct Reply {
    kind: ReplyKind,
    server_address: ServerAddress,
    state: Arc<watch::Sender<ReplyState>>,
}

impl Reply {
    #[must_use]
    pub fn new(kind: ReplyKind, server_address: ServerAddress) -> Self {
        let (state, _) = watch::channel(ReplyState::default());
        Self {
            kind,
            server_address,
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    #[must_use]
    pub fn server_address(&self) -> ServerAddress {
        self.server_address
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// The decoded unit; `None` for raw replies, failed replies and replies
    /// still in flight.
    #[must_use]
    pub fn result(&self) -> Option<DataUnit> {
        self.state.borrow().result.clone()
    }

    /// The response exactly as received, set even when decoding failed.
    #[must_use]
    pub fn raw_result(&self) -> Option<ResponsePdu> {
        self.state.borrow().raw_result.clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error.clone()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.state.borrow().error.as_ref().map(Error::kind)
    }

    /// Human readable error message, empty if the reply has no error.
    #[must_use]
    pub fn error_string(&self) -> String {
        self.state
            .borrow()
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    pub fn set_raw_result(&self, response: ResponsePdu) {
        self.state
            .send_modify(|state| state.raw_result = Some(response));
    }

    pub fn set_result(&self, unit: DataUnit) {
        self.state.send_modify(|state| state.result = Some(unit));
    }

    /// Records the error and finishes the reply.
    pub fn set_error(&self, error: Error) {
        log::debug!("Reply from server {} failed: {error}", self.server_address);
        self.state.send_modify(|state| {
            state.error = Some(error);
            state.finished = true;
        });
    }

    pub fn set_finished(&self, finished: bool) {
        self.state.send_modify(|state| state.finished = finished);
    }

    /// Resolves once the reply is finished, successfully or not.
    pub async fn finished(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| state.finished).await;
    }
}
