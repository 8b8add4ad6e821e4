//! In-process transports for exercising the gateway and session.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::error::GatewayError;
use crate::gateway::{ModelCall, ModelTransport};

type Scripted = Result<Option<String>, GatewayError>;

/// Replays queued replies in order and records every call it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, text: &str) -> Self {
        self.push(Ok(Some(text.to_string())))
    }

    pub(crate) fn empty(self) -> Self {
        self.push(Ok(None))
    }

    pub(crate) fn fail(self, err: GatewayError) -> Self {
        self.push(Err(err))
    }

    pub(crate) fn calls(&self) -> Vec<ModelCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(self, reply: Scripted) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }
}

impl ModelTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, call: &ModelCall) -> Result<Option<String>, GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::Status {
                    status: 599,
                    body: "no scripted reply left".to_string(),
                })
            })
    }
}

#[derive(Default)]
struct GateState {
    open: bool,
    started: usize,
}

/// Holds every call until [`GatedTransport::open`], then answers through
/// `reply`, which sees the call being answered.
pub(crate) struct GatedTransport {
    state: Mutex<GateState>,
    changed: Condvar,
    reply: Box<dyn Fn(&ModelCall) -> Option<String> + Send + Sync>,
}

impl GatedTransport {
    pub(crate) fn new(reply: impl Fn(&ModelCall) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
            reply: Box::new(reply),
        }
    }

    pub(crate) fn open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = true;
        self.changed.notify_all();
    }

    /// Blocks until at least `count` calls have arrived.
    pub(crate) fn wait_for_calls(&self, count: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while state.started < count {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl ModelTransport for GatedTransport {
    fn name(&self) -> &str {
        "gated"
    }

    fn generate(&self, call: &ModelCall) -> Result<Option<String>, GatewayError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.started += 1;
        self.changed.notify_all();
        while !state.open {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(state);
        Ok((self.reply)(call))
    }
}

/// Panics on every call.
pub(crate) struct PanickingTransport;

impl ModelTransport for PanickingTransport {
    fn name(&self) -> &str {
        "panicking"
    }

    fn generate(&self, _call: &ModelCall) -> Result<Option<String>, GatewayError> {
        panic!("transport blew up")
    }
}
