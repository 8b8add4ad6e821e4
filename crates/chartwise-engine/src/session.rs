use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use chartwise_contracts::analysis::{AnalysisOutput, AnalysisRequest, ChartImage, Operation};
use chartwise_contracts::events::{EventKind, EventPayload, EventWriter};
use chartwise_contracts::Locale;
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::ModelGateway;
use crate::prompts::build_prompt;

#[derive(Debug)]
pub struct SessionOutcome {
    pub operation: Operation,
    pub result: Result<AnalysisOutput, GatewayError>,
}

#[derive(Default)]
struct SessionState {
    pending: Option<Operation>,
    /// Bumped on every submit and dismiss; a worker only publishes while its
    /// generation is still current.
    generation: u64,
    outcome: Option<SessionOutcome>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<SessionState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interactive front of the gateway: the current language plus at most one
/// analysis running on a background thread.
pub struct AnalysisSession {
    gateway: Arc<ModelGateway>,
    locale: Locale,
    shared: Arc<Shared>,
    events: Option<EventWriter>,
}

impl AnalysisSession {
    pub fn new(gateway: Arc<ModelGateway>, locale: Locale) -> Self {
        Self {
            gateway,
            locale,
            shared: Arc::new(Shared::default()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Applies to requests submitted afterwards; a running one keeps its language.
    pub fn set_locale(&mut self, locale: Locale) {
        if locale == self.locale {
            return;
        }
        let previous = self.locale;
        self.locale = locale;
        self.record(
            EventKind::LocaleChanged,
            [("from", previous.code()), ("to", locale.code())],
        );
    }

    pub fn toggle_locale(&mut self) -> Locale {
        self.set_locale(self.locale.toggle());
        self.locale
    }

    pub fn is_busy(&self) -> bool {
        self.pending().is_some()
    }

    pub fn pending(&self) -> Option<Operation> {
        self.shared.lock().pending
    }

    pub fn submit_chart(&self, image: ChartImage) -> Result<Operation, GatewayError> {
        let request =
            AnalysisRequest::chart(image, self.locale).map_err(GatewayError::InvalidRequest)?;
        self.submit(request)
    }

    pub fn submit_symbol(&self, symbol: &str) -> Result<Operation, GatewayError> {
        let request =
            AnalysisRequest::symbol(symbol, self.locale).map_err(GatewayError::InvalidRequest)?;
        self.submit(request)
    }

    pub fn submit_pattern(&self, pattern_name: &str) -> Result<Operation, GatewayError> {
        let request = AnalysisRequest::pattern(pattern_name, self.locale)
            .map_err(GatewayError::InvalidRequest)?;
        self.submit(request)
    }

    /// Starts `request` in the background. Refused with [`GatewayError::Busy`]
    /// while another analysis is pending; an unread outcome is discarded.
    pub fn submit(&self, request: AnalysisRequest) -> Result<Operation, GatewayError> {
        build_prompt(&request)?;
        let operation = request.operation();

        let generation = {
            let mut state = self.shared.lock();
            if state.pending.is_some() {
                return Err(GatewayError::Busy);
            }
            state.generation += 1;
            state.pending = Some(operation);
            state.outcome = None;
            state.generation
        };

        let gateway = Arc::clone(&self.gateway);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("chartwise-analysis".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| gateway.run(&request)))
                    .unwrap_or_else(|_| Err(GatewayError::WorkerPanicked));
                let mut state = shared.lock();
                if state.generation != generation {
                    return;
                }
                state.pending = None;
                state.outcome = Some(SessionOutcome { operation, result });
                shared.changed.notify_all();
            });

        if let Err(err) = spawned {
            let mut state = self.shared.lock();
            if state.generation == generation {
                state.pending = None;
            }
            return Err(GatewayError::WorkerSpawn(err));
        }
        Ok(operation)
    }

    /// Forgets the pending analysis. The remote call is not aborted; its
    /// result is dropped when it lands.
    pub fn dismiss(&self) -> Option<Operation> {
        let dismissed = {
            let mut state = self.shared.lock();
            let dismissed = state.pending.take();
            if dismissed.is_some() {
                state.generation += 1;
                self.shared.changed.notify_all();
            }
            dismissed
        };
        if let Some(operation) = dismissed {
            self.record(
                EventKind::RequestDismissed,
                [("operation", operation.as_str())],
            );
        }
        dismissed
    }

    pub fn take_outcome(&self) -> Option<SessionOutcome> {
        self.shared.lock().outcome.take()
    }

    /// Blocks until nothing is pending, then takes the outcome if one landed.
    pub fn wait(&self) -> Option<SessionOutcome> {
        let mut state = self.shared.lock();
        while state.pending.is_some() {
            state = self
                .shared
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.outcome.take()
    }

    fn record<const N: usize>(&self, kind: EventKind, fields: [(&str, &str); N]) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: EventPayload = fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        events.record(kind, payload);
    }
}
