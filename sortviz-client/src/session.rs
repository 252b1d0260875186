//! Session state shared with the presentation layer
//!
//! A [`Session`] owns the input text, the selected algorithm, the algorithms the
//! server advertised and the last trace received. It composes the parser and
//! the two service clients into the user-visible workflow:
//!
//! 1. `initialize` negotiates capabilities and reconciles the selection
//! 2. `set_input_text` / `set_algorithm` record user intents
//! 3. `submit` parses the input, requests a sort and replaces the trace
//!
//! Internal state sits behind a mutex that is never held across a network
//! call, so several submissions may be in flight on one task at once.

use crate::parser::{self, ElementSet};
use crate::service::{
    build_http_client, AlgorithmId, CapabilityClient, ClientError, HttpCapabilityClient,
    HttpSortClient, SortRequestClient, SortTrace,
};
use crate::ClientConfig;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from a submission
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is not ready: supported algorithms have not been negotiated")]
    NotReady,

    #[error("No algorithm selected")]
    NoAlgorithmSelected,

    #[error("Input contains no numeric values")]
    EmptyElementSet,

    #[error("Sort request failed: {0}")]
    Client(#[from] ClientError),
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// First capability fetch in flight
    Initializing,
    /// Capability negotiation settled, successfully or not
    Ready,
}

/// Which response is displayed when submissions overlap
///
/// The default drops late responses to older requests. Plain last-write-wins,
/// where the later-arriving response is always displayed, is `LastResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Responses to requests older than the displayed one are dropped
    #[default]
    LatestRequest,
    /// Whichever response arrives last is displayed
    LastResponse,
}

/// What happened to a successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The trace replaced the displayed one
    Displayed,
    /// A newer request had already been displayed; the trace was dropped
    Superseded,
}

/// Read-only view of the session for rendering
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub input_text: String,
    pub algorithm: Option<AlgorithmId>,
    pub supported: Vec<AlgorithmId>,
    pub trace: SortTrace,
}

/// Receiver of session notifications (the presentation layer)
pub trait SessionListener: Send + Sync {
    /// Called after every operation settles
    fn state_changed(&self, _snapshot: &SessionSnapshot) {}

    /// Called once per failed capability fetch
    fn capability_fetch_failed(&self, _error: &ClientError) {}

    /// Called once per failed or refused submission
    fn submit_failed(&self, _error: &SessionError) {}
}

struct SilentListener;

impl SessionListener for SilentListener {}

struct SessionInner {
    phase: Phase,
    input_text: String,
    algorithm: Option<AlgorithmId>,
    supported: Vec<AlgorithmId>,
    trace: SortTrace,
    /// Last generation handed to a submission
    issued: u64,
    /// Generation of the displayed trace (0 = none)
    displayed: u64,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            input_text: self.input_text.clone(),
            algorithm: self.algorithm.clone(),
            supported: self.supported.clone(),
            trace: self.trace.clone(),
        }
    }

    /// Adopt a fresh supported list and keep the selection inside it
    fn reconcile(&mut self, supported: Vec<AlgorithmId>) {
        let keep = self
            .algorithm
            .as_ref()
            .is_some_and(|id| supported.contains(id));
        if !keep {
            let fallback = supported.first().cloned();
            debug!(
                previous = ?self.algorithm,
                fallback = ?fallback,
                "Selected algorithm not supported, falling back"
            );
            self.algorithm = fallback;
        }
        self.supported = supported;
    }

    fn prepare_submit(&mut self) -> Result<(u64, ElementSet, AlgorithmId), SessionError> {
        if self.phase != Phase::Ready {
            return Err(SessionError::NotReady);
        }
        let algorithm = self
            .algorithm
            .clone()
            .ok_or(SessionError::NoAlgorithmSelected)?;
        let elements = parser::parse(&self.input_text);
        if elements.is_empty() {
            return Err(SessionError::EmptyElementSet);
        }
        self.issued += 1;
        Ok((self.issued, elements, algorithm))
    }

    fn accept(&mut self, generation: u64, trace: SortTrace, policy: OverlapPolicy) -> SubmitOutcome {
        if policy == OverlapPolicy::LatestRequest && generation < self.displayed {
            return SubmitOutcome::Superseded;
        }
        self.trace = trace;
        self.displayed = generation;
        SubmitOutcome::Displayed
    }
}

/// One user's sorting session
pub struct Session {
    capabilities: Arc<dyn CapabilityClient>,
    sorter: Arc<dyn SortRequestClient>,
    listener: Arc<dyn SessionListener>,
    policy: OverlapPolicy,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Create a session with no selection, no listener and the default overlap policy
    pub fn new(capabilities: Arc<dyn CapabilityClient>, sorter: Arc<dyn SortRequestClient>) -> Self {
        Self {
            capabilities,
            sorter,
            listener: Arc::new(SilentListener),
            policy: OverlapPolicy::default(),
            inner: Mutex::new(SessionInner {
                phase: Phase::Uninitialized,
                input_text: String::new(),
                algorithm: None,
                supported: Vec::new(),
                trace: SortTrace::default(),
                issued: 0,
                displayed: 0,
            }),
        }
    }

    /// Create a session talking HTTP to the service described by `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = build_http_client(config.timeout())?;
        let capabilities = HttpCapabilityClient::new(http.clone(), config);
        let sorter = HttpSortClient::new(http, config);

        Ok(Self::new(Arc::new(capabilities), Arc::new(sorter))
            .with_algorithm(config.default_algorithm.as_str())
            .with_policy(config.overlap_policy))
    }

    /// Set the initial selection, reconciled on `initialize`
    pub fn with_algorithm(self, algorithm: impl Into<AlgorithmId>) -> Self {
        self.lock().algorithm = Some(algorithm.into());
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        let snapshot = self.lock().snapshot();
        self.listener.state_changed(&snapshot);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn algorithm(&self) -> Option<AlgorithmId> {
        self.lock().algorithm.clone()
    }

    pub fn supported(&self) -> Vec<AlgorithmId> {
        self.lock().supported.clone()
    }

    pub fn trace(&self) -> SortTrace {
        self.lock().trace.clone()
    }

    /// Negotiate supported algorithms with the server
    ///
    /// May be called again later to refresh the list. A failed fetch leaves the
    /// known list as it was, is reported to the listener, and still moves the
    /// session to [`Phase::Ready`].
    pub async fn initialize(&self) -> Result<(), ClientError> {
        {
            let mut inner = self.lock();
            if inner.phase == Phase::Uninitialized {
                inner.phase = Phase::Initializing;
            }
        }

        info!("Fetching supported algorithms");
        let result = self.capabilities.fetch_supported().await;

        let outcome = {
            let mut inner = self.lock();
            inner.phase = Phase::Ready;
            match result {
                Ok(supported) => {
                    info!(
                        supported = supported.len(),
                        selected = ?inner.algorithm,
                        "Capability negotiation complete"
                    );
                    inner.reconcile(supported);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        if let Err(e) = &outcome {
            warn!(error = %e, kind = %e.kind(), "Capability fetch failed");
            self.listener.capability_fetch_failed(e);
        }
        self.notify();

        outcome
    }

    /// Replace the raw input text
    pub fn set_input_text(&self, text: impl Into<String>) {
        self.lock().input_text = text.into();
        self.notify();
    }

    /// Select an algorithm
    ///
    /// Returns `false` and leaves the selection alone when the id is not among
    /// the supported algorithms. Until the session is [`Phase::Ready`] every id
    /// is accepted tentatively; once Ready an empty list refuses every id.
    pub fn set_algorithm(&self, id: impl Into<AlgorithmId>) -> bool {
        let id = id.into();
        let accepted = {
            let mut inner = self.lock();
            if inner.phase == Phase::Ready && !inner.supported.contains(&id) {
                debug!(algorithm = %id, "Refusing unsupported algorithm");
                false
            } else {
                inner.algorithm = Some(id);
                true
            }
        };
        self.notify();
        accepted
    }

    /// Parse the current input and request its sort trace
    ///
    /// On success the displayed trace is replaced in one step, subject to the
    /// overlap policy. On any failure the displayed trace is left untouched and
    /// the listener hears about it exactly once.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        let prepared = self.lock().prepare_submit();
        let (generation, elements, algorithm) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail_submit(e)),
        };

        debug!(generation, algorithm = %algorithm, elements = elements.len(), "Submitting");

        let trace = match self.sorter.request_sort(&elements, &algorithm).await {
            Ok(trace) => trace,
            Err(e) => return Err(self.fail_submit(e.into())),
        };

        let outcome = self.lock().accept(generation, trace, self.policy);
        match outcome {
            SubmitOutcome::Displayed => info!(generation, "Displaying new trace"),
            SubmitOutcome::Superseded => {
                debug!(generation, "Dropping trace from superseded request")
            }
        }
        self.notify();

        Ok(outcome)
    }

    fn fail_submit(&self, error: SessionError) -> SessionError {
        warn!(error = %error, "Submission failed");
        self.listener.submit_failed(&error);
        self.notify();
        error
    }
}
