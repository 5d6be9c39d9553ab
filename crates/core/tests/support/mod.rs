//! Shared test helpers for `deferq-core` integration tests.
//!
//! Lightweight in-memory collaborators so queue tests can focus on
//! behaviour: a scripted transmitter, a recording liveness registrar and a
//! recording completion handler.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deferq_core::{DeferredQueue, DeferredQueueBuilder, LivenessRegistrar, SendRequest, Transmitter};
use deferq_domain::{Result as DomainResult, SendAttempt, SenderStatus, TracedRequest, TransportError};
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

pub type Class = &'static str;

/// One recorded transmitter call
#[derive(Debug, Clone)]
pub struct Call {
    pub payload: String,
    pub destination: String,
    pub iteration: u64,
    pub at: Instant,
}

/// A scripted answer; `Gated` waits for the gate before answering.
pub enum Step {
    Answer(SendAttempt),
    Gated(Arc<Notify>, SendAttempt),
}

/// Transmitter that answers from a script, then falls back to a fixed
/// answer.
pub struct ScriptedTransmitter {
    script: Mutex<VecDeque<Step>>,
    fallback: SendAttempt,
    calls: Mutex<Vec<Call>>,
    count: watch::Sender<usize>,
}

impl ScriptedTransmitter {
    pub fn new(fallback: SendAttempt) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            count: watch::Sender::new(0),
        }
    }

    pub fn delivering() -> Self {
        Self::new(SendAttempt::delivered(200))
    }

    pub fn failing() -> Self {
        Self::new(SendAttempt::failed(TransportError::Connect("no route to host".into())))
    }

    pub fn then(self, attempt: SendAttempt) -> Self {
        self.script.lock().unwrap().push_back(Step::Answer(attempt));
        self
    }

    pub fn then_gated(self, gate: Arc<Notify>, attempt: SendAttempt) -> Self {
        self.script.lock().unwrap().push_back(Step::Gated(gate, attempt));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.payload).collect()
    }

    /// Wait until at least `n` calls have been made (virtual-time bounded).
    pub async fn wait_for_calls(&self, n: usize) -> Vec<Call> {
        let mut rx = self.count.subscribe();
        tokio::time::timeout(Duration::from_secs(24 * 3600), rx.wait_for(|count| *count >= n))
            .await
            .expect("transmitter was not called in time")
            .expect("transmitter dropped");
        self.calls()
    }
}

#[async_trait]
impl Transmitter for ScriptedTransmitter {
    async fn send(&self, request: SendRequest<'_>) -> SendAttempt {
        let call = Call {
            payload: String::from_utf8_lossy(request.payload).into_owned(),
            destination: request.destination.to_string(),
            iteration: request.iteration,
            at: Instant::now(),
        };
        let total = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };
        self.count.send_replace(total);

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Answer(attempt)) => attempt,
            Some(Step::Gated(gate, attempt)) => {
                gate.notified().await;
                attempt
            }
            None => self.fallback.clone(),
        }
    }
}

/// Registrar that records every report
#[derive(Default)]
pub struct RecordingRegistrar {
    pub registered: Mutex<Vec<String>>,
    pub still_running: Mutex<Vec<String>>,
    pub max_time_checks: Mutex<Vec<(String, String)>>,
}

impl RecordingRegistrar {
    pub fn still_running_count(&self) -> usize {
        self.still_running.lock().unwrap().len()
    }
}

#[async_trait]
impl LivenessRegistrar for RecordingRegistrar {
    async fn register_watchdog(&self, name: &str) -> DomainResult<()> {
        self.registered.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn still_running(&self, name: &str, _warning: Duration, _error: Duration) -> DomainResult<()> {
        self.still_running.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn check_max_time(
        &self,
        agent: &str,
        context: &str,
        _elapsed: Duration,
        _warning: Duration,
        _error: Duration,
    ) {
        self.max_time_checks.lock().unwrap().push((agent.to_string(), context.to_string()));
    }
}

/// One completion-handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub class: Class,
    pub payload: String,
    pub status: SenderStatus,
    pub traces: usize,
}

#[derive(Clone, Default)]
pub struct Reports(Arc<Mutex<Vec<Report>>>);

impl Reports {
    pub fn handler(&self) -> impl Fn(&Class, &[u8], SenderStatus, &[TracedRequest]) + Send + Sync + 'static {
        let sink = Arc::clone(&self.0);
        move |class, payload, status, traces| {
            sink.lock().unwrap().push(Report {
                class: *class,
                payload: String::from_utf8_lossy(payload).into_owned(),
                status,
                traces: traces.len(),
            });
        }
    }

    pub fn all(&self) -> Vec<Report> {
        self.0.lock().unwrap().clone()
    }

    /// `(payload, status)` pairs in invocation order
    pub fn statuses(&self) -> Vec<(String, SenderStatus)> {
        self.all().into_iter().map(|r| (r.payload, r.status)).collect()
    }
}

pub struct Harness {
    pub queue: DeferredQueue<Class>,
    pub transmitter: Arc<ScriptedTransmitter>,
    pub registrar: Arc<RecordingRegistrar>,
    pub reports: Reports,
}

/// Queue wired to the recording collaborators. `customize` can add
/// predicates or timing on top.
pub fn harness_with(
    transmitter: ScriptedTransmitter,
    customize: impl FnOnce(DeferredQueueBuilder<Class>) -> DeferredQueueBuilder<Class>,
) -> Harness {
    let transmitter = Arc::new(transmitter);
    let registrar = Arc::new(RecordingRegistrar::default());
    let reports = Reports::default();

    let builder = DeferredQueue::builder(
        Arc::clone(&transmitter) as Arc<dyn Transmitter>,
        Arc::clone(&registrar) as Arc<dyn LivenessRegistrar>,
    )
    .agent_name("zedagent")
    .context_name("info")
    .sent_handler(reports.handler());

    let queue = customize(builder).spawn().expect("queue should spawn");
    Harness { queue, transmitter, registrar, reports }
}

pub fn harness(transmitter: ScriptedTransmitter) -> Harness {
    harness_with(transmitter, |builder| builder)
}

pub fn item(key: &str, payload: &str) -> deferq_core::DeferredItem<Class> {
    deferq_core::DeferredItem::new(key, payload.as_bytes().to_vec(), "https://controller/api/v2/edgeDevice/info", "info")
}
