//! Orchestration of one streamed task run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assemble::{ContextValues, TaskConfig, assemble_prompt};
use crate::cancel::CancelSignal;
use crate::demux::{DemuxPhase, DemuxSegment, ReasoningDemux, ReasoningMarkers};
use crate::errors::{EngineError, TransportError};
use crate::keepalive::{Keepalive, KeepalivePing, TracePing};
use crate::message::ChatMessage;
use crate::result::{RunResult, RunStatus};
use crate::timing::TimingTracker;
use crate::transport::{StreamEvent, TokenUsage, Transport, TransportRequest};

/// Engine-level knobs shared by every run of a runner.
#[derive(Clone)]
pub struct RunnerConfig {
    pub markers: ReasoningMarkers,
    pub keepalive_interval: Duration,
    pub keepalive_ping: Arc<dyn KeepalivePing>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            markers: ReasoningMarkers::default(),
            keepalive_interval: Duration::from_secs(20),
            keepalive_ping: Arc::new(TracePing),
        }
    }
}

/// Receiver of classified deltas while a run streams.
///
/// Callbacks fire on the caller's task, strictly in arrival order. `()` is
/// the silent observer.
pub trait RunObserver {
    fn on_reasoning_delta(&mut self, _text: &str) {}
    fn on_content_delta(&mut self, _text: &str) {}
}

impl RunObserver for () {}

/// Adapts a pair of closures into a [`RunObserver`].
pub struct DeltaCallbacks<R, C>
where
    R: FnMut(&str),
    C: FnMut(&str),
{
    on_reasoning: R,
    on_content: C,
}

impl<R, C> DeltaCallbacks<R, C>
where
    R: FnMut(&str),
    C: FnMut(&str),
{
    pub fn new(on_reasoning: R, on_content: C) -> Self {
        Self {
            on_reasoning,
            on_content,
        }
    }
}

impl<R, C> RunObserver for DeltaCallbacks<R, C>
where
    R: FnMut(&str),
    C: FnMut(&str),
{
    fn on_reasoning_delta(&mut self, text: &str) {
        (self.on_reasoning)(text);
    }

    fn on_content_delta(&mut self, text: &str) {
        (self.on_content)(text);
    }
}

/// Runs one streamed task at a time against a transport.
///
/// A runner is cheap; concurrent runs use separate runners and share
/// nothing. A second run while one is in flight fails with
/// [`EngineError::Busy`].
pub struct TaskRunner {
    transport: Arc<dyn Transport>,
    config: RunnerConfig,
    in_flight: AtomicBool,
}

impl TaskRunner {
    pub fn new(transport: Arc<dyn Transport>, config: RunnerConfig) -> Self {
        Self {
            transport,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Starts building a run from a task template.
    pub fn task(&self, task: &TaskConfig) -> RunBuilder<'_> {
        RunBuilder {
            runner: self,
            input: RunInput::Task(task.clone()),
            values: ContextValues::new(),
            temperature: Some(task.temperature),
            max_output_tokens: Some(task.max_output_tokens),
            cancel: None,
        }
    }

    /// Starts building a run from raw chat messages, bypassing assembly.
    pub fn messages(&self, messages: Vec<ChatMessage>) -> RunBuilder<'_> {
        RunBuilder {
            runner: self,
            input: RunInput::Messages(messages),
            values: ContextValues::new(),
            temperature: None,
            max_output_tokens: None,
            cancel: None,
        }
    }
}

enum RunInput {
    Task(TaskConfig),
    Messages(Vec<ChatMessage>),
}

/// One run in the making; the terminal methods consume it.
pub struct RunBuilder<'a> {
    runner: &'a TaskRunner,
    input: RunInput,
    values: ContextValues,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    cancel: Option<CancelSignal>,
}

impl<'a> RunBuilder<'a> {
    /// Supplies one context value.
    pub fn context(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.set(name, value);
        self
    }

    /// Replaces all context values.
    pub fn context_values(mut self, values: ContextValues) -> Self {
        self.values = values;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Arms cooperative cancellation for this run.
    pub fn cancel_signal(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Runs to completion, ignoring deltas.
    pub async fn collect(self) -> Result<RunResult, EngineError> {
        self.run(&mut ()).await
    }

    /// Runs, delivering classified deltas to `observer` as they arrive.
    ///
    /// Assembly and validation failures return before any network activity.
    /// Cancellation is not an error: the result comes back with
    /// [`RunStatus::Cancelled`] and everything classified up to the
    /// observation point.
    pub async fn run<O>(self, observer: &mut O) -> Result<RunResult, EngineError>
    where
        O: RunObserver + ?Sized,
    {
        let runner = self.runner;
        let _slot = BusySlot::acquire(&runner.in_flight)?;

        let messages = match &self.input {
            RunInput::Task(task) => {
                if task.instruction.is_empty() {
                    return Err(EngineError::validation("task instruction must not be empty"));
                }
                let prompt = assemble_prompt(task, &self.values)?;
                vec![ChatMessage::user(prompt)]
            }
            RunInput::Messages(messages) => {
                if messages.is_empty() {
                    return Err(EngineError::validation("message list must not be empty"));
                }
                messages.clone()
            }
        };

        let request = TransportRequest {
            run_id: Uuid::new_v4(),
            messages,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        };
        execute(runner, request, self.cancel, observer).await
    }
}

async fn execute<O>(
    runner: &TaskRunner,
    request: TransportRequest,
    mut cancel: Option<CancelSignal>,
    observer: &mut O,
) -> Result<RunResult, EngineError>
where
    O: RunObserver + ?Sized,
{
    let run_id = request.run_id;
    debug!(run_id = %run_id, messages = request.messages.len(), "run started");

    let mut timing = TimingTracker::start();
    let mut demux = ReasoningDemux::new(runner.config.markers.clone());
    let mut reasoning = String::new();
    let mut content = String::new();
    let mut usage = TokenUsage::default();
    let mut status = RunStatus::Completed;

    // Dropping the guard stops the pinger, so error returns below need no
    // cleanup of their own.
    let keepalive = Keepalive::start(
        runner.config.keepalive_interval,
        runner.config.keepalive_ping.clone(),
    );

    let opened = tokio::select! {
        biased;
        _ = wait_for_cancel(&mut cancel) => None,
        opened = runner.transport.open_stream(request) => Some(opened),
    };
    let mut events = match opened {
        None => {
            keepalive.stop();
            timing.mark_ended();
            debug!(run_id = %run_id, "run cancelled before the stream opened");
            return Ok(RunResult {
                status: RunStatus::Cancelled,
                content,
                reasoning,
                truncated_reasoning: false,
                timing: timing.snapshot(),
                usage,
            });
        }
        Some(Ok(stream)) => stream,
        Some(Err(err)) => {
            warn!(run_id = %run_id, error = %err, "transport failed to open the stream");
            return Err(err.into());
        }
    };

    loop {
        // Biased poll: the abort signal is observed before the next event
        // is processed.
        let event = tokio::select! {
            biased;
            _ = wait_for_cancel(&mut cancel) => {
                status = RunStatus::Cancelled;
                break;
            }
            event = events.next() => event,
        };
        match event {
            Some(Ok(StreamEvent::Delta(text))) => {
                if text.is_empty() {
                    continue;
                }
                timing.mark_first_byte();
                for segment in demux.push(&text) {
                    dispatch(segment, observer, &mut reasoning, &mut content, &mut timing);
                }
            }
            Some(Ok(StreamEvent::Done { usage: reported })) => {
                usage = reported;
                break;
            }
            Some(Err(err)) => {
                timing.mark_ended();
                warn!(
                    run_id = %run_id,
                    error = %err,
                    reasoning_len = reasoning.len(),
                    content_len = content.len(),
                    "transport failed mid-stream; partial output discarded"
                );
                return Err(err.into());
            }
            None => {
                timing.mark_ended();
                return Err(
                    TransportError::framing("stream ended without a terminal event").into(),
                );
            }
        }
    }

    if let Some(segment) = demux.finish() {
        dispatch(segment, observer, &mut reasoning, &mut content, &mut timing);
    }
    let truncated_reasoning = demux.phase() == DemuxPhase::InReasoning;
    keepalive.stop();
    timing.mark_ended();

    if truncated_reasoning {
        warn!(run_id = %run_id, "reasoning segment never closed before the run ended");
    }
    info!(
        run_id = %run_id,
        status = ?status,
        reasoning_len = reasoning.len(),
        content_len = content.len(),
        elapsed_ms = timing.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(RunResult {
        status,
        content,
        reasoning,
        truncated_reasoning,
        timing: timing.snapshot(),
        usage,
    })
}

fn dispatch<O>(
    segment: DemuxSegment,
    observer: &mut O,
    reasoning: &mut String,
    content: &mut String,
    timing: &mut TimingTracker,
) where
    O: RunObserver + ?Sized,
{
    match segment {
        DemuxSegment::Reasoning(text) => {
            observer.on_reasoning_delta(&text);
            reasoning.push_str(&text);
        }
        DemuxSegment::Content(text) => {
            timing.mark_first_content();
            observer.on_content_delta(&text);
            content.push_str(&text);
        }
    }
}

async fn wait_for_cancel(cancel: &mut Option<CancelSignal>) {
    match cancel {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Exclusive in-flight slot of a runner; released on drop.
struct BusySlot<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusySlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, EngineError> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusySlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
