//! The per-call conversation relay.
//!
//! A `ConversationRelay` owns one assistant thread for the lifetime of a
//! call. `begin` opens the thread and speaks the greeting; `draft_response`
//! turns each transcript or reminder event into one assistant run, streaming
//! cleaned text chunks out and always closing the turn with a completion
//! marker, even when the backend fails mid-stream.

use crate::{
    backend::{AssistantBackend, BackendEvent},
    protocol::{InboundEvent, OutboundMessage},
};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Spoken as soon as the call connects, before any caller input.
const GREETING: &str = "Hey there, how can I help you today?";

/// Injected in place of caller input when a reminder event fires.
const REMINDER_PROMPT: &str = "(Now the user has not responded in a while, you would say:)";

/// Relays one call's transcript events to the assistant backend and streams
/// the assistant's replies back over the outbound channel.
pub struct ConversationRelay {
    backend: Arc<dyn AssistantBackend>,
    thread_id: Option<String>,
    active_run: Option<String>,
}

impl ConversationRelay {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            backend,
            thread_id: None,
            active_run: None,
        }
    }

    /// Opens the conversation thread and sends the greeting.
    ///
    /// Thread creation failure propagates; the caller is expected to drop the
    /// call, since no conversation can happen without a thread.
    pub async fn begin(&mut self, outbound: &mpsc::Sender<OutboundMessage>) -> Result<()> {
        let thread_id = self.backend.create_thread().await?;
        info!(%thread_id, "Opened assistant thread for call");
        self.thread_id = Some(thread_id);

        outbound.send(OutboundMessage::greeting(GREETING)).await?;
        Ok(())
    }

    /// Handles one transcript or reminder event.
    ///
    /// Cancels any in-flight runs, injects the event's text into the thread,
    /// streams the new run's output as chunk messages, and finally emits the
    /// turn-complete marker. Backend failures along the way are logged and
    /// swallowed; the completion marker is sent regardless, so the platform
    /// can always detect end-of-turn.
    pub async fn draft_response(
        &mut self,
        event: &InboundEvent,
        outbound: &mpsc::Sender<OutboundMessage>,
    ) -> Result<()> {
        let Some(response_id) = event.response_id() else {
            return Ok(());
        };
        let thread_id = self
            .thread_id
            .clone()
            .context("draft_response called before begin")?;

        self.preempt_runs(&thread_id).await;
        self.inject_event(&thread_id, event).await;

        if let Err(e) = self.stream_turn(&thread_id, response_id, outbound).await {
            error!(response_id, error = ?e, "Assistant stream failed mid-turn");
        }

        if outbound
            .send(OutboundMessage::turn_complete(response_id))
            .await
            .is_err()
        {
            warn!(
                response_id,
                "Outbound channel closed before turn completion was sent"
            );
        }
        Ok(())
    }

    /// Best-effort cancellation of whatever runs the backend still has going
    /// on this thread. At most one run should be generating at a time; a
    /// stale run surviving briefly past this point is tolerated.
    async fn preempt_runs(&mut self, thread_id: &str) {
        if let Some(run_id) = self.active_run.take() {
            debug!(%run_id, "Superseding previously tracked run");
        }

        match self.backend.list_runs(thread_id).await {
            Ok(run_ids) => {
                for run_id in run_ids {
                    if let Err(e) = self.backend.cancel_run(thread_id, &run_id).await {
                        warn!(%run_id, error = ?e, "Failed to cancel in-flight run");
                    }
                }
            }
            Err(e) => {
                warn!(error = ?e, "Failed to list in-flight runs; starting turn without preemption");
            }
        }
    }

    /// Appends the event's text to the thread as a user message. A reminder
    /// injects the fixed re-engagement prompt; a response event injects the
    /// most recent transcript entry. Failures are logged and the turn
    /// proceeds on whatever thread state exists.
    async fn inject_event(&self, thread_id: &str, event: &InboundEvent) {
        let text = match event {
            InboundEvent::ReminderRequired { .. } => REMINDER_PROMPT,
            InboundEvent::ResponseRequired { transcript, .. } => match transcript.last() {
                Some(utterance) => utterance.content.as_str(),
                None => {
                    warn!("response_required event carried an empty transcript; skipping injection");
                    return;
                }
            },
            InboundEvent::UpdateOnly { .. } => return,
        };

        if let Err(e) = self.backend.add_user_message(thread_id, text).await {
            warn!(error = ?e, "Failed to append message to thread; drafting from existing context");
        }
    }

    /// Runs the assistant against the thread and forwards cleaned text
    /// deltas as chunk messages.
    async fn stream_turn(
        &mut self,
        thread_id: &str,
        response_id: u64,
        outbound: &mpsc::Sender<OutboundMessage>,
    ) -> Result<()> {
        let mut events = self.backend.stream_run(thread_id).await?;

        while let Some(event) = events.next().await {
            match event? {
                BackendEvent::RunCreated { run_id } => {
                    debug!(%run_id, "Assistant run started");
                    self.active_run = Some(run_id);
                }
                BackendEvent::TextDelta { value, annotations } => {
                    let content = clean_delta(&value, &annotations);
                    outbound
                        .send(OutboundMessage::chunk(response_id, content))
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Strips citation annotations and markdown emphasis from a text delta.
///
/// Each annotation record removes one occurrence of its literal matched
/// substring; all `*` characters are removed afterwards.
fn clean_delta(value: &str, annotations: &[String]) -> String {
    let mut text = value.to_string();
    for annotation in annotations {
        if annotation.is_empty() {
            continue;
        }
        text = text.replacen(annotation.as_str(), "", 1);
    }
    text.replace('*', "")
}
