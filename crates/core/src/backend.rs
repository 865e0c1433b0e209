use anyhow::Result;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        AssistantStreamEvent, CreateMessageRequestArgs, CreateRunRequestArgs, CreateThreadRequest,
        MessageDeltaContent, MessageDeltaContentTextAnnotations, MessageDeltaObject, MessageRole,
    },
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Events surfaced from an in-progress assistant run.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// The backend acknowledged the run; carries the handle used to cancel it later.
    RunCreated { run_id: String },
    /// An incremental piece of assistant text, with the literal substrings of
    /// any citation annotations embedded in it.
    TextDelta {
        value: String,
        annotations: Vec<String>,
    },
}

/// A stream of events from a single assistant run.
pub type BackendEventStream = Pin<Box<dyn Stream<Item = Result<BackendEvent>> + Send>>;

/// The seam over the hosted assistant service's conversation primitives.
///
/// One conversation thread is held per call; runs are single assistant turns
/// executed against that thread.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Opens a new server-side conversation thread and returns its handle.
    async fn create_thread(&self) -> Result<String>;

    /// Lists the runs currently associated with a thread.
    async fn list_runs(&self, thread_id: &str) -> Result<Vec<String>>;

    /// Cancels a single run. The backend rejects cancellation of runs that
    /// have already reached a terminal state.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()>;

    /// Appends a user-role message to the thread.
    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<()>;

    /// Starts a streaming run against the thread and returns its event feed.
    async fn stream_run(&self, thread_id: &str) -> Result<BackendEventStream>;
}

/// An `AssistantBackend` backed by the OpenAI Assistants API.
pub struct OpenAIAssistantBackend {
    client: Client<OpenAIConfig>,
    assistant_id: String,
}

impl OpenAIAssistantBackend {
    /// Creates a new backend client.
    ///
    /// # Arguments
    ///
    /// * `config` - The OpenAI client configuration, including the API key.
    /// * `assistant_id` - The pre-provisioned assistant to run against each thread.
    pub fn new(config: OpenAIConfig, assistant_id: String) -> Self {
        Self {
            client: Client::with_config(config),
            assistant_id,
        }
    }
}

#[async_trait]
impl AssistantBackend for OpenAIAssistantBackend {
    async fn create_thread(&self) -> Result<String> {
        let thread = self
            .client
            .threads()
            .create(CreateThreadRequest::default())
            .await?;
        Ok(thread.id)
    }

    async fn list_runs(&self, thread_id: &str) -> Result<Vec<String>> {
        let runs = self
            .client
            .threads()
            .runs(thread_id)
            .list(&[("limit", "20")])
            .await?;
        Ok(runs.data.into_iter().map(|run| run.id).collect())
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        self.client.threads().runs(thread_id).cancel(run_id).await?;
        Ok(())
    }

    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<()> {
        let request = CreateMessageRequestArgs::default()
            .role(MessageRole::User)
            .content(text)
            .build()?;
        self.client
            .threads()
            .messages(thread_id)
            .create(request)
            .await?;
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str) -> Result<BackendEventStream> {
        let request = CreateRunRequestArgs::default()
            .assistant_id(&self.assistant_id)
            .build()?;
        let stream = self
            .client
            .threads()
            .runs(thread_id)
            .create_stream(request)
            .await?;

        Ok(Box::pin(stream.filter_map(|result| async move {
            match result {
                Ok(AssistantStreamEvent::ThreadRunCreated(run)) => {
                    Some(Ok(BackendEvent::RunCreated { run_id: run.id }))
                }
                Ok(AssistantStreamEvent::ThreadMessageDelta(delta)) => {
                    text_delta_event(delta).map(Ok)
                }
                // Lifecycle and run-step events carry nothing the relay forwards.
                Ok(_) => None,
                Err(e) => Some(Err(e.into())),
            }
        })))
    }
}

/// Extracts the plain-text portion of a message delta, if it has one.
/// Non-text content (e.g. image file references) is dropped.
fn text_delta_event(event: MessageDeltaObject) -> Option<BackendEvent> {
    let content = event.delta.content?.into_iter().next()?;
    let MessageDeltaContent::Text(text_content) = content else {
        return None;
    };
    let text = text_content.text?;

    let annotations = text
        .annotations
        .unwrap_or_default()
        .into_iter()
        .filter_map(|annotation| match annotation {
            MessageDeltaContentTextAnnotations::FileCitation(citation) => citation.text,
            MessageDeltaContentTextAnnotations::FilePath(path) => path.text,
        })
        .collect();

    Some(BackendEvent::TextDelta {
        value: text.value.unwrap_or_default(),
        annotations,
    })
}
