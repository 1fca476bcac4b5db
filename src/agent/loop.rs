//! Agent loop implementation
//!
//! This module provides the core agent loop that processes messages,
//! calls the model, and executes tools.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::bus::{InboundMessage, MessageBus, OutboundMessage};
use crate::config::{Config, ExecConfig};
use crate::error::{GolemError, Result};
use crate::providers::ChatModel;
use crate::session::{Message, SessionStore};
use crate::tools::{default_tools, Tool, ToolContext, ToolRegistry};

use super::context::{ContextBuilder, RuntimeContext};
use super::events::{ToolEvent, EVENT_CHANNEL_CAPACITY};

/// Reply when no model is configured.
pub const NO_MODEL_RESPONSE: &str = "No model configured";

/// Reply when the iteration cap is hit or the model's final answer is empty.
pub const FALLBACK_RESPONSE: &str = "Processing complete.";

/// Per-loop settings, usually taken from `agents.defaults`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum model calls in one turn
    pub max_iterations: usize,
    /// Trailing session entries included in the context
    pub history_limit: usize,
    /// Workspace root handed to tools; `None` disables the path sandbox
    pub workspace: Option<String>,
}

impl AgentSettings {
    /// Builds settings from configuration.
    ///
    /// # Errors
    /// Returns `GolemError::Config` when the workspace cannot be resolved.
    pub fn from_config(config: &Config) -> Result<Self> {
        let workspace = config.workspace_path_checked()?;
        let defaults = &config.agents.defaults;
        Ok(Self {
            max_iterations: defaults.max_tool_iterations,
            history_limit: defaults.history_limit,
            workspace: Some(workspace.to_string_lossy().into_owned()),
        })
    }

    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            history_limit: 50,
            workspace: None,
        }
    }
}

/// The main agent loop that processes messages and coordinates with the model.
///
/// One turn is a bounded state machine: call the model; if it asks for
/// tools, run them in order, append their results, and call it again; stop
/// when it answers without tool calls or `max_iterations` calls have been
/// made. Tool failures become `Error: ...` results the model can react to.
/// Model failures end the turn.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use golem::agent::{AgentLoop, AgentSettings};
/// use golem::bus::MessageBus;
/// use golem::session::SessionManager;
///
/// # tokio_test::block_on(async {
/// let agent = AgentLoop::new(
///     AgentSettings::default(),
///     Arc::new(MessageBus::new()),
///     Arc::new(SessionManager::new_memory()),
///     None,
/// );
/// assert!(!agent.is_running());
///
/// // Without a model every turn answers with a fixed message.
/// let reply = agent.process_direct("hello").await.unwrap();
/// assert_eq!(reply, "No model configured");
/// # });
/// ```
pub struct AgentLoop {
    settings: AgentSettings,
    bus: Arc<MessageBus>,
    sessions: Arc<dyn SessionStore>,
    model: Option<Arc<dyn ChatModel>>,
    /// Registered tools
    tools: Arc<RwLock<ToolRegistry>>,
    /// Whether the current registry has been offered to the model
    tools_bound: AtomicBool,
    context_builder: ContextBuilder,
    events: broadcast::Sender<ToolEvent>,
    /// Whether the loop is currently running
    running: AtomicBool,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
}

impl AgentLoop {
    /// Create a new agent loop with the default context builder.
    pub fn new(
        settings: AgentSettings,
        bus: Arc<MessageBus>,
        sessions: Arc<dyn SessionStore>,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self::with_context_builder(settings, bus, sessions, model, ContextBuilder::new())
    }

    /// Create a new agent loop with a custom context builder.
    pub fn with_context_builder(
        settings: AgentSettings,
        bus: Arc<MessageBus>,
        sessions: Arc<dyn SessionStore>,
        model: Option<Arc<dyn ChatModel>>,
        context_builder: ContextBuilder,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            settings,
            bus,
            sessions,
            model,
            tools: Arc::new(RwLock::new(ToolRegistry::new())),
            tools_bound: AtomicBool::new(false),
            context_builder,
            events,
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Check if the agent loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register a tool with the agent.
    ///
    /// # Errors
    /// Returns `GolemError::Tool` if a tool with the same name exists.
    pub async fn register_tool(&self, tool: Box<dyn Tool>) -> Result<()> {
        let mut tools = self.tools.write().await;
        tools.register(tool)?;
        // The model has to see the new schema before its next call.
        self.tools_bound.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Register `read_file`, `write_file`, `list_dir` and `exec`.
    pub async fn register_default_tools(&self, exec: &ExecConfig) -> Result<()> {
        for tool in default_tools(exec) {
            self.register_tool(tool).await?;
        }
        Ok(())
    }

    /// Get the number of registered tools.
    pub async fn tool_count(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Check if a tool is registered.
    pub async fn has_tool(&self, name: &str) -> bool {
        self.tools.read().await.has(name)
    }

    /// Subscribe to tool start/finish events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ToolEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ToolEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Offer the registry's schemas to the model once per registry state.
    async fn ensure_tools_bound(&self, model: &Arc<dyn ChatModel>) -> Result<()> {
        if self.tools_bound.load(Ordering::SeqCst) {
            return Ok(());
        }
        let infos = self.tools.read().await.tool_infos();
        debug!(model = model.name(), tools = infos.len(), "Binding tools");
        model.bind_tools(infos).await?;
        self.tools_bound.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Process a single inbound message.
    ///
    /// This method:
    /// 1. Gets or creates the session for the message
    /// 2. Builds the context from the trailing history and the new content
    /// 3. Runs the model/tool loop
    /// 4. Saves one user and one assistant entry to the session
    /// 5. Returns the reply addressed to the message's origin
    ///
    /// # Errors
    /// Returns an error if the model call fails or the session cannot be
    /// loaded or saved. Tool failures are not errors.
    pub async fn process_message(&self, msg: &InboundMessage) -> Result<OutboundMessage> {
        let session_key = msg.session_key();
        let mut session = self.sessions.get_or_create(&session_key).await?;

        let mut runtime = RuntimeContext::new()
            .with_channel(&msg.channel)
            .with_current_time();
        let mut tool_ctx = ToolContext::new().with_channel(&msg.channel, &msg.chat_id);
        if let Some(ref workspace) = self.settings.workspace {
            runtime = runtime.with_workspace(workspace);
            tool_ctx = tool_ctx.with_workspace(workspace);
        }

        let mut messages = self.context_builder.build_messages(
            session.get_history(self.settings.history_limit),
            &msg.content,
            &msg.media,
            &runtime,
        );

        let content = self.run_turn(&mut messages, &tool_ctx).await?;

        session.add_message(Message::user(&msg.content));
        session.add_message(Message::assistant(&content));
        self.sessions.save(&session).await?;

        Ok(OutboundMessage::reply_to(msg, &content))
    }

    /// The model/tool state machine for one turn.
    async fn run_turn(&self, messages: &mut Vec<Message>, tool_ctx: &ToolContext) -> Result<String> {
        let Some(model) = self.model.as_ref() else {
            return Ok(NO_MODEL_RESPONSE.to_string());
        };
        self.ensure_tools_bound(model).await?;

        let max_iterations = self.settings.max_iterations;
        for iteration in 1..=max_iterations {
            let response = model.generate(messages.as_slice()).await?;

            let calls = match response.tool_calls {
                Some(ref calls) if !calls.is_empty() => calls.clone(),
                _ => {
                    if response.content.is_empty() {
                        return Ok(FALLBACK_RESPONSE.to_string());
                    }
                    return Ok(response.content);
                }
            };
            debug!("Tool iteration {} of {}", iteration, max_iterations);
            messages.push(response);

            for call in &calls {
                info!(tool = %call.name, id = %call.id, "Executing tool");
                self.emit(ToolEvent::Started {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                let outcome = {
                    let tools = self.tools.read().await;
                    tools.execute(&call.name, &call.arguments, tool_ctx).await
                };
                let (result, error) = match outcome {
                    Ok(result) => (result, None),
                    Err(e) => (format!("Error: {}", e), Some(e.to_string())),
                };

                self.emit(ToolEvent::Finished {
                    name: call.name.clone(),
                    result: result.clone(),
                    error,
                });
                messages.push(Message::tool_result(&call.id, &result));
            }
        }

        info!(
            iterations = max_iterations,
            "Tool loop reached maximum iterations, returning fallback response"
        );
        Ok(FALLBACK_RESPONSE.to_string())
    }

    /// Process one message outside the bus, as the CLI does.
    pub async fn process_direct(&self, content: &str) -> Result<String> {
        let msg = InboundMessage::new("cli", "user", "direct", content);
        let response = self.process_message(&msg).await?;
        Ok(response.content)
    }

    /// Run the agent loop, consuming from the message bus.
    ///
    /// Each inbound message is processed to completion before the next is
    /// taken. A failed turn is answered with `Error: <message>`. The loop ends
    /// when `stop()` is called or the bus is closed; a turn still in flight at
    /// `stop()` is dropped without a reply or a session write.
    ///
    /// # Errors
    /// Returns an error if the loop is already running.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(GolemError::Config("Agent loop already running".into()));
        }
        info!("Starting agent loop");

        // Clear the signal left by a previous run before watching for a new one.
        self.shutdown_tx.send_replace(false);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if !self.running.load(Ordering::SeqCst) {
            info!("Agent loop stopped before it started");
            return Ok(());
        }

        loop {
            let msg = tokio::select! {
                _ = shutdown_rx.wait_for(|stopped| *stopped) => {
                    info!("Received shutdown signal");
                    break;
                }
                msg = self.bus.consume_inbound() => msg,
            };
            let Some(msg) = msg else {
                info!("Inbound channel closed");
                break;
            };

            let request_span = info_span!(
                "request",
                request_id = %uuid::Uuid::new_v4(),
                chat_id = %msg.chat_id,
                session_id = %msg.session_key(),
                channel = %msg.channel,
                sender = %msg.sender_id,
            );
            tokio::select! {
                _ = self.handle_inbound(&msg).instrument(request_span) => {}
                _ = shutdown_rx.wait_for(|stopped| *stopped) => {
                    warn!(session_id = %msg.session_key(), "Shutdown during turn, request abandoned");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Agent loop stopped");
        Ok(())
    }

    async fn handle_inbound(&self, msg: &InboundMessage) {
        info!("Processing message");
        let start = std::time::Instant::now();

        let outbound = match self.process_message(msg).await {
            Ok(response) => {
                info!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    response_len = response.content.len(),
                    "Request completed"
                );
                response
            }
            Err(e) => {
                error!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Request failed"
                );
                OutboundMessage::reply_to(msg, &format!("Error: {}", e))
            }
        };

        if let Err(e) = self.bus.publish_outbound(outbound).await {
            warn!(error = %e, "Failed to publish outbound message");
        }
    }

    /// Stop the agent loop.
    ///
    /// A turn in progress is cancelled: its model call and tool execution are
    /// dropped, and `exec` children are killed with them.
    pub fn stop(&self) {
        info!("Stopping agent loop");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Get a reference to the message bus.
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}
