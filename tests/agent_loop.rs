//! End-to-end agent loop tests driven by scripted models.
//!
//! No network access: every model is an in-test `ChatModel` that replays a
//! fixed list of replies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::tempdir;

use golem::agent::{AgentLoop, AgentSettings, ToolEvent, FALLBACK_RESPONSE};
use golem::bus::{InboundMessage, MessageBus};
use golem::config::ExecConfig;
use golem::error::{GolemError, Result};
use golem::providers::ChatModel;
use golem::session::{Message, Role, SessionManager, SessionStore, ToolCall};

// ============================================================================
// Helpers
// ============================================================================

/// Replays scripted replies and counts calls.
struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    /// Reply used once the script runs out
    repeat: Option<Message>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn repeating(reply: Message) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            repeat: Some(reply),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_call(&self) -> Vec<Message> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, messages: &[Message]) -> Result<Message> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone())
            .ok_or_else(|| GolemError::Provider("script exhausted".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn call(id: &str, name: &str, args: &str) -> Message {
    Message::assistant_with_tools("", vec![ToolCall::new(id, name, args)])
}

fn build_agent(
    model: Arc<ScriptedModel>,
    settings: AgentSettings,
) -> (AgentLoop, Arc<SessionManager>, Arc<MessageBus>) {
    let sessions = Arc::new(SessionManager::new_memory());
    let bus = Arc::new(MessageBus::new());
    let agent = AgentLoop::new(
        settings,
        bus.clone(),
        sessions.clone(),
        Some(model as Arc<dyn ChatModel>),
    );
    (agent, sessions, bus)
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<ToolEvent>) -> Vec<ToolEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_plain_answer_over_the_bus() {
    let model = ScriptedModel::new(vec![Message::assistant("4")]);
    let (agent, sessions, bus) = build_agent(model.clone(), AgentSettings::default());
    let agent = Arc::new(agent);

    let runner = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.run().await })
    };

    bus.publish_inbound(InboundMessage::new("cli", "user", "direct", "2+2?"))
        .await
        .unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), bus.consume_outbound())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.channel, "cli");
    assert_eq!(reply.chat_id, "direct");
    assert_eq!(reply.content, "4");

    agent.stop();
    tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let session = sessions.get("cli:direct").await.unwrap().unwrap();
    assert_eq!(session.message_count(), 2);
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[0].content, "2+2?");
    assert_eq!(session.messages[1].role, Role::Assistant);
    assert_eq!(session.messages[1].content, "4");
    assert_eq!(model.call_count(), 1);

    // Exactly one reply was published.
    bus.close();
    assert!(bus.consume_outbound().await.is_none());
}

#[tokio::test]
async fn test_list_dir_tool_then_answer() {
    let workspace = tempdir().unwrap();
    std::fs::write(workspace.path().join("notes.txt"), "hello").unwrap();
    std::fs::create_dir(workspace.path().join("src")).unwrap();

    let model = ScriptedModel::new(vec![
        call("call_1", "list_dir", r#"{"path": "."}"#),
        Message::assistant("The workspace has notes.txt and src/"),
    ]);
    let settings = AgentSettings::default().with_workspace(workspace.path().to_str().unwrap());
    let (agent, _, _) = build_agent(model.clone(), settings);
    agent.register_default_tools(&ExecConfig::default()).await.unwrap();
    let mut events = agent.subscribe_events();

    let reply = agent
        .process_message(&InboundMessage::new("cli", "user", "direct", "What is here?"))
        .await
        .unwrap();

    assert_eq!(reply.content, "The workspace has notes.txt and src/");
    assert_eq!(model.call_count(), 2);

    let finished: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, ToolEvent::Finished { .. }))
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(!finished[0].is_error());

    // The second model call saw the tool result.
    let second = model.last_call();
    let tool_result = second.iter().find(|m| m.role == Role::Tool).unwrap();
    assert_eq!(tool_result.tool_call_id.as_deref(), Some("call_1"));
    let names: Vec<String> = serde_json::from_str(&tool_result.content).unwrap();
    assert_eq!(names, vec!["notes.txt", "src/"]);
}

#[tokio::test]
async fn test_read_file_window_through_agent() {
    let workspace = tempdir().unwrap();
    std::fs::write(
        workspace.path().join("lines.txt"),
        "line1\nline2\nline3\nline4",
    )
    .unwrap();

    let model = ScriptedModel::new(vec![
        call(
            "call_1",
            "read_file",
            r#"{"path": "lines.txt", "offset": 1, "limit": 2}"#,
        ),
        Message::assistant("done"),
    ]);
    let settings = AgentSettings::default().with_workspace(workspace.path().to_str().unwrap());
    let (agent, _, _) = build_agent(model.clone(), settings);
    agent.register_default_tools(&ExecConfig::default()).await.unwrap();

    agent.process_direct("read it").await.unwrap();

    let second = model.last_call();
    let tool_result = second.iter().find(|m| m.role == Role::Tool).unwrap();
    let parsed: Value = serde_json::from_str(&tool_result.content).unwrap();
    assert_eq!(parsed["content"], "line2\nline3");
    assert_eq!(parsed["total_lines"], 4);
}

// ============================================================================
// Limits and failures
// ============================================================================

#[tokio::test]
async fn test_iteration_cap_returns_fallback() {
    let model = ScriptedModel::repeating(call("loop", "missing_tool", "{}"));
    let settings = AgentSettings::default().with_max_iterations(3);
    let (agent, sessions, _) = build_agent(model.clone(), settings);

    let reply = agent.process_direct("spin").await.unwrap();

    assert_eq!(reply, FALLBACK_RESPONSE);
    assert_eq!(model.call_count(), 3);

    let session = sessions.get("cli:direct").await.unwrap().unwrap();
    assert_eq!(session.messages.last().unwrap().content, FALLBACK_RESPONSE);
}

#[tokio::test]
async fn test_tool_errors_become_results() {
    let workspace = tempdir().unwrap();
    let model = ScriptedModel::new(vec![
        Message::assistant_with_tools(
            "",
            vec![
                ToolCall::new("a", "read_file", r#"{"path": "../../etc/passwd"}"#),
                ToolCall::new("b", "nope", "{}"),
                ToolCall::new("c", "list_dir", "not json"),
            ],
        ),
        Message::assistant("recovered"),
    ]);
    let settings = AgentSettings::default().with_workspace(workspace.path().to_str().unwrap());
    let (agent, _, _) = build_agent(model.clone(), settings);
    agent.register_default_tools(&ExecConfig::default()).await.unwrap();
    let mut events = agent.subscribe_events();

    let reply = agent.process_direct("try things").await.unwrap();
    assert_eq!(reply, "recovered");

    let second = model.last_call();
    let results: Vec<&Message> = second.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(
            result.content.starts_with("Error: "),
            "expected an error result, got {}",
            result.content
        );
    }
    // Results keep the order the model asked for.
    let ids: Vec<_> = results
        .iter()
        .map(|m| m.tool_call_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let failures = drain_events(&mut events)
        .into_iter()
        .filter(ToolEvent::is_error)
        .count();
    assert_eq!(failures, 3);
}

#[tokio::test]
async fn test_model_failure_leaves_session_untouched() {
    let model = ScriptedModel::new(vec![]);
    let (agent, sessions, _) = build_agent(model, AgentSettings::default());

    let err = agent.process_direct("hello").await.unwrap_err();
    assert!(err.to_string().contains("script exhausted"));

    let session = sessions.get_or_create("cli:direct").await.unwrap();
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_history_carries_between_turns() {
    let model = ScriptedModel::new(vec![
        Message::assistant("Nice to meet you, Ada"),
        Message::assistant("Your name is Ada"),
    ]);
    let (agent, _, _) = build_agent(model.clone(), AgentSettings::default());

    agent.process_direct("I am Ada").await.unwrap();
    agent.process_direct("Who am I?").await.unwrap();

    let second = model.last_call();
    assert_eq!(second.first().unwrap().role, Role::System);
    let contents: Vec<&str> = second.iter().skip(1).map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["I am Ada", "Nice to meet you, Ada", "Who am I?"]
    );
}
