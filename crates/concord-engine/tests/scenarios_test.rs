mod common;

use common::*;
use concord_config::EngineConfig;
use concord_engine::{
    InMemoryConversationStore, ReconciliationEngine, ResolveOutcome, REJECTED_RESULT,
};
use concord_protocol::{BackendEvent, ConfirmationOutcome, Part, Sender, ToolCallStatus};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_scenario_a_read_file_completes() {
    let engine = make_engine(Arc::new(MockBridge::default()));

    engine.apply("c1", make_created("1", "read_file")).unwrap();
    engine
        .apply(
            "c1",
            make_updated("1", "finished", Some(json!({"markdown": "Read 10 lines"}))),
        )
        .unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(conversation.tool_calls().count(), 1);
    let call = conversation.find_tool_call("1").unwrap();
    assert_eq!(call.status, ToolCallStatus::Completed);
    assert_eq!(call.result, Some(json!({"markdown": "Read 10 lines"})));
}

#[tokio::test]
async fn test_scenario_b_reject_fails_tool_call() {
    let bridge = Arc::new(MockBridge::default());
    let engine = make_engine(bridge.clone());

    engine.apply("c1", make_created("2", "edit_file")).unwrap();
    engine
        .apply("c1", make_confirmation(5, Some("2"), "edit"))
        .unwrap();
    assert!(engine.confirmations().contains("2"));

    let outcome = engine.resolve("2", ConfirmationOutcome::Reject).await;
    assert_eq!(outcome, ResolveOutcome::Resolved);

    let conversation = engine.conversation("c1").unwrap();
    let call = conversation.find_tool_call("2").unwrap();
    assert_eq!(call.status, ToolCallStatus::Failed);
    assert_eq!(call.result, Some(json!({"markdown": REJECTED_RESULT})));
    assert!(engine.confirmations().is_empty());

    let sent = bridge.confirmations.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request_id.to_string(), "5");
    assert_eq!(sent[0].session_id, "ses_1");
    assert_eq!(sent[0].outcome, ConfirmationOutcome::Reject);
}

// Heuristic: completion reported under an id that was never created
#[tokio::test]
async fn test_scenario_c_fallback_matches_running_edit() {
    let engine = make_engine(Arc::new(MockBridge::default()));

    engine.apply("c1", make_created("3", "edit_config")).unwrap();
    engine.apply("c1", make_updated("3", "running", None)).unwrap();
    engine
        .apply("c1", make_updated("99", "finished", Some(json!({"error": "boom"}))))
        .unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert!(conversation.find_tool_call("99").is_none());
    assert_eq!(
        conversation.find_tool_call("3").unwrap().status,
        ToolCallStatus::Failed
    );
}

#[tokio::test]
async fn test_scenario_d_interleaved_deltas_make_three_parts() {
    let engine = make_engine(Arc::new(MockBridge::default()));

    engine.apply("c1", BackendEvent::thinking("Let me ")).unwrap();
    engine.apply("c1", BackendEvent::thinking("think.")).unwrap();
    engine.apply("c1", BackendEvent::text("Answer")).unwrap();
    engine.apply("c1", BackendEvent::thinking("More")).unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(
        conversation.messages[0].parts,
        vec![
            Part::thinking("Let me think."),
            Part::text("Answer"),
            Part::thinking("More"),
        ]
    );
}

#[tokio::test]
async fn test_text_deltas_concatenate_in_order() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    let deltas: Vec<String> = (0..50).map(|i| format!("{} ", i)).collect();

    for delta in &deltas {
        engine.apply("c1", BackendEvent::text(delta.clone())).unwrap();
    }

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(conversation.last_message().unwrap().text(), deltas.concat());
    assert!(conversation.is_streaming);
}

#[tokio::test]
async fn test_duplicate_creation_leaves_transcript_unchanged() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    engine.apply("c1", make_created("1", "bash")).unwrap();
    let before = engine.conversation("c1").unwrap();

    engine.apply("c1", make_created("1", "bash")).unwrap();

    let after = engine.conversation("c1").unwrap();
    assert_eq!(after.messages, before.messages);
}

#[tokio::test]
async fn test_permission_denied_fails() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    engine.apply("c1", make_created("1", "bash")).unwrap();
    engine
        .apply(
            "c1",
            make_updated(
                "1",
                "finished",
                Some(json!({"markdown": "cat: /root/x: Permission denied"})),
            ),
        )
        .unwrap();

    assert_eq!(
        engine.conversation("c1").unwrap().find_tool_call("1").unwrap().status,
        ToolCallStatus::Failed
    );
}

#[tokio::test]
async fn test_allow_moves_to_running_once() {
    let bridge = Arc::new(MockBridge::default());
    let engine = make_engine(bridge.clone());
    engine.apply("c1", make_created("7", "bash")).unwrap();
    engine.apply("c1", make_confirmation(1, Some("7"), "exec")).unwrap();

    assert_eq!(
        engine.resolve("7", ConfirmationOutcome::Allow).await,
        ResolveOutcome::Resolved
    );
    assert_eq!(
        engine.resolve("7", ConfirmationOutcome::Allow).await,
        ResolveOutcome::NotPending
    );

    let conversation = engine.conversation("c1").unwrap();
    assert!(conversation.find_tool_call("7").unwrap().is_running());
    assert!(engine.confirmations().is_empty());
    assert_eq!(bridge.confirmations.lock().len(), 1);
}

#[tokio::test]
async fn test_cancel_leaves_status() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    engine.apply("c1", make_created("7", "bash")).unwrap();
    engine.apply("c1", make_confirmation(1, Some("7"), "exec")).unwrap();

    engine.resolve("7", ConfirmationOutcome::Cancel).await;

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(
        conversation.find_tool_call("7").unwrap().status,
        ToolCallStatus::Pending
    );
    assert!(engine.confirmations().is_empty());
}

#[tokio::test]
async fn test_confirmation_before_creation_synthesizes_edit() {
    let engine = make_engine(Arc::new(MockBridge::default()));

    engine.apply("c1", make_confirmation(12, None, "edit")).unwrap();
    engine.apply("c1", make_created("12", "edit_file")).unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(conversation.tool_calls().count(), 1);
    let call = conversation.find_tool_call("12").unwrap();
    assert_eq!(call.name, "edit");
    assert!(call.confirmation_request.is_some());
    assert!(engine.confirmations().contains("12"));
}

#[tokio::test]
async fn test_creation_adopts_earlier_confirmation() {
    let engine = make_engine(Arc::new(MockBridge::default()));

    engine.apply("c1", make_confirmation(4, Some("x"), "exec")).unwrap();
    assert_eq!(engine.conversation("c1").unwrap().tool_calls().count(), 0);

    engine.apply("c1", make_created("x", "bash")).unwrap();
    let conversation = engine.conversation("c1").unwrap();
    let call = conversation.find_tool_call("x").unwrap();
    assert_eq!(
        call.confirmation_request.as_ref().unwrap().request_id.to_string(),
        "4"
    );
}

#[tokio::test]
async fn test_error_event_appends_message_and_stops_streaming() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    engine.apply("c1", make_created("1", "bash")).unwrap();
    engine.apply("c1", BackendEvent::text("partial")).unwrap();

    engine.apply("c1", make_error("model overloaded")).unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert!(!conversation.is_streaming);
    let last = conversation.last_message().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert_eq!(last.text(), "Error: model overloaded");
    assert_eq!(
        conversation.find_tool_call("1").unwrap().status,
        ToolCallStatus::Pending
    );
}

#[tokio::test]
async fn test_turn_finished_only_stops_streaming() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    engine.apply("c1", BackendEvent::text("done")).unwrap();
    let before = engine.conversation("c1").unwrap();

    engine.apply("c1", BackendEvent::TurnFinished).unwrap();

    let after = engine.conversation("c1").unwrap();
    assert!(!after.is_streaming);
    assert_eq!(after.messages, before.messages);
}

#[tokio::test]
async fn test_raw_input_recorded_on_tool_call() {
    use concord_protocol::{RawIo, RawIoDirection};

    let engine = make_engine(Arc::new(MockBridge::default()));
    let raw = |line: &str| {
        BackendEvent::RawIo(RawIo {
            direction: RawIoDirection::Input,
            line: line.to_string(),
        })
    };

    engine.apply("c1", raw(r#"{"method":"toolCall","id":"1"}"#)).unwrap();
    engine.apply("c1", raw("not json")).unwrap();
    engine.apply("c1", make_created("1", "bash")).unwrap();
    engine.apply("c1", raw(r#"{"method":"toolCallUpdate","id":"1"}"#)).unwrap();
    engine.apply("c1", make_updated("1", "finished", None)).unwrap();

    let conversation = engine.conversation("c1").unwrap();
    let call = conversation.find_tool_call("1").unwrap();
    assert_eq!(call.raw_input, Some(json!({"method": "toolCall", "id": "1"})));
    assert_eq!(
        call.raw_output,
        Some(json!({"method": "toolCallUpdate", "id": "1"}))
    );
}

#[tokio::test]
async fn test_events_for_unknown_conversation_are_errors() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    assert!(engine.apply("nope", BackendEvent::text("x")).is_err());
    assert!(engine.conversation("nope").is_none());
}

fn start_running(engine: &ReconciliationEngine, id: &str, name: &str) {
    engine.apply("c1", make_created(id, name)).unwrap();
    engine.apply("c1", make_updated(id, "running", None)).unwrap();
}

// Heuristic: fallback picks the latest running edit, the sweep settles the rest
#[tokio::test]
async fn test_fallback_and_sweep_settle_every_running_edit() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    start_running(&engine, "a", "edit_a");
    start_running(&engine, "b", "edit_b");
    start_running(&engine, "r", "read_file");

    engine
        .apply("c1", make_updated("99", "finished", Some(json!({"markdown": "Saved"}))))
        .unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert!(conversation.find_tool_call("99").is_none());

    let matched = conversation.find_tool_call("b").unwrap();
    assert_eq!(matched.status, ToolCallStatus::Completed);
    assert_eq!(matched.result, Some(json!({"markdown": "Saved"})));

    let swept = conversation.find_tool_call("a").unwrap();
    assert_eq!(swept.status, ToolCallStatus::Completed);
    assert_eq!(swept.result, None);

    assert_eq!(
        conversation.find_tool_call("r").unwrap().status,
        ToolCallStatus::Running
    );
}

// Heuristic: the sweep also follows an update matched by id
#[tokio::test]
async fn test_sweep_follows_failed_update_matched_by_id() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    start_running(&engine, "a", "edit_a");
    start_running(&engine, "b", "edit_b");

    engine
        .apply(
            "c1",
            make_updated("a", "finished", Some(json!({"stderr": "Permission denied"}))),
        )
        .unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(
        conversation.find_tool_call("a").unwrap().status,
        ToolCallStatus::Failed
    );
    assert_eq!(
        conversation.find_tool_call("b").unwrap().status,
        ToolCallStatus::Failed
    );
}

// Heuristic: only finished updates fall back to a running edit
#[tokio::test]
async fn test_unknown_non_finished_update_does_not_fall_back() {
    let engine = make_engine(Arc::new(MockBridge::default()));
    start_running(&engine, "a", "edit_a");
    let before = engine.conversation("c1").unwrap();

    engine
        .apply("c1", make_updated("99", "running", Some(json!({"markdown": "x"}))))
        .unwrap();
    engine.apply("c1", make_updated("99", "pending", None)).unwrap();

    let after = engine.conversation("c1").unwrap();
    assert_eq!(after.messages, before.messages);
    let call = after.find_tool_call("a").unwrap();
    assert_eq!(call.status, ToolCallStatus::Running);
    assert_eq!(call.result, None);
}

// Heuristic toggles switched off
#[tokio::test]
async fn test_disabled_heuristics_leave_running_edits_alone() {
    let mut config = EngineConfig::default();
    config.heuristics.fallback_edit_match = false;
    config.heuristics.sweep_running_edits = false;
    let engine = ReconciliationEngine::new(
        &config,
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(MockBridge::default()),
    );
    engine.open_conversation("c1", "Test conversation");
    start_running(&engine, "a", "edit_a");
    start_running(&engine, "b", "edit_b");

    engine
        .apply("c1", make_updated("99", "finished", None))
        .unwrap();
    engine.apply("c1", make_updated("a", "finished", None)).unwrap();

    let conversation = engine.conversation("c1").unwrap();
    assert_eq!(
        conversation.find_tool_call("a").unwrap().status,
        ToolCallStatus::Completed
    );
    assert_eq!(
        conversation.find_tool_call("b").unwrap().status,
        ToolCallStatus::Running
    );
}
