use crate::classify::ResultClassifier;
use concord_config::EngineConfig;
use concord_protocol::{
    ConfirmationRequest, Conversation, Part, ToolCall, ToolCallCreated, ToolCallStatus,
    ToolCallUpdated,
};
use serde_json::Value;

/// What a tool-call update ended up touching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied {
        tool_call_id: String,
        /// Matched through the running-edit fallback rather than by id
        fallback: bool,
        /// Other running edit calls settled alongside
        swept: usize,
    },
    /// Known id, but the status would move backwards or leave a terminal state
    Ignored { tool_call_id: String },
    Unmatched,
}

/// Tool-call lifecycle rules applied inside a conversation transaction
#[derive(Debug, Clone)]
pub struct ToolCallMachine {
    classifier: ResultClassifier,
    edit_fragment: String,
    synthesized_edit_name: String,
    fallback_edit_match: bool,
    sweep_running_edits: bool,
}

impl ToolCallMachine {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            classifier: ResultClassifier::from_config(config),
            edit_fragment: config.edit_tool_fragment.clone(),
            synthesized_edit_name: config.synthesized_edit_tool_name.clone(),
            fallback_edit_match: config.heuristics.fallback_edit_match,
            sweep_running_edits: config.heuristics.sweep_running_edits,
        }
    }

    pub fn classifier(&self) -> &ResultClassifier {
        &self.classifier
    }

    fn is_edit_family(&self, call: &ToolCall) -> bool {
        call.name.contains(self.edit_fragment.as_str())
    }

    /// Appends a pending tool call unless the id is already present.
    ///
    /// Returns whether a call was added.
    pub fn create(
        &self,
        conversation: &mut Conversation,
        created: ToolCallCreated,
        raw_input: Option<Value>,
        pending_confirmation: Option<ConfirmationRequest>,
    ) -> bool {
        if conversation.has_tool_call(&created.id) {
            tracing::debug!("Ignoring duplicate tool call {}", created.id);
            return false;
        }

        let mut call = ToolCall::new(created.id, created.name, created.parameters)
            .with_label(created.label)
            .with_icon(created.icon)
            .with_raw_input(raw_input);
        call.confirmation_request = pending_confirmation;

        conversation
            .open_assistant_message()
            .parts
            .push(Part::tool_call(call));
        true
    }

    pub fn update(
        &self,
        conversation: &mut Conversation,
        update: &ToolCallUpdated,
        raw_output: Option<Value>,
    ) -> UpdateOutcome {
        if !update.is_finished() {
            let Some(call) = conversation.find_tool_call_mut(&update.tool_call_id) else {
                return UpdateOutcome::Unmatched;
            };
            let tool_call_id = call.id.clone();
            return if call.advance(ToolCallStatus::from_wire(&update.status)) {
                UpdateOutcome::Applied {
                    tool_call_id,
                    fallback: false,
                    swept: 0,
                }
            } else {
                UpdateOutcome::Ignored { tool_call_id }
            };
        }

        let status = self.classifier.classify(update.content.as_ref());

        let (target, fallback) = if conversation.has_tool_call(&update.tool_call_id) {
            (update.tool_call_id.clone(), false)
        } else if self.fallback_edit_match {
            match conversation
                .tool_calls()
                .rev()
                .find(|call| call.is_running() && self.is_edit_family(call))
            {
                Some(call) => {
                    tracing::debug!(
                        "Finished update for unknown {} matched running edit call {}",
                        update.tool_call_id,
                        call.id
                    );
                    (call.id.clone(), true)
                }
                None => return UpdateOutcome::Unmatched,
            }
        } else {
            return UpdateOutcome::Unmatched;
        };

        let applied = match conversation.find_tool_call_mut(&target) {
            Some(call) => finish(call, status.clone(), update.content.clone(), raw_output),
            None => false,
        };
        if !applied {
            return UpdateOutcome::Ignored {
                tool_call_id: target,
            };
        }

        let swept = if self.sweep_running_edits {
            self.sweep(conversation, &target, &status)
        } else {
            0
        };

        UpdateOutcome::Applied {
            tool_call_id: target,
            fallback,
            swept,
        }
    }

    fn sweep(&self, conversation: &mut Conversation, settled: &str, status: &ToolCallStatus) -> usize {
        let fragment = self.edit_fragment.as_str();
        conversation
            .tool_calls_mut()
            .filter(|call| call.id != settled && call.is_running() && call.name.contains(fragment))
            .map(|call| call.advance(status.clone()))
            .filter(|changed| *changed)
            .count()
    }

    /// Attaches a confirmation request to its tool call, synthesizing an
    /// edit call when the request arrives first.
    ///
    /// Returns whether a tool call was synthesized.
    pub fn confirm(&self, conversation: &mut Conversation, request: &ConfirmationRequest) -> bool {
        let target = request.target_id();

        if let Some(call) = conversation.find_tool_call_mut(&target) {
            call.confirmation_request = Some(request.clone());
            return false;
        }

        if !request.confirmation.is_edit() {
            tracing::debug!(
                "Confirmation {} has no tool call yet, keeping it pending",
                target
            );
            return false;
        }

        let mut call = ToolCall::new(
            target,
            self.synthesized_edit_name.clone(),
            Value::Object(request.confirmation.parameters.clone()),
        )
        .with_label(request.label.clone())
        .with_icon(request.icon.clone())
        .with_raw_input(request.raw_request.clone());
        call.confirmation_request = Some(request.clone());

        conversation
            .open_assistant_message()
            .parts
            .push(Part::tool_call(call));
        true
    }
}

impl Default for ToolCallMachine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn finish(
    call: &mut ToolCall,
    status: ToolCallStatus,
    result: Option<Value>,
    raw_output: Option<Value>,
) -> bool {
    if !call.advance(status) {
        return false;
    }
    call.result = result;
    if raw_output.is_some() {
        call.raw_output = raw_output;
    }
    true
}
