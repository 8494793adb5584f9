use concord_protocol::{Conversation, DeltaKind, Part};

/// Folds a streamed text or thinking fragment into the open assistant turn.
///
/// Consecutive deltas of the same kind grow the trailing part; a kind switch
/// starts a new part on the same message.
pub fn apply_delta(conversation: &mut Conversation, kind: DeltaKind, delta: &str) {
    conversation.is_streaming = true;

    if let Some(last) = conversation.last_message_mut() {
        if last.is_assistant() {
            if let Some(part) = last.last_part_mut() {
                if part.try_append(kind, delta) {
                    return;
                }
            }
        }
    }

    conversation
        .open_assistant_message()
        .parts
        .push(Part::delta(kind, delta));
}
