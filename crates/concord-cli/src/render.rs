use crate::replay::ReplayReport;
use colored::Colorize;
use concord_protocol::{Conversation, Part, Sender, ToolCall, ToolCallStatus};
use std::fmt::Write;

pub fn render_report(report: &ReplayReport) -> String {
    let mut out = String::new();

    for conversation in &report.conversations {
        render_conversation(&mut out, conversation);
        out.push('\n');
    }

    for resolution in &report.resolutions {
        let _ = writeln!(
            out,
            "{} {} {}: {}",
            "resolve".cyan().bold(),
            resolution.tool_call_id,
            resolution.outcome,
            resolution.result
        );
    }

    if let Some(counts) = &report.channel_counts {
        let _ = writeln!(out, "{}", "Channels:".bold());
        for (kind, count) in counts {
            let _ = writeln!(out, "  {:<24} {}", kind, count);
        }
    }

    let _ = writeln!(
        out,
        "{} events applied, {} skipped",
        report.events, report.skipped
    );
    out
}

pub fn render_conversation(out: &mut String, conversation: &Conversation) {
    let streaming = if conversation.is_streaming {
        " (streaming)".yellow().to_string()
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "{} {}{}",
        "Conversation".bold(),
        conversation.id,
        streaming
    );

    for message in &conversation.messages {
        match message.sender {
            Sender::User => {
                let _ = writeln!(out, "{} {}", "user:".green().bold(), message.text());
            }
            Sender::Assistant => {
                let _ = writeln!(out, "{}", "assistant:".blue().bold());
                for part in &message.parts {
                    render_part(out, part);
                }
            }
        }
    }
}

fn render_part(out: &mut String, part: &Part) {
    match part {
        Part::Text { text } => {
            for line in text.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
        Part::Thinking { thinking } => {
            for line in thinking.lines() {
                let _ = writeln!(out, "  {}", line.dimmed());
            }
        }
        Part::ToolCall { tool_call } => render_tool_call(out, tool_call),
    }
}

fn render_tool_call(out: &mut String, call: &ToolCall) {
    let status = match &call.status {
        ToolCallStatus::Completed => call.status.as_str().green(),
        ToolCallStatus::Failed => call.status.as_str().red(),
        ToolCallStatus::Running => call.status.as_str().yellow(),
        _ => call.status.as_str().normal(),
    };
    let _ = writeln!(out, "  [tool {} {}] {}", call.id, call.name, status);

    if let Some(label) = &call.label {
        let _ = writeln!(out, "    {}", label.dimmed());
    }
    if let Some(request) = &call.confirmation_request {
        let _ = writeln!(
            out,
            "    confirmation: request {} ({})",
            request.request_id, request.confirmation.kind
        );
    }
    if let Some(result) = &call.result {
        let _ = writeln!(out, "    result: {}", result);
    }
}
