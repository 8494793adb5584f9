use concord_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Root configuration for the reconciliation engine
///
/// Example:
/// ```yaml
/// channel_capacity: 1024
/// history_window: 20
/// failure_fingerprints:
///   - "command not found"
///   - "permission denied"
/// heuristics:
///   fallback_edit_match: true
///   sweep_running_edits: false
/// telemetry:
///   level: "concord=debug"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Buffer size of each per-conversation broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Number of trailing transcript messages rolled up into an outgoing
    /// user message
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Tool names containing this fragment belong to the edit family
    #[serde(default = "default_edit_fragment")]
    pub edit_tool_fragment: String,

    /// Name given to tool calls created from an edit confirmation that
    /// arrived before its tool call
    #[serde(default = "default_edit_fragment")]
    pub synthesized_edit_tool_name: String,

    /// Case-insensitive substrings that mark a finished tool result as failed
    #[serde(default = "default_failure_fingerprints")]
    pub failure_fingerprints: Vec<String>,

    #[serde(default)]
    pub heuristics: HeuristicsSettings,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            history_window: default_history_window(),
            edit_tool_fragment: default_edit_fragment(),
            synthesized_edit_tool_name: default_edit_fragment(),
            failure_fingerprints: default_failure_fingerprints(),
            heuristics: HeuristicsSettings::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Workarounds for backends that report edit completion inconsistently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicsSettings {
    /// Apply an unmatched "finished" update to the latest running edit call
    #[serde(default = "default_true")]
    pub fallback_edit_match: bool,

    /// Settle every other running edit call when one edit finishes
    #[serde(default = "default_true")]
    pub sweep_running_edits: bool,
}

impl Default for HeuristicsSettings {
    fn default() -> Self {
        Self {
            fallback_edit_match: true,
            sweep_running_edits: true,
        }
    }
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_history_window() -> usize {
    20
}

fn default_edit_fragment() -> String {
    "edit".to_string()
}

fn default_true() -> bool {
    true
}

fn default_failure_fingerprints() -> Vec<String> {
    [
        "command not found",
        "permission denied",
        "error:",
        "exception:",
        "no such file or directory",
        "traceback (most recent call last)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
