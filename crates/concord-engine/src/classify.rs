use concord_config::EngineConfig;
use concord_protocol::ToolCallStatus;
use serde_json::Value;

/// Fields whose presence (with a non-empty value) marks a result as failed
const ERROR_FIELDS: &[&str] = &["error", "stderr"];

/// Decides whether a finished tool result succeeded
#[derive(Debug, Clone)]
pub struct ResultClassifier {
    fingerprints: Vec<String>,
}

impl ResultClassifier {
    pub fn new(fingerprints: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            fingerprints: fingerprints
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.failure_fingerprints)
    }

    /// `Completed` or `Failed`; a missing result counts as success
    pub fn classify(&self, content: Option<&Value>) -> ToolCallStatus {
        match content {
            Some(content) if self.is_failure(content) => ToolCallStatus::Failed,
            _ => ToolCallStatus::Completed,
        }
    }

    pub fn is_failure(&self, content: &Value) -> bool {
        if has_error_field(content) {
            return true;
        }

        let mut texts = Vec::new();
        collect_text(content, &mut texts);
        texts.iter().any(|text| {
            let text = text.to_lowercase();
            self.fingerprints.iter().any(|f| text.contains(f.as_str()))
        })
    }
}

impl Default for ResultClassifier {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn has_error_field(content: &Value) -> bool {
    let Some(object) = content.as_object() else {
        return false;
    };

    ERROR_FIELDS
        .iter()
        .filter_map(|field| object.get(*field))
        .any(|value| match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Number(_) => true,
        })
}

fn collect_text<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_text(item, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_result_is_completed() {
        let classifier = ResultClassifier::default();
        assert_eq!(
            classifier.classify(Some(&json!({"markdown": "Read 10 lines"}))),
            ToolCallStatus::Completed
        );
        assert_eq!(classifier.classify(None), ToolCallStatus::Completed);
    }

    #[test]
    fn test_fingerprint_is_case_insensitive_and_nested() {
        let classifier = ResultClassifier::default();
        let content = json!({
            "blocks": [{"type": "text", "text": "bash: /etc/hosts: Permission Denied"}]
        });
        assert_eq!(classifier.classify(Some(&content)), ToolCallStatus::Failed);
        assert!(classifier.is_failure(&json!("sh: foo: command not found")));
        assert!(classifier.is_failure(&json!(["Traceback (most recent call last):"])));
    }

    #[test]
    fn test_error_fields() {
        let classifier = ResultClassifier::default();
        assert!(classifier.is_failure(&json!({"error": "boom"})));
        assert!(classifier.is_failure(&json!({"stderr": "warning"})));
        assert!(!classifier.is_failure(&json!({"stderr": "", "error": null})));
    }

    #[test]
    fn test_custom_fingerprints() {
        let classifier = ResultClassifier::new(["FATAL", ""]);
        assert!(classifier.is_failure(&json!({"markdown": "fatal: not a git repository"})));
        assert!(!classifier.is_failure(&json!({"markdown": "error: ignored here"})));
    }
}
