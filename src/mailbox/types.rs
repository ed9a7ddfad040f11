//! Data types produced by the mailbox backend.

use serde::{Deserialize, Serialize};

/// Importance bucket assigned by the backend's analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportanceLevel {
    High,
    Medium,
    Low,
}

impl ImportanceLevel {
    /// Lowercase form for spoken prompts.
    pub fn spoken(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for ImportanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

/// How fast a reply is estimated to be needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseUrgency {
    Immediate,
    WithinHour,
    WithinDay,
    WhenConvenient,
}

/// Analysis sub-record attached to an email.
///
/// Normally produced by the backend's generative scorer; when that output is
/// missing or unparseable the rule-based fallback in [`crate::mailbox::analysis`]
/// produces an equivalent record, and the core treats both origins the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalysis {
    /// 0-100.
    pub importance_score: u8,
    pub importance_level: ImportanceLevel,
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub urgency_indicators: Vec<String>,
    #[serde(default)]
    pub action_required: bool,
    #[serde(default = "ResponseUrgency::default_when_convenient")]
    pub estimated_response_time: ResponseUrgency,
}

impl ResponseUrgency {
    fn default_when_convenient() -> Self {
        Self::WhenConvenient
    }
}

/// One analyzed email as returned by the backend. Read-only input to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub sender: String,
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub snippet: String,
    /// Absent when the backend's scorer failed; see `analysis_or_fallback`.
    /// Accepts either a structured object or the scorer's raw text output
    /// (JSON wrapped in prose); anything unusable becomes `None`.
    #[serde(default, deserialize_with = "deserialize_analysis")]
    pub analysis: Option<EmailAnalysis>,
}

fn deserialize_analysis<'de, D>(deserializer: D) -> Result<Option<EmailAnalysis>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(text) => crate::mailbox::analysis::parse_generated(&text),
        other => serde_json::from_value::<EmailAnalysis>(other)
            .ok()
            .filter(|a| a.importance_score <= 100),
    }))
}

impl EmailRecord {
    /// The attached analysis, or the deterministic rule-based fallback.
    pub fn analysis_or_fallback(&self) -> EmailAnalysis {
        self.analysis
            .clone()
            .unwrap_or_else(|| crate::mailbox::analysis::fallback_analysis(self))
    }
}

/// The email under the cursor plus its position in the listing, e.g. "2 of 5".
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentEmail {
    pub email: EmailRecord,
    pub position: String,
}

/// Result of a cursor advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to the next email; carries the backend's confirmation text.
    Moved(String),
    /// The listing is exhausted.
    Exhausted,
}

// ── Wire envelope for the invoke_tool RPC ───────────────────────────────

/// Request body for `POST /invoke_tool`.
#[derive(Debug, Serialize)]
pub struct ToolInvocation<'a> {
    pub tool: &'a str,
    pub user_id: &'a str,
    pub arguments: serde_json::Value,
}

/// Response body from `POST /invoke_tool`.
#[derive(Debug, Deserialize)]
pub struct ToolResponse {
    pub result: String,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_level_round_trips_uppercase() {
        let level: ImportanceLevel = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(level, ImportanceLevel::High);
        assert_eq!(serde_json::to_string(&level).unwrap(), "\"HIGH\"");
    }

    #[test]
    fn email_record_tolerates_missing_analysis() {
        let record: EmailRecord = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "sender": "Alice <alice@example.com>",
            "subject": "Lunch?",
        }))
        .unwrap();
        assert!(record.analysis.is_none());
        // Fallback kicks in transparently.
        let analysis = record.analysis_or_fallback();
        assert!(analysis.importance_score <= 100);
    }

    #[test]
    fn analysis_defaults_optional_fields() {
        let analysis: EmailAnalysis = serde_json::from_value(serde_json::json!({
            "importance_score": 85,
            "importance_level": "HIGH",
            "reasoning": ["deadline today"],
        }))
        .unwrap();
        assert!(!analysis.action_required);
        assert_eq!(
            analysis.estimated_response_time,
            ResponseUrgency::WhenConvenient
        );
    }

    #[test]
    fn analysis_field_accepts_raw_scorer_text() {
        let record: EmailRecord = serde_json::from_value(serde_json::json!({
            "id": "m3",
            "sender": "alice@example.com",
            "subject": "Quarterly report",
            "analysis": "Here you go: {\"importance_score\": 75, \
                \"importance_level\": \"HIGH\", \"reasoning\": [\"deadline\"]}",
        }))
        .unwrap();
        let analysis = record.analysis.unwrap();
        assert_eq!(analysis.importance_score, 75);
        assert_eq!(analysis.importance_level, ImportanceLevel::High);
    }

    #[test]
    fn unusable_analysis_field_becomes_none() {
        let record: EmailRecord = serde_json::from_value(serde_json::json!({
            "id": "m4",
            "sender": "alice@example.com",
            "subject": "Hi",
            "analysis": "the scorer produced no JSON here",
        }))
        .unwrap();
        assert!(record.analysis.is_none());
        // Out-of-range structured scores are discarded the same way.
        let record: EmailRecord = serde_json::from_value(serde_json::json!({
            "id": "m5",
            "sender": "alice@example.com",
            "subject": "Hi",
            "analysis": {
                "importance_score": 250,
                "importance_level": "HIGH",
                "reasoning": [],
            },
        }))
        .unwrap();
        assert!(record.analysis.is_none());
    }

    #[test]
    fn current_email_parses_backend_shape() {
        let current: CurrentEmail = serde_json::from_value(serde_json::json!({
            "email": {
                "id": "m2",
                "sender": "bob@example.com",
                "subject": "Invoice",
                "body": "Please pay",
            },
            "position": "2 of 5",
        }))
        .unwrap();
        assert_eq!(current.position, "2 of 5");
        assert_eq!(current.email.subject, "Invoice");
    }
}
