//! Importance-analysis tolerance path.
//!
//! The backend normally scores emails with its generative model and attaches
//! an [`EmailAnalysis`] record. That model can return JSON wrapped in prose,
//! partial JSON, or nothing at all. This module extracts what it can and
//! otherwise falls back to a deterministic rule-based score, so the rest of
//! the core never cares which origin produced the analysis.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::mailbox::types::{EmailAnalysis, EmailRecord, ImportanceLevel, ResponseUrgency};

/// Subject keywords that suggest urgency.
const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "important",
    "deadline",
    "action required",
    "invoice",
    "payment",
    "security",
    "verify",
    "expire",
];

static ADDRESS_IN_ANGLE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

/// Parse a generated analysis blob, tolerating prose around the JSON object.
///
/// Returns `None` when no complete object is present or required fields are
/// missing; callers then use [`fallback_analysis`].
pub fn parse_generated(text: &str) -> Option<EmailAnalysis> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<EmailAnalysis>(&text[start..=end]) {
        Ok(analysis) if analysis.importance_score <= 100 => Some(analysis),
        Ok(_) => {
            debug!("Generated analysis has out-of-range score, discarding");
            None
        }
        Err(e) => {
            debug!(error = %e, "Generated analysis did not parse, using fallback");
            None
        }
    }
}

/// Deterministic rule-based analysis, used when the generated one is unusable.
pub fn fallback_analysis(email: &EmailRecord) -> EmailAnalysis {
    let mut score: u8 = 0;
    let mut reasoning = Vec::new();

    let sender_address = extract_address(&email.sender).to_lowercase();
    if !sender_address.contains("noreply") && !sender_address.contains("no-reply") {
        score += 20;
        reasoning.push("Personal email (not automated)".to_string());
    }

    let subject_lower = email.subject.to_lowercase();
    let urgency_indicators: Vec<String> = URGENT_KEYWORDS
        .iter()
        .filter(|kw| subject_lower.contains(**kw))
        .map(|kw| kw.to_string())
        .collect();
    if !urgency_indicators.is_empty() {
        score += 30;
        reasoning.push(format!("Urgent keywords: {}", urgency_indicators.join(", ")));
    }

    if email.labels.iter().any(|l| l == "IMPORTANT") {
        score += 25;
        reasoning.push("Marked as important".to_string());
    }
    if email.labels.iter().any(|l| l == "CATEGORY_PRIMARY") {
        score += 15;
        reasoning.push("Primary inbox".to_string());
    }

    let importance_level = if score >= 50 {
        ImportanceLevel::High
    } else if score >= 25 {
        ImportanceLevel::Medium
    } else {
        ImportanceLevel::Low
    };

    EmailAnalysis {
        importance_score: score,
        importance_level,
        reasoning,
        urgency_indicators,
        action_required: score >= 50,
        estimated_response_time: if score >= 50 {
            ResponseUrgency::WithinDay
        } else {
            ResponseUrgency::WhenConvenient
        },
    }
}

/// Pull the bare address out of a `Display Name <addr>` sender string.
fn extract_address(sender: &str) -> &str {
    ADDRESS_IN_ANGLE_BRACKETS
        .captures(sender)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(sender)
}
