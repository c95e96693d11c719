//! Renders vector-search hits as plain-text program descriptions.
//!
//! Missing values never fail: they print `Unknown` / `Not specified`, and a
//! value counts as missing when it is absent, `null`, `""`, `0` or `false`.

use crate::types::SearchMatch;
use serde_json::{Map, Value};

const UNKNOWN: &str = "Unknown";
const NOT_SPECIFIED: &str = "Not specified";
const NOT_AVAILABLE: &str = "Not available";

/// Format every hit, preserving order.
pub fn format_contexts(matches: &[SearchMatch]) -> Vec<String> {
    matches.iter().map(format_match).collect()
}

/// Format one hit.
pub fn format_match(hit: &SearchMatch) -> String {
    let meta = &hit.metadata;
    let field = |key: &str| metadata_text(meta, key).unwrap_or_else(|| NOT_SPECIFIED.to_string());

    let mut out = String::from("Program Details:\n");
    out.push_str(&format!(
        "- Name: {}\n",
        metadata_text(meta, "Program").unwrap_or_else(|| UNKNOWN.to_string())
    ));
    out.push_str(&format!(
        "- University: {}\n",
        metadata_text(meta, "University").unwrap_or_else(|| UNKNOWN.to_string())
    ));
    out.push_str(&format!("- Location: {}\n", field("Location")));
    out.push_str(&format!("- Specialization: {}\n", field("Specialization")));
    out.push_str(&format!("- Curriculum: {}\n", field("Curriculum")));
    out.push_str(&format!(
        "- Special Features: {}\n",
        field("SpecialLocationFeatures")
    ));
    out.push_str(&format!("- Co-op/Internship: {}\n", field("CoOpInternship")));
    out.push_str(&format!("- Key Job Roles: {}\n", field("KeyJobRoles")));
    out.push_str("- Eligibility:\n");
    out.push_str(&format!("  * GPA: {}\n", field("EligibilityMinimumGPA")));
    out.push_str(&format!(
        "  * Work Experience: {}\n",
        field("EligibilityWorkExperience")
    ));
    out.push_str(&format!("  * Background: {}\n", field("EligibilityUGBackground")));
    out.push_str(&format!("  * Backlogs: {}\n", field("EligibilityBacklogs")));
    out.push_str("- Application Requirements:\n");
    out.push_str(&format!("  * LOR: {}\n", field("LOR")));
    out.push_str(&format!("  * SOP: {}\n", field("SOP")));
    out.push_str(&format!("  * Application Fee: {}\n", field("ApplicationFee")));
    out.push_str(&format!("  * Deposit: {}\n", field("Deposit")));
    out.push_str(&format!("Relevance Score: {}", format_score(hit.score)));

    out
}

/// Display text of a metadata value, or `None` when it should fall back.
pub fn metadata_text(meta: &Map<String, Value>, key: &str) -> Option<String> {
    meta.get(key).and_then(value_text)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let f = n.as_f64()?;
            if f == 0.0 || f.is_nan() {
                None
            } else if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                Some(f.to_string())
            }
        }
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| value_text(v).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Score rounded half away from zero to two decimals, printed in shortest form.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s != 0.0 && !s.is_nan() => {
            let rounded = (s * 100.0).round() / 100.0;
            format!("{}", rounded)
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}
