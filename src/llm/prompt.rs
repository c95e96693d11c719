//! Counselor prompt assembly.

use crate::students::StudentProfile;

/// User-turn prompt: optional student profile, numbered program contexts, then the question.
pub fn build_counselor_prompt(
    question: &str,
    contexts: &[String],
    profile: Option<&StudentProfile>,
) -> String {
    let mut prompt = String::new();

    if let Some(block) = profile.filter(|p| p.filled_application).map(profile_block) {
        prompt.push_str(&block);
        prompt.push('\n');
    }

    if contexts.is_empty() {
        prompt.push_str("No program details were retrieved for this question.\n\n");
    } else {
        prompt.push_str("Relevant programs:\n\n");
        for (i, context) in contexts.iter().enumerate() {
            prompt.push_str(&format!("[{}]\n{}\n\n", i + 1, context.trim()));
        }
    }

    prompt.push_str("Question: ");
    prompt.push_str(question.trim());
    prompt
}

fn profile_block(profile: &StudentProfile) -> String {
    let mut lines = vec!["Student profile:".to_string()];
    let mut push = |label: &str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            lines.push(format!("- {}: {}", label, v));
        }
    };

    push("Nationality", profile.nationality.clone());
    push("Age", profile.age.map(|a| a.to_string()));
    push("Previous degree", profile.previous_degree.clone());
    push("Grades", profile.grades.clone());
    push("Current education level", profile.current_education_level.clone());
    push(
        "Preferred countries",
        Some(profile.preferred_countries.join(", ")),
    );
    push("Preferred programs", profile.preferred_programs.clone());
    push("Career aspirations", profile.career_aspirations.clone());
    push("Visa questions", profile.visa_questions.clone());

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(filled: bool) -> StudentProfile {
        StudentProfile {
            id: "u1".to_string(),
            email: "s@example.com".to_string(),
            name: Some("Sam".to_string()),
            phone: Some("5551234567".to_string()),
            age: Some(24),
            nationality: Some("Kenyan".to_string()),
            previous_degree: Some("BSc Physics".to_string()),
            grades: Some("First class".to_string()),
            current_education_level: Some("Graduate".to_string()),
            preferred_countries: vec!["Canada".to_string(), "Germany".to_string()],
            preferred_programs: Some("Data Science".to_string()),
            career_aspirations: None,
            visa_questions: Some(String::new()),
            filled_application: filled,
        }
    }

    #[test]
    fn test_contexts_are_numbered_in_order() {
        let prompt = build_counselor_prompt(
            " Which programs fit me? ",
            &["Program A".to_string(), "Program B".to_string()],
            None,
        );

        let a = prompt.find("[1]\nProgram A").unwrap();
        let b = prompt.find("[2]\nProgram B").unwrap();
        assert!(a < b);
        assert!(prompt.ends_with("Question: Which programs fit me?"));
        assert!(!prompt.contains("Student profile"));
    }

    #[test]
    fn test_filled_profile_is_included() {
        let p = profile(true);
        let prompt = build_counselor_prompt("q", &[], Some(&p));

        assert!(prompt.starts_with("Student profile:\n"));
        assert!(prompt.contains("- Preferred countries: Canada, Germany"));
        assert!(prompt.contains("- Age: 24"));
        assert!(!prompt.contains("Career aspirations"));
        assert!(!prompt.contains("Visa questions"));
        assert!(!prompt.contains("Sam"), "name is not sent to the model");
        assert!(prompt.contains("No program details were retrieved"));
    }

    #[test]
    fn test_unfilled_profile_is_skipped() {
        let p = profile(false);
        let prompt = build_counselor_prompt("q", &["ctx".to_string()], Some(&p));
        assert!(!prompt.contains("Student profile"));
    }
}
