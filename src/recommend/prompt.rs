//! Generation prompt — built purely from the catalog and the answers.

use crate::quiz::{AnswerSet, AnswerValue, Catalog};

/// Build the generation prompt.
///
/// The same catalog and answers always give the same text: answers are
/// walked in catalog order and the JSON block has sorted keys.
pub fn build_prompt(catalog: &Catalog, answers: &AnswerSet, min: usize, max: usize) -> String {
    let mut summary = String::new();
    for question in catalog.iter() {
        let answer = match answers.get(question.id) {
            Some(AnswerValue::Choice(s)) | Some(AnswerValue::Text(s)) if !s.trim().is_empty() => {
                s.trim().to_string()
            }
            Some(AnswerValue::Choices(labels)) if !labels.is_empty() => labels.join(", "),
            _ => "(no answer)".to_string(),
        };
        summary.push_str(&format!("- {}: {}\n", question.prompt, answer));
    }

    let answers_json = serde_json::to_string_pretty(&answers.to_json())
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are a thoughtful gift advisor. Based on the questionnaire below, suggest \
         between {min} and {max} personalised gift ideas for the recipient.\n\n\
         Questionnaire answers:\n\
         {summary}\n\
         Raw answers (JSON):\n\
         {answers_json}\n\n\
         For each suggestion include:\n\
         - the gift itself\n\
         - a one-sentence rationale tied to the answers\n\
         - its classification: emotional, practical or fun\n\
         - its budget tier: low, medium or high\n\n\
         Respond with a JSON array of {min} to {max} strings, one suggestion per string, \
         for example:\n\
         [\"Leather-bound travel journal: suits someone who loves travel (emotional, medium)\"]\n\n\
         ONLY output the JSON array. No other text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_answers() -> AnswerSet {
        [
            ("age".to_string(), AnswerValue::Choice("26-35".into())),
            (
                "hobbies".to_string(),
                AnswerValue::Choices(vec!["Music".into(), "Cooking".into()]),
            ),
            ("previous".to_string(), AnswerValue::Text("  ".into())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn prompt_is_deterministic() {
        let catalog = Catalog::gift_quiz();
        let a = build_prompt(&catalog, &sample_answers(), 5, 10);
        let b = build_prompt(&catalog, &sample_answers(), 5, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_embeds_answers_and_instructions() {
        let catalog = Catalog::gift_quiz();
        let prompt = build_prompt(&catalog, &sample_answers(), 5, 10);

        assert!(prompt.contains("between 5 and 10"));
        assert!(prompt.contains("Music, Cooking"));
        assert!(prompt.contains("\"age\": \"26-35\""));
        assert!(prompt.contains("emotional, practical or fun"));
        assert!(prompt.contains("low, medium or high"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn blank_and_missing_answers_marked() {
        let catalog = Catalog::gift_quiz();
        let prompt = build_prompt(&catalog, &sample_answers(), 5, 10);
        // Every catalog question appears, answered or not.
        for question in catalog.iter() {
            assert!(prompt.contains(question.prompt), "{} missing", question.id);
        }
        assert!(prompt.contains("(no answer)"));
    }
}
