//! In-memory answers for one questionnaire session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, InputKind};

/// An answer to a single question. Serializes to a bare JSON string or array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// A single-choice label.
    Choice(String),
    /// Multi-choice labels, in the order they were picked.
    Choices(Vec<String>),
    /// Free text. Indistinguishable from `Choice` on the wire; the session
    /// normalizes it against the question kind.
    Text(String),
}

impl AnswerValue {
    /// The string payload of a `Choice` or `Text` answer.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Choice(s) | Self::Text(s) => Some(s),
            Self::Choices(_) => None,
        }
    }

    pub fn labels(&self) -> Option<&[String]> {
        match self {
            Self::Choices(labels) => Some(labels),
            Self::Choice(_) | Self::Text(_) => None,
        }
    }
}

/// Mapping from question id to answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: BTreeMap<String, AnswerValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.answers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Only the session writes answers, after validating them.
    pub(crate) fn set(&mut self, question_id: &str, value: AnswerValue) {
        self.answers.insert(question_id.to_string(), value);
    }

    /// Re-tag bare strings by question kind after reading untagged JSON:
    /// `Text` for free-text questions, `Choice` otherwise. Unknown ids and
    /// arrays are left alone.
    pub fn conform_to(&mut self, catalog: &Catalog) {
        for (id, value) in self.answers.iter_mut() {
            let Some(question) = catalog.find(id) else {
                continue;
            };
            if let AnswerValue::Choice(s) | AnswerValue::Text(s) = value {
                let s = std::mem::take(s);
                *value = match question.kind {
                    InputKind::FreeText { .. } => AnswerValue::Text(s),
                    _ => AnswerValue::Choice(s),
                };
            }
        }
    }

    /// JSON object form, as embedded in prompts and stored with searches.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

impl FromIterator<(String, AnswerValue)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (String, AnswerValue)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_plain_mapping() {
        let set: AnswerSet = serde_json::from_str(
            r#"{"age": "18-25", "hobbies": ["Reading", "Music"], "previous": ""}"#,
        )
        .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("age").unwrap().as_str(), Some("18-25"));
        assert_eq!(
            set.get("hobbies").unwrap().labels().unwrap(),
            ["Reading".to_string(), "Music".to_string()]
        );
        assert_eq!(set.get("previous").unwrap().as_str(), Some(""));
    }

    #[test]
    fn conform_restores_free_text() {
        let mut set: AnswerSet = serde_json::from_str(
            r#"{"age": "18-25", "previous": "a scarf", "hobbies": ["Music"], "extra": "x"}"#,
        )
        .unwrap();
        assert_eq!(set.get("previous"), Some(&AnswerValue::Choice("a scarf".into())));

        set.conform_to(&Catalog::gift_quiz());
        assert_eq!(set.get("previous"), Some(&AnswerValue::Text("a scarf".into())));
        assert_eq!(set.get("age"), Some(&AnswerValue::Choice("18-25".into())));
        assert_eq!(
            set.get("hobbies"),
            Some(&AnswerValue::Choices(vec!["Music".into()]))
        );
        assert_eq!(set.get("extra"), Some(&AnswerValue::Choice("x".into())));
    }

    #[test]
    fn serializes_without_tags() {
        let mut set = AnswerSet::new();
        set.set("budget", AnswerValue::Choice("Up to 20€".into()));
        set.set("previous", AnswerValue::Text("loved a scarf".into()));
        set.set("hobbies", AnswerValue::Choices(vec!["Cooking".into()]));
        assert_eq!(
            set.to_json(),
            serde_json::json!({
                "budget": "Up to 20€",
                "hobbies": ["Cooking"],
                "previous": "loved a scarf"
            })
        );
    }
}
