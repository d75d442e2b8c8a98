//! The fixed gift questionnaire.

use std::sync::{Arc, OnceLock};

use serde::Serialize;

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputKind {
    /// Exactly one option.
    SingleChoice,
    /// One to `max_selections` options.
    MultiChoice { max_selections: usize },
    /// Free text. When `required` is false an empty answer still completes the step.
    FreeText { required: bool },
}

impl InputKind {
    /// Short name used in validation messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single-choice",
            Self::MultiChoice { .. } => "multi-choice",
            Self::FreeText { .. } => "free-text",
        }
    }
}

/// One question of the questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSpec {
    pub id: &'static str,
    pub prompt: &'static str,
    pub kind: InputKind,
    /// Allowed labels, in display order. Empty for free text.
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl QuestionSpec {
    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| *o == label)
    }
}

/// Ordered, immutable list of questions. Order defines traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    questions: Vec<QuestionSpec>,
}

impl Catalog {
    /// Build a catalog from explicit questions. Ids must be unique, the list
    /// non-empty, and every step must be completable: choice questions need
    /// options and a multi-choice bound of at least one.
    pub fn new(questions: Vec<QuestionSpec>) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        let unique = questions
            .iter()
            .enumerate()
            .all(|(i, q)| questions[..i].iter().all(|p| p.id != q.id));
        let completable = questions.iter().all(|q| match q.kind {
            InputKind::SingleChoice => !q.options.is_empty(),
            InputKind::MultiChoice { max_selections } => {
                max_selections >= 1 && !q.options.is_empty()
            }
            InputKind::FreeText { .. } => true,
        });
        (unique && completable).then_some(Self { questions })
    }

    /// The gift questionnaire, built once per process.
    pub fn gift_quiz() -> Arc<Catalog> {
        static CATALOG: OnceLock<Arc<Catalog>> = OnceLock::new();
        Arc::clone(CATALOG.get_or_init(|| {
            Arc::new(Catalog {
                questions: gift_questions(),
            })
        }))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QuestionSpec> {
        self.questions.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.questions.iter()
    }
}

fn gift_questions() -> Vec<QuestionSpec> {
    vec![
        QuestionSpec {
            id: "age",
            prompt: "Roughly how old is the person?",
            kind: InputKind::SingleChoice,
            options: &["Under 18", "18-25", "26-35", "36-50", "Over 50"],
            placeholder: None,
        },
        QuestionSpec {
            id: "relation",
            prompt: "What is your relationship with this person?",
            kind: InputKind::SingleChoice,
            options: &[
                "Partner or spouse",
                "Close friend",
                "Son or daughter",
                "Coworker",
                "Other family member",
                "Other",
            ],
            placeholder: None,
        },
        QuestionSpec {
            id: "style",
            prompt: "What is this person's main style?",
            kind: InputKind::SingleChoice,
            options: &[
                "Homebody",
                "Adventurous (travel, sports)",
                "Fashion and beauty",
                "Geek and tech",
                "Artistic (music, art)",
                "Other",
            ],
            placeholder: None,
        },
        QuestionSpec {
            id: "hobbies",
            prompt: "What are their main hobbies or interests? (pick up to 3)",
            kind: InputKind::MultiChoice { max_selections: 3 },
            options: &[
                "Reading",
                "Sports",
                "Music",
                "Art and drawing",
                "Tech and games",
                "Cooking",
                "Travel",
                "Movies and series",
                "Photography",
                "Gardening",
                "Dancing",
                "Other",
            ],
            placeholder: None,
        },
        QuestionSpec {
            id: "preference",
            prompt: "Do they prefer experiences or objects?",
            kind: InputKind::SingleChoice,
            options: &[
                "Experiences (trips, dinners, courses)",
                "Objects (clothes, gadgets, decor)",
                "Both equally",
            ],
            placeholder: None,
        },
        QuestionSpec {
            id: "budget",
            prompt: "What budget do you have in mind?",
            kind: InputKind::SingleChoice,
            options: &["Up to 20€", "20€ - 50€", "50€ - 100€", "Over 100€"],
            placeholder: None,
        },
        QuestionSpec {
            id: "type",
            prompt: "What kind of gift do they like most?",
            kind: InputKind::SingleChoice,
            options: &["Emotional or a surprise", "Practical and useful", "Fun and funny"],
            placeholder: None,
        },
        QuestionSpec {
            id: "restrictions",
            prompt: "Any restrictions or special preferences?",
            kind: InputKind::MultiChoice { max_selections: 3 },
            options: &[
                "Vegan",
                "Does not drink alcohol",
                "Dislikes perfume",
                "Allergic to animals",
                "Religious",
                "Other",
            ],
            placeholder: None,
        },
        QuestionSpec {
            id: "previous",
            prompt: "Have they ever mentioned a gift they loved or hated?",
            kind: InputKind::FreeText { required: false },
            options: &[],
            placeholder: Some("Tell us about previous gifts..."),
        },
        QuestionSpec {
            id: "gender",
            prompt: "What is the person's gender?",
            kind: InputKind::SingleChoice,
            options: &["Male", "Female", "Prefer not to say"],
            placeholder: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gift_quiz_has_ten_questions_in_order() {
        let catalog = Catalog::gift_quiz();
        let ids: Vec<&str> = catalog.iter().map(|q| q.id).collect();
        assert_eq!(
            ids,
            [
                "age",
                "relation",
                "style",
                "hobbies",
                "preference",
                "budget",
                "type",
                "restrictions",
                "previous",
                "gender"
            ]
        );
    }

    #[test]
    fn choice_questions_have_options() {
        for q in Catalog::gift_quiz().iter() {
            match q.kind {
                InputKind::SingleChoice | InputKind::MultiChoice { .. } => {
                    assert!(!q.options.is_empty(), "{} has no options", q.id)
                }
                InputKind::FreeText { .. } => assert!(q.options.is_empty()),
            }
        }
    }

    #[test]
    fn multi_choice_bounds_are_three() {
        let catalog = Catalog::gift_quiz();
        for id in ["hobbies", "restrictions"] {
            assert_eq!(
                catalog.find(id).unwrap().kind,
                InputKind::MultiChoice { max_selections: 3 }
            );
        }
    }

    #[test]
    fn new_rejects_duplicates_and_empty() {
        assert!(Catalog::new(vec![]).is_none());
        let q = Catalog::gift_quiz().get(0).unwrap().clone();
        assert!(Catalog::new(vec![q.clone(), q]).is_none());
    }

    #[test]
    fn new_rejects_uncompletable_steps() {
        let zero_bound = QuestionSpec {
            id: "colors",
            prompt: "Favourite colours?",
            kind: InputKind::MultiChoice { max_selections: 0 },
            options: &["Red", "Blue"],
            placeholder: None,
        };
        assert!(Catalog::new(vec![zero_bound]).is_none());

        let no_options = QuestionSpec {
            id: "size",
            prompt: "Size?",
            kind: InputKind::SingleChoice,
            options: &[],
            placeholder: None,
        };
        assert!(Catalog::new(vec![no_options]).is_none());

        let one_bound = QuestionSpec {
            id: "colors",
            prompt: "Favourite colour?",
            kind: InputKind::MultiChoice { max_selections: 1 },
            options: &["Red", "Blue"],
            placeholder: None,
        };
        assert!(Catalog::new(vec![one_bound]).is_some());
    }

    #[test]
    fn serializes_kind_with_type_tag() {
        let json = serde_json::to_value(&*Catalog::gift_quiz()).unwrap();
        assert_eq!(json[3]["kind"]["type"], "multi_choice");
        assert_eq!(json[3]["kind"]["max_selections"], 3);
        assert_eq!(json[8]["kind"]["required"], false);
        assert!(json[0].get("placeholder").is_none());
    }
}
