//! Text evaluators.
//!
//! An [`Evaluator`] is a pure function from text to a named value. The same
//! registry runs in the browser for display and on the server when
//! alternatives are stored, so evaluators must not depend on anything but
//! their input text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Evaluator selection that stands for word and character counts together.
pub const SELECT_BOTH: &str = "both";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationValue {
    Count(u64),
    Score(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: String,
    pub name: String,
    pub value: EvaluationValue,
}

#[derive(Clone, Copy)]
pub struct Evaluator {
    /// Selection key sent by clients, e.g. `"word-counter"`.
    pub key: &'static str,
    /// Result id, e.g. `"word_count"`.
    pub id: &'static str,
    pub name: &'static str,
    score: fn(&str) -> EvaluationValue,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Evaluator {
    pub const fn new(
        key: &'static str,
        id: &'static str,
        name: &'static str,
        score: fn(&str) -> EvaluationValue,
    ) -> Self {
        Self { key, id, name, score }
    }

    pub fn evaluate(&self, text: &str) -> EvaluationResult {
        EvaluationResult {
            id: self.id.to_owned(),
            name: self.name.to_owned(),
            value: (self.score)(text),
        }
    }
}

/// Number of whitespace-delimited, non-empty tokens.
pub fn word_count(text: &str) -> EvaluationValue {
    EvaluationValue::Count(text.split_whitespace().count() as u64)
}

/// Length of the text in UTF-16 code units, whitespace included. This is
/// the length a browser reports, which keeps client and server results equal.
pub fn character_count(text: &str) -> EvaluationValue {
    EvaluationValue::Count(text.encode_utf16().count() as u64)
}

pub const WORD_COUNTER: Evaluator = Evaluator::new("word-counter", "word_count", "Word Count", word_count);
pub const CHARACTER_COUNTER: Evaluator =
    Evaluator::new("char-counter", "char_count", "Character Count", character_count);

/// Ordered set of evaluators. Results always follow registry order.
#[derive(Debug, Clone)]
pub struct EvaluatorRegistry {
    evaluators: Vec<Evaluator>,
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EvaluatorRegistry {
    pub fn new(evaluators: Vec<Evaluator>) -> Self {
        Self { evaluators }
    }

    pub fn builtin() -> Self {
        Self::new(vec![WORD_COUNTER, CHARACTER_COUNTER])
    }

    pub fn push(&mut self, evaluator: Evaluator) {
        self.evaluators.push(evaluator);
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.evaluators.iter().map(|e| e.key)
    }

    /// Runs every evaluator over `text`.
    pub fn evaluate(&self, text: &str) -> Vec<EvaluationResult> {
        self.evaluators.iter().map(|e| e.evaluate(text)).collect()
    }

    /// Subset of this registry named by `keys`, kept in registry order.
    /// Unknown keys select nothing.
    pub fn select<S: AsRef<str>>(&self, keys: &[S]) -> EvaluatorRegistry {
        let wants = |key: &str| {
            keys.iter().any(|k| {
                let k = k.as_ref();
                k == key
                    || (k == SELECT_BOTH && (key == WORD_COUNTER.key || key == CHARACTER_COUNTER.key))
            })
        };
        Self::new(self.evaluators.iter().copied().filter(|e| wants(e.key)).collect())
    }
}

/// Runs the built-in evaluators over `text`.
pub fn evaluate_text(text: &str) -> Vec<EvaluationResult> {
    EvaluatorRegistry::builtin().evaluate(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn count(value: &EvaluationValue) -> u64 {
        match value {
            EvaluationValue::Count(n) => *n,
            other => panic!("expected a count, got {other:?}"),
        }
    }

    #[test]
    fn counts_words_and_characters() {
        let results = evaluate_text("  hello   brave\tnew\nworld ");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "word_count");
        assert_eq!(results[0].name, "Word Count");
        assert_eq!(count(&results[0].value), 4);
        assert_eq!(results[1].id, "char_count");
        assert_eq!(count(&results[1].value), 26);
    }

    #[test]
    fn empty_text_scores_zero() {
        let results = evaluate_text("");
        assert_eq!(count(&results[0].value), 0);
        assert_eq!(count(&results[1].value), 0);
        assert_eq!(count(&evaluate_text("   \n")[0].value), 0);
    }

    #[test]
    fn character_count_uses_utf16_length() {
        assert_eq!(count(&character_count("héllo")), 5);
        assert_eq!(count(&character_count("👍")), 2);
    }

    #[test]
    fn selection_keeps_registry_order() {
        let registry = EvaluatorRegistry::builtin();
        let selected = registry.select(&["char-counter", "word-counter"]);
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["word-counter", "char-counter"]);

        let both = registry.select(&[SELECT_BOTH]);
        assert_eq!(both.len(), 2);

        assert!(registry.select(&["sentiment"]).is_empty());
        assert!(registry.select::<&str>(&[]).is_empty());
    }

    #[test]
    fn adding_an_evaluator_leaves_existing_results_alone() {
        fn shout(text: &str) -> EvaluationValue {
            EvaluationValue::Text(text.to_uppercase())
        }
        let text = "keep me stable";
        let before = EvaluatorRegistry::builtin().evaluate(text);
        let mut extended = EvaluatorRegistry::builtin();
        extended.push(Evaluator::new("shout", "shout", "Shout", shout));
        let after = extended.evaluate(text);
        assert_eq!(&after[..2], &before[..]);
        assert_eq!(after[2].value, EvaluationValue::Text("KEEP ME STABLE".into()));
    }

    #[test]
    fn value_serializes_untagged() {
        let json = serde_json::to_value(WORD_COUNTER.evaluate("a b")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "word_count", "name": "Word Count", "value": 2 }));
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic(text in ".*") {
            let registry = EvaluatorRegistry::builtin();
            prop_assert_eq!(registry.evaluate(&text), registry.evaluate(&text));
        }

        #[test]
        fn word_count_matches_token_count(text in "[a-z \t\n]{0,64}") {
            let expected = text.split(|c: char| c.is_whitespace()).filter(|t| !t.is_empty()).count();
            prop_assert_eq!(count(&word_count(&text)), expected as u64);
        }

        #[test]
        fn ascii_character_count_is_length(text in "[ -~\t\n]{0,64}") {
            prop_assert_eq!(count(&character_count(&text)), text.len() as u64);
        }
    }
}
