//! Per-request state carried between workflow stages.

use serde::Serialize;

/// State of one question as it moves through the workflow.
///
/// Every stage consumes the state it is given and returns a new value;
/// nothing is shared between requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestState {
    question: String,
    context: String,
    confidence: f32,
    answer: String,
    #[serde(skip)]
    answer_writes: u8,
}

impl RequestState {
    /// Fresh state for a question. Context and answer start empty, confidence at zero.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: String::new(),
            confidence: 0.0,
            answer: String::new(),
            answer_writes: 0,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// How many stages have written the answer so far.
    pub fn answer_writes(&self) -> u8 {
        self.answer_writes
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..self
        }
    }

    pub fn with_confidence(self, confidence: f32) -> Self {
        Self { confidence, ..self }
    }

    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            answer_writes: self.answer_writes.saturating_add(1),
            ..self
        }
    }

    pub fn into_answer(self) -> String {
        self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = RequestState::new("What is the refund policy?");
        assert_eq!(state.question(), "What is the refund policy?");
        assert!(state.context().is_empty());
        assert!(state.answer().is_empty());
        assert_eq!(state.answer_writes(), 0);
    }

    #[test]
    fn test_updates_leave_question_untouched() {
        let state = RequestState::new("q")
            .with_context("ctx")
            .with_confidence(0.9)
            .with_answer("a")
            .with_answer("🤖 a");

        assert_eq!(state.question(), "q");
        assert_eq!(state.context(), "ctx");
        assert_eq!(state.confidence(), 0.9);
        assert_eq!(state.answer(), "🤖 a");
        assert_eq!(state.answer_writes(), 2);
    }

    #[test]
    fn test_serializes_without_write_counter() {
        let state = RequestState::new("q").with_answer("a");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["answer"], "a");
        assert!(json.get("answer_writes").is_none());
    }
}
