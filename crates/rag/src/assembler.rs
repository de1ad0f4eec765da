//! Context assembly: retrieval plus confidence scoring.

use crate::retriever::{Passage, Retriever};
use crate::state::RequestState;
use kbchat_core::{AppResult, ConfidencePolicy};

/// Number of passages requested per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Confidence assigned when any context was retrieved.
pub const HIGH_CONFIDENCE: f32 = 0.9;

/// Confidence assigned when nothing usable was retrieved.
pub const LOW_CONFIDENCE: f32 = 0.2;

/// Retrieve passages for the state's question and record context and confidence.
///
/// Retriever errors propagate unchanged; an empty result is not an error.
pub async fn assemble_context(
    retriever: &dyn Retriever,
    state: RequestState,
    top_k: usize,
    policy: ConfidencePolicy,
) -> AppResult<RequestState> {
    let passages = retriever.retrieve(state.question(), top_k).await?;
    let context = join_passages(&passages);
    let confidence = score_confidence(policy, &context, &passages);

    tracing::debug!(
        passages = passages.len(),
        context_chars = context.chars().count(),
        confidence,
        "Assembled context"
    );

    Ok(state.with_context(context).with_confidence(confidence))
}

/// Join passage texts with a single newline, in retrieval order.
///
/// Empty passages are skipped: `["a", "", "c"]` joins to `"a\nc"`, and a
/// result made only of empty passages yields an empty context (and low
/// confidence) rather than a string of bare newlines.
pub fn join_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derive a confidence value in `[0, 1]` for the assembled context.
pub fn score_confidence(policy: ConfidencePolicy, context: &str, passages: &[Passage]) -> f32 {
    if context.is_empty() {
        return LOW_CONFIDENCE;
    }

    match policy {
        ConfidencePolicy::Presence => HIGH_CONFIDENCE,
        ConfidencePolicy::Similarity => passages
            .iter()
            .filter(|p| !p.text.is_empty())
            .filter_map(|p| p.score)
            .filter(|s| !s.is_nan())
            .reduce(f32::max)
            .map(|best| best.clamp(0.0, 1.0))
            .unwrap_or(HIGH_CONFIDENCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubRetriever;

    #[test]
    fn test_join_keeps_order_and_text() {
        let passages = vec![
            Passage::from("Refunds are processed within 14 days."),
            Passage::from("Contact support@example.com."),
        ];
        assert_eq!(
            join_passages(&passages),
            "Refunds are processed within 14 days.\nContact support@example.com."
        );
    }

    #[test]
    fn test_join_does_not_trim_passages() {
        let passages = vec![Passage::from("  spaced  "), Passage::from("\ttabbed")];
        assert_eq!(join_passages(&passages), "  spaced  \n\ttabbed");
    }

    #[test]
    fn test_empty_passage_between_others_adds_no_blank_line() {
        let passages = vec![Passage::from("a"), Passage::from(""), Passage::from("c")];
        assert_eq!(join_passages(&passages), "a\nc");
    }

    #[test]
    fn test_all_empty_passages_give_empty_context() {
        let passages = vec![Passage::from(""), Passage::from("")];
        let context = join_passages(&passages);
        assert!(context.is_empty());
        assert_eq!(
            score_confidence(ConfidencePolicy::Presence, &context, &passages),
            LOW_CONFIDENCE
        );
    }

    #[test]
    fn test_presence_policy() {
        let passages = vec![Passage::from("x")];
        assert_eq!(
            score_confidence(ConfidencePolicy::Presence, "x", &passages),
            HIGH_CONFIDENCE
        );
        assert_eq!(
            score_confidence(ConfidencePolicy::Presence, "", &[]),
            LOW_CONFIDENCE
        );
    }

    #[test]
    fn test_similarity_policy_uses_best_score() {
        let passages = vec![
            Passage::from("a").with_score(0.31),
            Passage::from("b").with_score(0.74),
            Passage::from("c").with_score(0.12),
        ];
        let context = join_passages(&passages);
        assert_eq!(
            score_confidence(ConfidencePolicy::Similarity, &context, &passages),
            0.74
        );
    }

    #[test]
    fn test_similarity_policy_clamps_and_falls_back() {
        let over = vec![Passage::from("a").with_score(1.7)];
        assert_eq!(score_confidence(ConfidencePolicy::Similarity, "a", &over), 1.0);

        let unscored = vec![Passage::from("a")];
        assert_eq!(
            score_confidence(ConfidencePolicy::Similarity, "a", &unscored),
            HIGH_CONFIDENCE
        );

        let empty = vec![Passage::from("").with_score(0.99)];
        assert_eq!(
            score_confidence(ConfidencePolicy::Similarity, "", &empty),
            LOW_CONFIDENCE
        );
    }

    #[tokio::test]
    async fn test_assemble_context_requests_top_k() {
        let retriever = StubRetriever::with_texts(&["one", "two", "three"]);
        let state = assemble_context(
            &retriever,
            RequestState::new("refund policy"),
            DEFAULT_TOP_K,
            ConfidencePolicy::Presence,
        )
        .await
        .unwrap();

        assert_eq!(state.context(), "one\ntwo\nthree");
        assert_eq!(state.confidence(), HIGH_CONFIDENCE);
        assert_eq!(
            retriever.calls(),
            vec![("refund policy".to_string(), DEFAULT_TOP_K)]
        );
    }

    #[tokio::test]
    async fn test_assemble_context_with_no_documents() {
        let retriever = StubRetriever::with_texts(&[]);
        let state = assemble_context(
            &retriever,
            RequestState::new("anything"),
            DEFAULT_TOP_K,
            ConfidencePolicy::Presence,
        )
        .await
        .unwrap();

        assert_eq!(state.context(), "");
        assert_eq!(state.confidence(), LOW_CONFIDENCE);
    }
}
