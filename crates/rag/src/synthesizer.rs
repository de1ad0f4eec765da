//! Answer synthesis from retrieved context.

use crate::generator::Generator;
use crate::state::RequestState;
use kbchat_core::AppResult;
use kbchat_prompt::{build_prompt, BuiltPrompt, PromptDefinition};
use std::collections::HashMap;

/// Render the answer prompt for a state's context and question.
pub fn build_answer_prompt(
    definition: &PromptDefinition,
    state: &RequestState,
) -> AppResult<BuiltPrompt> {
    let mut variables = HashMap::new();
    variables.insert("context".to_string(), state.context().to_string());
    variables.insert("question".to_string(), state.question().to_string());
    build_prompt(definition, variables)
}

/// Invoke the generator once and store its reply, unmodified, as the answer.
pub async fn synthesize_answer(
    generator: &dyn Generator,
    definition: &PromptDefinition,
    state: RequestState,
) -> AppResult<RequestState> {
    let prompt = build_answer_prompt(definition, &state)?;
    let reply = generator
        .complete_with_system(prompt.system.as_deref(), &prompt.user)
        .await?;
    Ok(state.with_answer(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubGenerator;
    use kbchat_prompt::default_answer_prompt;

    #[tokio::test]
    async fn test_prompt_embeds_context_and_question_verbatim() {
        let generator = StubGenerator::replying("Refunds are processed within 14 days.");
        let state = RequestState::new("What is the refund policy?")
            .with_context("Refunds are processed within 14 days.\nContact support@example.com.")
            .with_confidence(0.9);

        let state = synthesize_answer(&generator, &default_answer_prompt(), state)
            .await
            .unwrap();

        assert_eq!(state.answer(), "Refunds are processed within 14 days.");
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "Context:\nRefunds are processed within 14 days.\nContact support@example.com.\n"
        ));
        assert!(prompts[0].contains("Question:\nWhat is the refund policy?"));
    }

    #[tokio::test]
    async fn test_reply_is_stored_unmodified() {
        let generator = StubGenerator::replying("  padded reply \n");
        let state = RequestState::new("q").with_context("c");
        let state = synthesize_answer(&generator, &default_answer_prompt(), state)
            .await
            .unwrap();
        assert_eq!(state.answer(), "  padded reply \n");
    }
}
