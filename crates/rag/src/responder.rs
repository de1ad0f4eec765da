//! Fallback responder and answer formatter.

use crate::state::RequestState;

/// Answer given when the knowledge base has nothing relevant.
pub const FALLBACK_MESSAGE: &str = "I couldn't find relevant information in the knowledge base.";

/// Marker placed in front of every final answer.
pub const ANSWER_MARKER: &str = "🤖 ";

/// Replace the answer with [`FALLBACK_MESSAGE`]. Context is left as is.
pub fn fallback_answer(state: RequestState) -> RequestState {
    state.with_answer(FALLBACK_MESSAGE)
}

/// Prefix the answer with [`ANSWER_MARKER`].
pub fn format_answer(state: RequestState) -> RequestState {
    let formatted = format!("{}{}", ANSWER_MARKER, state.answer());
    state.with_answer(formatted)
}
