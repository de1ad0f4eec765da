//! Retrieval-augmented answering for kbchat.
//!
//! A question flows through a fixed stage graph: the context assembler
//! retrieves passages and scores confidence, the gate picks either the
//! answer synthesizer or the fallback responder, and the formatter marks
//! the result. Retrieval and generation are injected as [`Retriever`] and
//! [`Generator`] handles, so the same workflow runs against a SQLite index
//! and a hosted model in production or against stubs in tests.
//!
//! # Example
//! ```no_run
//! use kbchat_rag::{Generator, RagWorkflow, Retriever};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     retriever: Arc<dyn Retriever>,
//! #     generator: Arc<dyn Generator>,
//! # ) -> kbchat_core::AppResult<()> {
//! let workflow = RagWorkflow::new(retriever, generator);
//! let answer = workflow.run_rag("What is the refund policy?").await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod gate;
pub mod generator;
pub mod responder;
pub mod retriever;
pub mod state;
pub mod synthesizer;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use assembler::{assemble_context, DEFAULT_TOP_K, HIGH_CONFIDENCE, LOW_CONFIDENCE};
pub use gate::{decide_route, Route, CONFIDENCE_THRESHOLD};
pub use generator::{Generator, LlmGenerator};
pub use responder::{ANSWER_MARKER, FALLBACK_MESSAGE};
pub use retriever::{Passage, Retriever};
pub use state::RequestState;
pub use workflow::{run_rag, RagOptions, RagOutcome, RagWorkflow, Stage};
