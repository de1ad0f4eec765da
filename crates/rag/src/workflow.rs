//! The answer workflow: a fixed graph of stages run once per question.
//!
//! ```text
//! Input -> Intent -> Retrieve -> Validate -+-> Generate -+-> Format -> Done
//!                                          +-> Fallback -+
//! ```
//!
//! The only conditional edge leaves `Validate`; it is decided once per
//! request by [`decide_route`].

use crate::assembler::{assemble_context, DEFAULT_TOP_K};
use crate::gate::{decide_route, Route};
use crate::generator::Generator;
use crate::responder::{fallback_answer, format_answer};
use crate::retriever::Retriever;
use crate::state::RequestState;
use crate::synthesizer::synthesize_answer;
use kbchat_core::{AppResult, ConfidencePolicy, RagSettings};
use kbchat_prompt::{default_answer_prompt, PromptDefinition};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

/// A node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Intent,
    Retrieve,
    Validate,
    Generate,
    Fallback,
    Format,
    Done,
}

/// Outgoing edge of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    To(Stage),
    /// Decided by the confidence gate.
    Branch,
    End,
}

impl Stage {
    pub fn edge(self) -> Edge {
        match self {
            Self::Input => Edge::To(Self::Intent),
            Self::Intent => Edge::To(Self::Retrieve),
            Self::Retrieve => Edge::To(Self::Validate),
            Self::Validate => Edge::Branch,
            Self::Generate | Self::Fallback => Edge::To(Self::Format),
            Self::Format => Edge::To(Self::Done),
            Self::Done => Edge::End,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Intent => "intent",
            Self::Retrieve => "retrieve",
            Self::Validate => "validate",
            Self::Generate => "generate",
            Self::Fallback => "fallback",
            Self::Format => "format",
            Self::Done => "done",
        }
    }
}

impl From<Route> for Stage {
    fn from(route: Route) -> Self {
        match route {
            Route::Generate => Self::Generate,
            Route::Fallback => Self::Fallback,
        }
    }
}

/// Tunables for a workflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RagOptions {
    pub top_k: usize,
    pub confidence: ConfidencePolicy,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            confidence: ConfidencePolicy::default(),
        }
    }
}

impl From<&RagSettings> for RagOptions {
    fn from(settings: &RagSettings) -> Self {
        Self {
            top_k: settings.top_k,
            confidence: settings.confidence,
        }
    }
}

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RagOutcome {
    pub answer: String,
    pub route: Route,
    pub confidence: f32,
    pub context: String,
    /// Stages in the order they ran, ending with `Done`.
    pub trace: Vec<Stage>,
    /// Times the answer field was written; one branch stage plus the formatter.
    #[serde(skip)]
    pub answer_writes: u8,
}

/// Answer workflow bound to one retriever and one generator.
///
/// Cheap to clone and safe to share; every run owns its own state.
#[derive(Clone)]
pub struct RagWorkflow {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    prompt: PromptDefinition,
    options: RagOptions,
}

impl RagWorkflow {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            prompt: default_answer_prompt(),
            options: RagOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RagOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    /// Answer a question, returning only the formatted answer text.
    pub async fn run_rag(&self, question: &str) -> AppResult<String> {
        self.run(question).await.map(|outcome| outcome.answer)
    }

    /// Answer a question and report how the answer was reached.
    pub async fn run(&self, question: &str) -> AppResult<RagOutcome> {
        let span = tracing::info_span!("rag", question_chars = question.chars().count());

        async move {
            let mut state = RequestState::new(question);
            let mut trace = Vec::with_capacity(7);
            let mut route = Route::Fallback;
            let mut stage = Stage::Input;

            loop {
                debug_assert!(!trace.contains(&stage), "stage {:?} ran twice", stage);
                trace.push(stage);
                state = self.execute(stage, state).await?;

                stage = match stage.edge() {
                    Edge::To(next) => next,
                    Edge::Branch => {
                        route = decide_route(&state);
                        tracing::debug!(%route, confidence = state.confidence(), "Routed");
                        Stage::from(route)
                    }
                    Edge::End => break,
                };
            }

            tracing::info!(%route, confidence = state.confidence(), "Answered");
            debug_assert_eq!(state.answer_writes(), 2, "answer written outside branch and format");

            Ok(RagOutcome {
                route,
                confidence: state.confidence(),
                context: state.context().to_string(),
                answer_writes: state.answer_writes(),
                answer: state.into_answer(),
                trace,
            })
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, stage: Stage, state: RequestState) -> AppResult<RequestState> {
        match stage {
            Stage::Input | Stage::Intent | Stage::Validate | Stage::Done => Ok(state),
            Stage::Retrieve => {
                assemble_context(
                    self.retriever.as_ref(),
                    state,
                    self.options.top_k,
                    self.options.confidence,
                )
                .await
            }
            Stage::Generate => {
                synthesize_answer(self.generator.as_ref(), &self.prompt, state).await
            }
            Stage::Fallback => Ok(fallback_answer(state)),
            Stage::Format => Ok(format_answer(state)),
        }
    }
}

/// Answer one question with the default prompt and options.
pub async fn run_rag(
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    question: &str,
) -> AppResult<String> {
    RagWorkflow::new(retriever, generator).run_rag(question).await
}
