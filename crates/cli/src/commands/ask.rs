//! Ask command handler.
//!
//! Answers one question from the knowledge index.

use clap::Args;
use kbchat_core::{AppConfig, AppError, AppResult};
use kbchat_rag::{RagOutcome, RagWorkflow, Stage};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the workflow stages and confidence to stderr
    #[arg(long)]
    pub trace: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig, workflow: &RagWorkflow) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let outcome = workflow.run(&self.question).await?;

        if self.json {
            println!("{}", to_json(&outcome, config)?);
        } else {
            if self.trace {
                eprintln!(
                    "route: {} (confidence {:.2})\nstages: {}",
                    outcome.route,
                    outcome.confidence,
                    format_trace(&outcome.trace)
                );
            }
            println!("{}", outcome.answer);
        }

        Ok(())
    }
}

fn format_trace(trace: &[Stage]) -> String {
    trace
        .iter()
        .map(Stage::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn to_json(outcome: &RagOutcome, config: &AppConfig) -> AppResult<String> {
    let value = serde_json::json!({
        "index": config.index_name,
        "provider": config.provider,
        "model": config.model,
        "answer": outcome.answer,
        "route": outcome.route,
        "confidence": outcome.confidence,
        "trace": outcome.trace,
    });

    serde_json::to_string_pretty(&value)
        .map_err(|e| AppError::Config(format!("Failed to serialize answer: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::workflow;
    use kbchat_rag::{ANSWER_MARKER, FALLBACK_MESSAGE};

    #[tokio::test]
    async fn test_json_reports_route_and_trace() {
        let outcome = workflow(vec!["Refunds take five days."])
            .run("How long do refunds take?")
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&to_json(&outcome, &AppConfig::default()).unwrap()).unwrap();

        assert_eq!(json["route"], "generate");
        assert!(json["answer"].as_str().unwrap().starts_with(ANSWER_MARKER));
        assert_eq!(json["trace"].as_array().unwrap().len(), 7);
        assert_eq!(json["provider"], "groq");
    }

    #[tokio::test]
    async fn test_trace_for_fallback() {
        let outcome = workflow(Vec::new()).run("Anything?").await.unwrap();

        assert_eq!(outcome.answer, format!("{}{}", ANSWER_MARKER, FALLBACK_MESSAGE));
        assert_eq!(
            format_trace(&outcome.trace),
            "input -> intent -> retrieve -> validate -> fallback -> format -> done"
        );
    }
}
