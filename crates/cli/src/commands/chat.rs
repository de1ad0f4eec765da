//! Chat command handler.
//!
//! Line-oriented question loop. Every line is answered on its own; the
//! transcript is only kept for `/history` in the current session.

use clap::Args;
use kbchat_core::AppResult;
use kbchat_rag::RagWorkflow;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /history shows this session, /help shows this message, /quit exits.";

/// Interactive question loop
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Print the route and confidence after each answer
    #[arg(long)]
    pub trace: bool,
}

/// One answered turn of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl ChatCommand {
    pub async fn execute(&self, workflow: &RagWorkflow) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        let transcript = self.run_loop(workflow, stdin, &mut stdout).await?;

        tracing::info!(turns = transcript.len(), "Chat session ended");
        Ok(())
    }

    async fn run_loop<R, W>(
        &self,
        workflow: &RagWorkflow,
        input: R,
        out: &mut W,
    ) -> AppResult<Vec<Turn>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut transcript: Vec<Turn> = Vec::new();
        let mut lines = input.lines();

        writeln!(out, "Ask a question about the knowledge base. {}", HELP)?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();

            match question {
                "" => continue,
                "/quit" | "/exit" => break,
                "/help" => writeln!(out, "{}", HELP)?,
                "/history" => {
                    for (i, turn) in transcript.iter().enumerate() {
                        writeln!(out, "[{}] {}\n{}", i + 1, turn.question, turn.answer)?;
                    }
                }
                _ => match workflow.run(question).await {
                    Ok(outcome) => {
                        writeln!(out, "{}", outcome.answer)?;
                        if self.trace {
                            writeln!(
                                out,
                                "  [{} | confidence {:.2}]",
                                outcome.route, outcome.confidence
                            )?;
                        }
                        transcript.push(Turn {
                            question: question.to_string(),
                            answer: outcome.answer,
                        });
                    }
                    Err(e) => {
                        tracing::error!("Question failed: {}", e);
                        writeln!(out, "Error: {}", e)?;
                    }
                },
            }
        }

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{workflow, workflow_failing_on};
    use kbchat_rag::{ANSWER_MARKER, FALLBACK_MESSAGE};

    async fn session(input: &str, passages: Vec<&'static str>) -> (Vec<Turn>, String) {
        let mut out = Vec::new();
        let transcript = ChatCommand { trace: false }
            .run_loop(&workflow(passages), input.as_bytes(), &mut out)
            .await
            .unwrap();
        (transcript, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_each_line_is_answered() {
        let (transcript, output) =
            session("What is the refund window?\nWho approves refunds?\n", vec!["Thirty days."])
                .await;

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].question, "Who approves refunds?");
        assert!(transcript.iter().all(|t| t.answer.starts_with(ANSWER_MARKER)));
        assert_eq!(output.matches(ANSWER_MARKER).count(), 2);
    }

    #[tokio::test]
    async fn test_quit_stops_before_remaining_lines() {
        let (transcript, _) = session("first?\n/quit\nsecond?\n", Vec::new()).await;

        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].answer.ends_with(FALLBACK_MESSAGE));
    }

    #[tokio::test]
    async fn test_blank_lines_and_history_are_not_questions() {
        let (transcript, output) = session("\n   \nq1\n/history\n", vec!["ctx"]).await;

        assert_eq!(transcript.len(), 1);
        assert!(output.contains("[1] q1"));
    }

    #[tokio::test]
    async fn test_failed_question_does_not_end_session() {
        let mut out = Vec::new();
        let transcript = ChatCommand { trace: false }
            .run_loop(
                &workflow_failing_on(vec!["Refunds take 14 days."], "broken?"),
                "broken?\nHow long do refunds take?\n".as_bytes(),
                &mut out,
            )
            .await
            .unwrap();
        let output = String::from_utf8(out).unwrap();

        assert!(output.contains("Error: "));
        assert!(output.contains("index unreachable"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].question, "How long do refunds take?");
        assert!(transcript[0].answer.starts_with(ANSWER_MARKER));
    }
}
