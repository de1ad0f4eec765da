//! Clean command handler.

use clap::Args;
use kbchat_core::{AppConfig, AppResult};
use std::io::{BufRead, Write};

/// Delete all content of the knowledge index
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        if !self.yes {
            print!(
                "Delete all content of index '{}'? [y/N] ",
                config.index_name
            );
            std::io::stdout().flush()?;

            let mut reply = String::new();
            std::io::stdin().lock().read_line(&mut reply)?;
            if !is_confirmed(&reply) {
                println!("Aborted");
                return Ok(());
            }
        }

        kbchat_knowledge::clean(&config.workspace, &config.index_name)?;
        println!("Index '{}' cleaned", config.index_name);

        Ok(())
    }
}

fn is_confirmed(reply: &str) -> bool {
    matches!(reply.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_replies() {
        assert!(is_confirmed("y\n"));
        assert!(is_confirmed(" YES "));
        assert!(!is_confirmed("\n"));
        assert!(!is_confirmed("nope"));
    }
}
