use crate::domain::ports::Prompt;
use async_trait::async_trait;
use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

/// 終端機上的 y/N 詢問；非互動環境一律視為否
#[derive(Debug, Clone, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl Prompt for TerminalPrompt {
    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }

    async fn confirm(&self, question: &str) -> bool {
        if !self.is_interactive() {
            return false;
        }

        print!("{} [y/N] ", question);
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(e) => {
                tracing::warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
