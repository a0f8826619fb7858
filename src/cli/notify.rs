//! Notifiers for the terminal and for unattended runs.

use std::path::Path;

use async_trait::async_trait;
use console::{Term, style};

use crate::bootstrap::{Confirmation, Notifier, Visibility};

/// Prompts on stderr and reads answers from the terminal.
pub struct ConsoleNotifier {
    term: Term,
    login_url: String,
}

impl ConsoleNotifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            term: Term::stderr(),
            login_url: format!("{}/login", base_url.trim_end_matches('/')),
        }
    }

    /// Ask a question; `None` when input is closed or unreadable.
    async fn ask(&self, question: String) -> Option<String> {
        let term = self.term.clone();
        tokio::task::spawn_blocking(move || {
            term.write_str(&question)?;
            term.read_line()
        })
        .await
        .ok()?
        .ok()
    }

    fn print(&self, line: String) {
        // Nothing sensible to do when stderr is gone
        let _ = self.term.write_line(&line);
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        self.print(format!("{} {message}", style("info:").cyan().bold()));
    }

    fn warn(&self, message: &str) {
        self.print(format!("{} {message}", style("warning:").yellow().bold()));
    }

    fn error(&self, message: &str) {
        self.print(format!("{} {message}", style("error:").red().bold()));
    }

    async fn confirm_syncignore(&self, syncignore: &Path) -> Confirmation {
        self.print(format!(
            "Review {} before continuing.",
            style(syncignore.display()).green()
        ));
        match self.ask("Continue? [Y/n] ".to_string()).await {
            Some(answer) => parse_confirmation(&answer),
            None => Confirmation::Cancel,
        }
    }

    async fn choose_visibility(&self) -> Option<Visibility> {
        let answer = self
            .ask("Repository visibility [public/private]: ".to_string())
            .await?;
        parse_visibility(&answer)
    }

    fn offer_login(&self) {
        self.print(format!(
            "Log in at {} to get a new token.",
            style(&self.login_url).underlined()
        ));
    }
}

fn parse_confirmation(answer: &str) -> Confirmation {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Confirmation::Continue,
        _ => Confirmation::Cancel,
    }
}

/// An empty or unknown answer counts as dismissing the prompt.
fn parse_visibility(answer: &str) -> Option<Visibility> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "public" | "pub" => Some(Visibility::Public),
        "private" | "priv" => Some(Visibility::Private),
        _ => None,
    }
}

/// Sends notices to the log. Prompts resolve without asking anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn info(&self, message: &str) {
        tracing::info!("[notify] {message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("[notify] {message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("[notify] {message}");
    }

    async fn confirm_syncignore(&self, _syncignore: &Path) -> Confirmation {
        Confirmation::Continue
    }

    async fn choose_visibility(&self) -> Option<Visibility> {
        None
    }

    fn offer_login(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation() {
        assert_eq!(parse_confirmation("\n"), Confirmation::Continue);
        assert_eq!(parse_confirmation("Yes"), Confirmation::Continue);
        assert_eq!(parse_confirmation("n"), Confirmation::Cancel);
        assert_eq!(parse_confirmation("later"), Confirmation::Cancel);
    }

    #[test]
    fn test_parse_visibility() {
        assert_eq!(parse_visibility(" PUBLIC "), Some(Visibility::Public));
        assert_eq!(parse_visibility("priv"), Some(Visibility::Private));
        assert_eq!(parse_visibility(""), None);
        assert_eq!(parse_visibility("secret"), None);
    }

    #[tokio::test]
    async fn test_log_notifier_never_blocks() {
        let notifier = LogNotifier;
        assert_eq!(
            notifier.confirm_syncignore(Path::new(".syncignore")).await,
            Confirmation::Continue
        );
        assert_eq!(notifier.choose_visibility().await, None);
    }
}
