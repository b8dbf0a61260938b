// src/install.rs

use crate::config::Config;
use crate::error::ConfigError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// The platform's "this app may be installed" signal, held until used.
#[derive(Debug)]
pub struct InstallSignal;

/// Platform side of installation: the custom prompt and the native flow.
#[async_trait]
pub trait InstallHost: Send + Sync {
    /// Show the custom "Install InvoiceFlow" prompt and return the user's answer.
    async fn show_prompt(&self) -> InstallOutcome;

    async fn native_install(&self) -> Result<InstallOutcome, ConfigError>;
}

/// Deferred install prompt.
///
/// Capturing the signal suppresses the native prompt; the custom prompt is
/// shown only after `delay`, and only if the signal is still held.
pub struct InstallPrompt {
    deferred: Option<InstallSignal>,
    delay: Duration,
}

impl InstallPrompt {
    pub fn new(delay: Duration) -> Self {
        Self {
            deferred: None,
            delay,
        }
    }

    pub fn capture(&mut self, signal: InstallSignal) {
        info!(delay_ms = self.delay.as_millis() as u64, "Install signal captured, native prompt suppressed");
        self.deferred = Some(signal);
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Wait out the delay, then offer installation.
    ///
    /// `None` when no signal was captured. Dismissing keeps the signal for a
    /// later offer; accepting consumes it whatever the native flow answers.
    pub async fn offer<H: InstallHost + ?Sized>(
        &mut self,
        host: &H,
    ) -> Result<Option<InstallOutcome>, ConfigError> {
        if self.deferred.is_none() {
            return Ok(None);
        }

        tokio::time::sleep(self.delay).await;

        match host.show_prompt().await {
            InstallOutcome::Dismissed => {
                info!("Install prompt dismissed");
                Ok(Some(InstallOutcome::Dismissed))
            }
            InstallOutcome::Accepted => {
                self.deferred = None;
                let outcome = host.native_install().await?;
                info!(outcome = ?outcome, "Native install flow finished");
                Ok(Some(outcome))
            }
        }
    }
}

/// Terminal host: asks on stdin and records the install in the config file.
pub struct TerminalInstallHost {
    config_path: PathBuf,
}

impl TerminalInstallHost {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }
}

#[async_trait]
impl InstallHost for TerminalInstallHost {
    async fn show_prompt(&self) -> InstallOutcome {
        let mut stdout = tokio::io::stdout();
        let question = "Install InvoiceFlow\nAdd to home screen for quick access\nInstall? [y/N] (maybe later): ";
        if stdout.write_all(question.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return InstallOutcome::Dismissed;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await {
            Ok(Some(answer)) if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") => {
                InstallOutcome::Accepted
            }
            _ => InstallOutcome::Dismissed,
        }
    }

    async fn native_install(&self) -> Result<InstallOutcome, ConfigError> {
        Config::mark_installed(&self.config_path)?;
        info!(config = %self.config_path.display(), "Install recorded");
        Ok(InstallOutcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedHost {
        answer: InstallOutcome,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedHost {
        fn new(answer: InstallOutcome) -> Self {
            Self {
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InstallHost for ScriptedHost {
        async fn show_prompt(&self) -> InstallOutcome {
            self.calls.lock().unwrap().push("prompt");
            self.answer
        }

        async fn native_install(&self) -> Result<InstallOutcome, ConfigError> {
            self.calls.lock().unwrap().push("native");
            Ok(InstallOutcome::Accepted)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_no_prompt() {
        let host = ScriptedHost::new(InstallOutcome::Accepted);
        let mut prompt = InstallPrompt::new(Duration::from_secs(5));

        assert_eq!(prompt.offer(&host).await.unwrap(), None);
        assert!(host.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_waits_for_delay_then_installs() {
        let host = ScriptedHost::new(InstallOutcome::Accepted);
        let mut prompt = InstallPrompt::new(Duration::from_secs(5));
        prompt.capture(InstallSignal);

        let started = tokio::time::Instant::now();
        let outcome = prompt.offer(&host).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(outcome, Some(InstallOutcome::Accepted));
        assert_eq!(host.calls(), vec!["prompt", "native"]);
        assert!(!prompt.is_deferred());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_keeps_signal() {
        let host = ScriptedHost::new(InstallOutcome::Dismissed);
        let mut prompt = InstallPrompt::new(Duration::from_secs(5));
        prompt.capture(InstallSignal);

        let outcome = prompt.offer(&host).await.unwrap();

        assert_eq!(outcome, Some(InstallOutcome::Dismissed));
        assert_eq!(host.calls(), vec!["prompt"]);
        assert!(prompt.is_deferred());
    }

    #[tokio::test]
    async fn test_terminal_host_marks_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoiceflow.toml");
        let host = TerminalInstallHost::new(&path);

        assert_eq!(host.native_install().await.unwrap(), InstallOutcome::Accepted);
        assert!(Config::load(&path).unwrap().install.installed);
    }
}
