use crate::alerts::RateLimiter;
use crate::config::AlertConfig;
use crate::error::AlertError;
use log::{error, info, warn};
use std::process::Command;
use std::sync::Mutex;

/// Best-effort destination for alert text (an SMS gateway in production)
///
/// Delivery failures are logged by the implementation and never reach the
/// caller.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink {
    fn notify(&self, text: &str);
}

/// Sink that only writes alerts to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn notify(&self, text: &str) {
        warn!("send sms: {}", text);
    }
}

/// Sink that hands each alert to an external program
///
/// The alert text is appended as the last argument, so a gateway script can
/// be configured as e.g. `["/usr/local/bin/send-sms", "--to", "oncall"]`.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Build from a `[program, args...]` list; `None` if the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self, text: &str) -> Result<(), AlertError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AlertError::NotificationFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl AlertSink for CommandSink {
    fn notify(&self, text: &str) {
        match self.run(text) {
            Ok(()) => info!("Sent alert via {}: {}", self.program, text),
            Err(e) => error!("Failed to send alert '{}': {}", text, e),
        }
    }
}

/// Decorator that drops alerts beyond a per-minute cap
pub struct ThrottledSink<S> {
    inner: S,
    limiter: Mutex<RateLimiter>,
}

impl<S: AlertSink> ThrottledSink<S> {
    pub fn new(inner: S, max_per_minute: usize) -> Self {
        Self::with_limiter(inner, RateLimiter::per_minute(max_per_minute))
    }

    pub fn with_limiter(inner: S, limiter: RateLimiter) -> Self {
        Self {
            inner,
            limiter: Mutex::new(limiter),
        }
    }
}

impl<S: AlertSink> AlertSink for ThrottledSink<S> {
    fn notify(&self, text: &str) {
        let allowed = match self.limiter.lock() {
            Ok(mut limiter) => limiter.try_acquire(),
            Err(_) => true,
        };

        if allowed {
            self.inner.notify(text);
        } else {
            warn!("Alert rate limit reached, dropping: {}", text);
        }
    }
}

impl AlertSink for Box<dyn AlertSink> {
    fn notify(&self, text: &str) {
        (**self).notify(text);
    }
}

/// Build the sink chain described by the `[alerts]` configuration
///
/// Uses [`CommandSink`] when a command is configured and [`LogSink`]
/// otherwise, wrapped in a [`ThrottledSink`] when `max_per_minute` is set.
pub fn sink_from_config(config: &AlertConfig) -> Box<dyn AlertSink> {
    let base: Box<dyn AlertSink> = match config.command.as_deref().and_then(CommandSink::from_argv) {
        Some(command) => Box::new(command),
        None => Box::new(LogSink),
    };

    match config.max_per_minute {
        Some(max_per_minute) => Box::new(ThrottledSink::new(base, max_per_minute)),
        None => base,
    }
}
