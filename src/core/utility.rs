//! # Messaging and Fatal Errors
//!
//! User-facing message helpers and the single "report and terminate" error that
//! every fatal condition in the crate funnels through. Messages are written by the
//! caller; `main` turns a [`VoltError`] into printed text and a non-zero exit status.

use colored::Colorize;
use std::io::Write;
use thiserror::Error;

/// Errors that end the current invocation.
#[derive(Error, Debug)]
pub enum VoltError {
    /// A user-facing fatal error. `messages` may be empty when the caller
    /// already reported the problem (see `VerbRunner::abort`).
    #[error("{}", .messages.join("\n"))]
    Abort { messages: Vec<String> },
    /// The user pressed Ctrl+C.
    #[error("break")]
    Interrupted,
}

/// Builds the fatal error carrying `messages`.
pub fn abort<I, S>(messages: I) -> anyhow::Error
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    VoltError::Abort {
        messages: messages.into_iter().map(Into::into).collect(),
    }
    .into()
}

/// Formats a list as indented lines, the way lists are shown inside messages.
pub fn indented<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| format!("    {}", item.as_ref()))
        .collect()
}

fn format_lines(tag: &colored::ColoredString, messages: &[String]) -> String {
    messages
        .iter()
        .map(|line| format!("{tag}: {line}\n"))
        .collect()
}

fn emit(to_stderr: bool, tag: colored::ColoredString, messages: &[String]) {
    let text = format_lines(&tag, messages);
    if to_stderr {
        let _ = std::io::stderr().write_all(text.as_bytes());
    } else {
        let _ = std::io::stdout().write_all(text.as_bytes());
    }
}

/// Prints an informational message to stdout.
pub fn info(message: impl Into<String>) {
    emit(false, "INFO".green(), &[message.into()]);
}

/// Like [`info`] but only shown with `--verbose` (or `--debug`).
pub fn verbose_info(message: impl Into<String>) {
    if log::log_enabled!(log::Level::Info) {
        info(message);
    }
}

/// Prints warnings to stderr.
pub fn warning(messages: &[String]) {
    emit(true, "WARNING".yellow().bold(), messages);
}

/// Prints non-fatal errors to stderr.
pub fn error(messages: &[String]) {
    emit(true, "ERROR".red().bold(), messages);
}

/// Writes non-fatal errors into `out`, for output that must stay in order with them.
pub fn error_to(out: &mut dyn Write, messages: &[String]) -> std::io::Result<()> {
    out.write_all(format_lines(&"ERROR".red().bold(), messages).as_bytes())
}

/// Prints the messages of a fatal error. Used once, by `main`.
pub fn report_fatal(messages: &[String]) {
    emit(true, "FATAL".red().bold(), messages);
}

/// Maps the global flags onto the log level so diagnostics honour them.
pub fn apply_verbosity(verbose: bool, debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else if verbose {
        log::LevelFilter::Info
    } else if std::env::var_os("RUST_LOG").is_some() {
        return;
    } else {
        log::LevelFilter::Warn
    };
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_carries_all_messages() {
        let err = abort(["first", "second"]);
        match err.downcast_ref::<VoltError>() {
            Some(VoltError::Abort { messages }) => {
                assert_eq!(messages, &vec!["first".to_string(), "second".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "first\nsecond");
    }

    #[test]
    fn test_error_to_tags_every_line() {
        let mut out = Vec::new();
        error_to(&mut out, &["one".to_string(), "two".to_string()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.contains("ERROR")));
        assert!(text.ends_with("two\n"));
    }

    #[test]
    fn test_indented_prefixes_each_item() {
        assert_eq!(indented(["a", "b"]), vec!["    a", "    b"]);
    }
}
