// EN: src/system/executor.rs

use crate::{
    CancellationToken,
    core::utility::{self, VoltError},
};
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;

/// Why an external command did not complete.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The argument vector was empty.
    #[error("No command specified to run.")]
    EmptyCommand,
    /// The program could not be started.
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    /// The program exited with a failure status.
    #[error("Command '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    /// The user declined the pause prompt.
    #[error("Command '{0}' was not confirmed.")]
    Declined(String),
    /// Ctrl+C was pressed while the command ran.
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

impl ExecutionError {
    /// Converts the failure into the error that ends the invocation.
    pub fn into_fatal(self) -> anyhow::Error {
        match self {
            Self::Cancelled => VoltError::Interrupted.into(),
            other => utility::abort([other.to_string()]),
        }
    }
}

/// How `run_cmd` treats a command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions<'a> {
    /// Print the command line instead of running it.
    pub dryrun: bool,
    /// Ask for confirmation before running.
    pub pause: bool,
    /// A non-zero exit status is not an error.
    pub ignore_errors: bool,
    /// Working directory for the child; inherited when `None`.
    pub cwd: Option<&'a Path>,
}

/// True once Ctrl+C has been pressed.
pub fn is_cancelled(cancellation_token: &CancellationToken) -> bool {
    cancellation_token.load(Ordering::SeqCst)
}

/// Renders an argument vector for display, quoting where a shell would need it.
pub fn display_command(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

fn prepare(program: &str, args: &[String], cwd: Option<&Path>) -> StdCommand {
    let mut command = StdCommand::new(program);
    command.args(args).stdout(Stdio::inherit()).stderr(Stdio::inherit());
    if let Some(dir) = cwd {
        command.current_dir(dunce::simplified(dir));
    }
    command
}

/// Starts the child. On Windows a program that cannot be found is retried through
/// `cmd /C` so shell built-ins such as `echo` work.
fn spawn(argv: &[String], cwd: Option<&Path>) -> std::io::Result<Child> {
    let Some((program, args)) = argv.split_first() else {
        return Err(std::io::Error::from(ErrorKind::InvalidInput));
    };
    match prepare(program, args, cwd).spawn() {
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("'{}' is not a program, handing it to cmd /C.", program);
            let mut wrapped = vec!["/C".to_string()];
            wrapped.extend_from_slice(argv);
            prepare("cmd", &wrapped, cwd).spawn()
        }
        spawned => spawned,
    }
}

/// Polls the child until it exits, killing it if the token is set meanwhile.
fn wait_for(child: &mut Child, cancellation_token: &CancellationToken) -> Result<ExitStatus, WaitError> {
    while !is_cancelled(cancellation_token) {
        if let Some(status) = child.try_wait().map_err(WaitError::Io)? {
            return Ok(status);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    log::debug!("Interrupted, stopping child process {}.", child.id());
    if let Err(e) = child.kill() {
        log::warn!("Could not stop child process {}: {}", child.id(), e);
    }
    let _ = child.wait();
    Err(WaitError::Cancelled)
}

enum WaitError {
    Io(std::io::Error),
    Cancelled,
}

/// Runs an external program to completion.
///
/// Blocks until the child exits. Setting `cancellation_token` stops the child and
/// yields [`ExecutionError::Cancelled`].
pub fn run_cmd(
    argv: &[String],
    options: &RunOptions<'_>,
    cancellation_token: &CancellationToken,
) -> Result<(), ExecutionError> {
    if argv.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    let command_line = display_command(argv);

    if options.dryrun {
        println!("{}", command_line);
        return Ok(());
    }
    log::info!("Run: {}", command_line);

    if options.pause {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Run \"{}\"?", command_line))
            .default(true)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            return Err(ExecutionError::Declined(command_line));
        }
    }

    let mut child = match spawn(argv, options.cwd) {
        Ok(child) => child,
        Err(e) => return Err(ExecutionError::CommandFailed(command_line, e)),
    };
    match wait_for(&mut child, cancellation_token) {
        Ok(status) if status.success() || options.ignore_errors => Ok(()),
        Ok(_) => Err(ExecutionError::NonZeroExitStatus(command_line)),
        Err(WaitError::Cancelled) => Err(ExecutionError::Cancelled),
        Err(WaitError::Io(e)) => Err(ExecutionError::CommandFailed(command_line, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command_is_an_error() {
        let result = run_cmd(&[], &RunOptions::default(), &token());
        assert!(matches!(result, Err(ExecutionError::EmptyCommand)));
    }

    #[test]
    fn test_dry_run_does_not_spawn() {
        let options = RunOptions {
            dryrun: true,
            ..Default::default()
        };
        let result = run_cmd(&argv(&["no-such-program-xyz", "arg"]), &options, &token());
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_program_fails() {
        let result = run_cmd(
            &argv(&["no-such-program-xyz-123"]),
            &RunOptions::default(),
            &token(),
        );
        assert!(matches!(result, Err(ExecutionError::CommandFailed(..))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_status() {
        let result = run_cmd(&argv(&["false"]), &RunOptions::default(), &token());
        assert!(matches!(result, Err(ExecutionError::NonZeroExitStatus(_))));

        let tolerant = RunOptions {
            ignore_errors: true,
            ..Default::default()
        };
        assert!(run_cmd(&argv(&["false"]), &tolerant, &token()).is_ok());
    }

    #[test]
    fn test_cancellation_becomes_interrupt() {
        let err = ExecutionError::Cancelled.into_fatal();
        assert!(matches!(err.downcast_ref::<VoltError>(), Some(VoltError::Interrupted)));
        let err = ExecutionError::EmptyCommand.into_fatal();
        assert!(matches!(err.downcast_ref::<VoltError>(), Some(VoltError::Abort { .. })));
    }

    #[test]
    fn test_display_command_quotes_spaces() {
        assert_eq!(display_command(&argv(&["echo", "a b"])), "echo 'a b'");
    }
}
