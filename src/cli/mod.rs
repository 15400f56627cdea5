//! # Command Line Layer
//!
//! - **`preprocess`**: the early scan for global flags, run before any verbspace exists.
//! - **`processor`**: the two-phase parser resolving `VERB` and its options against a verbspace.
//! - **`dispatcher`**: the top-level flow tying configuration, verbspaces and the runner together.

use crate::models::{BaseFlags, CliSpec, OptionSpec, VerbOptions};

/// Top-level program flow.
pub mod dispatcher;
/// Early scan for the global flags.
pub mod preprocess;
/// Verb and option parsing.
pub mod processor;

/// Placeholder replaced by the command name in usage and description text.
pub const PROG_PLACEHOLDER: &str = "%prog";

/// The options and usage shared by every command.
pub fn base_cli_spec() -> CliSpec {
    CliSpec {
        description: "Specific actions are provided by verbs.  Run \"%prog help VERB\" to display full\n\
                      usage for a verb, including its options and arguments."
            .to_string(),
        usage: "%prog [OPTIONS] VERB [ARGUMENTS ...]".to_string(),
        options: vec![
            OptionSpec::boolean("-d", "--debug", "debug", "display debug messages"),
            OptionSpec::boolean(
                "-n",
                "--dry-run",
                "dryrun",
                "display actions without executing them",
            ),
            OptionSpec::boolean("-p", "--pause", "pause", "pause before significant actions"),
            OptionSpec::boolean(
                "-v",
                "--verbose",
                "verbose",
                "display verbose messages, including external command lines",
            ),
        ],
        description2: None,
        base_verb: false,
    }
}

impl BaseFlags {
    /// Reads the global flags out of parsed base option values.
    pub fn from_options(opts: &VerbOptions) -> Self {
        Self {
            debug: opts.get_bool("debug"),
            dryrun: opts.get_bool("dryrun"),
            pause: opts.get_bool("pause"),
            verbose: opts.get_bool("verbose"),
        }
    }
}

/// Substitutes the command name for `%prog`.
pub fn with_prog(text: &str, prog: &str) -> String {
    text.replace(PROG_PLACEHOLDER, prog)
}
