// src/verbs/builtin.rs

use crate::core::runner::VerbRunner;
use crate::models::{CliSpec, GoAction, OptionSpec, Verb, VerbBody};
use anyhow::Result;

/// Body shared by the synthesized verbs: run the verb's default action.
fn default_func(runner: &mut VerbRunner<'_>) -> Result<()> {
    runner.go(&[])
}

fn builtin_verb(name: &str, cli_spec: CliSpec, go_default: GoAction) -> Verb {
    Verb {
        name: name.to_string(),
        cli_spec,
        classpath: None,
        go_default: Some(go_default),
        body: VerbBody::Native(default_func),
        origin: format!("builtin:{}", name),
    }
}

/// The `help` verb.
pub fn help_verb() -> Verb {
    builtin_verb(
        "help",
        CliSpec {
            description: "Display general or verb-specific help.".to_string(),
            usage: "[VERB ...]".to_string(),
            options: vec![OptionSpec::boolean(
                "-a",
                "--all",
                "all",
                "display all available help, including verb usage",
            )],
            description2: None,
            base_verb: true,
        },
        GoAction::Help,
    )
}

/// The `package` verb.
pub fn package_verb() -> Verb {
    builtin_verb(
        "package",
        CliSpec {
            description: "Create a runnable program package.".to_string(),
            usage: "[OUTPUT_DIR] [VERBSPACE ...]".to_string(),
            options: vec![OptionSpec::boolean(
                "-f",
                "--force",
                "force",
                "overwrite existing file without asking",
            )],
            description2: Some(
                "OUTPUT_DIR defaults to the working directory. Each VERBSPACE names an\n\
                 internal command to package instead of the running one."
                    .to_string(),
            ),
            base_verb: true,
        },
        GoAction::Package,
    )
}

/// The verbs every verbspace gets unless a unit declares them itself.
pub fn standard_verbs() -> Vec<Verb> {
    vec![help_verb(), package_verb()]
}
