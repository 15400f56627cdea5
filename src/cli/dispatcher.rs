use anyhow::Result;
use std::path::PathBuf;

use crate::{
    CancellationToken,
    cli::{base_cli_spec, preprocess::CommandPreprocessor, processor::CommandProcessor},
    constants::{
        COMMAND_DESCRIPTIONS, INTERNAL_COMMANDS, LOCAL_CONFIG_FILENAME, PERMANENT_CONFIG_FILENAME,
    },
    core::{
        bundle::Bundle,
        config::VoltConfig,
        environment::Environment,
        runner::{RunnerExtras, VerbRunner},
        utility,
        verbspace::{VerbSpace, VerbSpaces, load_verbspace},
    },
    models::BaseFlags,
};

/// Everything `main` needs to know about one invocation of a command.
#[derive(Debug)]
pub struct Invocation {
    /// Name the command was invoked as (`volt`, `voltadmin`, ...).
    pub command_name: String,
    /// Directory of the invoking binary; scanned for `<command>.d`.
    pub command_dir: Option<PathBuf>,
    /// Version shown in global help.
    pub version: String,
    /// Description shown in global help.
    pub description: String,
    /// Set when booted from a package.
    pub bundle: Option<Bundle>,
    /// Arguments after the program name.
    pub args: Vec<String>,
}

/// The global help description of a command.
pub fn command_description(command_name: &str) -> String {
    COMMAND_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == command_name)
        .map_or_else(
            || format!("The \"{}\" command.", command_name),
            |(_, description)| description.to_string(),
        )
}

/// Loads the verbspaces of the internal commands, unless the running command is one of them.
pub fn load_internal_verbspaces(
    env: &Environment,
    command_name: &str,
    version: &str,
) -> Result<VerbSpaces> {
    let mut spaces = VerbSpaces::new();
    if INTERNAL_COMMANDS.contains(&command_name) {
        return Ok(spaces);
    }
    for internal in INTERNAL_COMMANDS {
        let description = format!("Internal \"{}\" command", internal);
        let space = load_verbspace(
            env,
            internal,
            None,
            version,
            &description,
            env.bundle.as_ref(),
        )?;
        spaces.insert(internal.to_string(), space);
    }
    Ok(spaces)
}

/// Parses `args` against `verbspace` and runs the verb.
pub fn run_command(
    verbspace: &VerbSpace,
    internal_verbspaces: &VerbSpaces,
    config: &mut VoltConfig,
    env: &Environment,
    args: &[String],
) -> Result<()> {
    env.check_interrupted()?;
    let processor = CommandProcessor::new(verbspace);
    let command = processor.parse(args)?;
    utility::apply_verbosity(command.outer_opts.verbose, command.outer_opts.debug);

    let mut runner = VerbRunner::new(
        command,
        verbspace,
        internal_verbspaces,
        config,
        &processor,
        env,
        &RunnerExtras::default(),
    )?;
    runner.execute()?;
    env.check_interrupted()
}

/// Runs one command invocation end to end.
pub fn main(invocation: Invocation, cancellation: CancellationToken) -> Result<()> {
    let Invocation {
        command_name,
        command_dir,
        version,
        description,
        bundle,
        args,
    } = invocation;

    // Global flags are needed before anything is loaded.
    let base = base_cli_spec();
    let flags = BaseFlags::from_options(&CommandPreprocessor::new(&base.options).preprocess(&args));
    utility::apply_verbosity(flags.verbose, flags.debug);
    log::debug!("Running \"{}\" with {:?}", command_name, args);

    let env = Environment::initialize(&command_name, command_dir.clone(), &version, bundle, cancellation)?;
    let mut config = VoltConfig::load(
        env.cwd.join(PERMANENT_CONFIG_FILENAME),
        env.cwd.join(LOCAL_CONFIG_FILENAME),
        &command_name,
    )?;

    let verbspace = load_verbspace(
        &env,
        &command_name,
        command_dir.as_deref(),
        &version,
        &description,
        env.bundle.as_ref(),
    )?;
    let internal_verbspaces = load_internal_verbspaces(&env, &command_name, &version)?;
    env.check_interrupted()?;

    run_command(&verbspace, &internal_verbspaces, &mut config, &env, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_internal_verbspaces_only_for_other_commands() {
        let lib = tempdir().unwrap();
        let env = Environment::with_lib_dir("tool", "1.0", lib.path(), lib.path());

        let spaces = load_internal_verbspaces(&env, "tool", "1.0").unwrap();
        assert_eq!(spaces.keys().collect::<Vec<_>>(), vec!["volt", "voltadmin"]);
        assert_eq!(spaces["voltadmin"].description, "Internal \"voltadmin\" command");

        assert!(load_internal_verbspaces(&env, "volt", "1.0").unwrap().is_empty());
    }

    #[test]
    fn test_command_description() {
        assert_eq!(
            command_description("volt"),
            "Command line interface to VoltDB functions."
        );
        assert_eq!(command_description("mytool"), "The \"mytool\" command.");
    }
}
