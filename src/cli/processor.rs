//! # Command Processor
//!
//! Parses a full command line against one verbspace in two phases:
//!
//! 1. The verb is the first argument that does not start with `-`. Global flags
//!    never take values, so nothing else has to be understood to find it.
//! 2. A composite `clap` command is built from the global options plus a single
//!    subcommand for that verb (its options and a trailing positional list), and
//!    the whole argument list is parsed with it.
//!
//! Help screens are rendered by `clap` from the same builders, so the usage a
//! verb prints always matches what the parser accepts.

use crate::{
    cli::{base_cli_spec, with_prog},
    core::{utility, verbspace::VerbSpace},
    models::{BaseFlags, CliSpec, OptionKind, OptionSpec, OptionValue, Verb, VerbOptions},
};
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

/// Id of the trailing positional list. Not a valid option dest in units.
const ARGS_ID: &str = "__args";

const GLOBAL_HELP_TEMPLATE: &str =
    "{before-help}{name} version {version}\n\n{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}";

/// The result of parsing a command line.
#[derive(Debug, Clone)]
pub struct ParsedCommand<'a> {
    /// The verb named on the command line.
    pub verb: &'a Verb,
    /// Values of the verb's own options.
    pub opts: VerbOptions,
    /// Positional arguments after the verb options.
    pub args: Vec<String>,
    /// Standalone parser of the verb, used to print its usage.
    pub parser: Command,
    /// Global flags given before the verb.
    pub outer_opts: BaseFlags,
}

/// Builds parsers and help screens for one verbspace.
#[derive(Debug, Clone)]
pub struct CommandProcessor<'a> {
    verbspace: &'a VerbSpace,
    base: CliSpec,
    prog: String,
}

fn option_arg(spec: &OptionSpec) -> Arg {
    let mut arg = Arg::new(spec.dest.clone()).help(spec.help.clone());
    if let Some(c) = spec.short_char() {
        arg = arg.short(c);
    }
    if let Some(long) = spec.long_name() {
        arg = arg.long(long.to_string());
    }
    match spec.kind {
        OptionKind::Boolean => arg.action(ArgAction::SetTrue),
        OptionKind::String | OptionKind::Integer => {
            arg = arg
                .action(ArgAction::Set)
                .value_name(spec.dest.to_uppercase());
            if spec.kind == OptionKind::Integer {
                arg = arg.value_parser(clap::value_parser!(i64));
            }
            match &spec.default {
                Some(default) => arg.default_value(default.clone()),
                None => arg,
            }
        }
    }
}

/// Reads the values of `options` out of `matches`.
fn collect_options(options: &[OptionSpec], matches: &ArgMatches) -> VerbOptions {
    let mut values = VerbOptions::default();
    for option in options {
        let value = match option.kind {
            OptionKind::Boolean => OptionValue::Bool(matches.get_flag(&option.dest)),
            OptionKind::String => matches
                .get_one::<String>(&option.dest)
                .map_or(OptionValue::Unset, |s| OptionValue::Str(s.clone())),
            OptionKind::Integer => matches
                .get_one::<i64>(&option.dest)
                .map_or(OptionValue::Unset, |i| OptionValue::Int(*i)),
        };
        values.insert(option.dest.clone(), value);
    }
    values
}

impl<'a> CommandProcessor<'a> {
    /// A processor for `verbspace`, named after it.
    pub fn new(verbspace: &'a VerbSpace) -> Self {
        Self {
            verbspace,
            base: base_cli_spec(),
            prog: verbspace.name.clone(),
        }
    }

    /// The base options as a `clap` command, without any verbs.
    fn base_command(&self) -> Command {
        let about = format!(
            "{}\n{}",
            self.verbspace.description,
            with_prog(&self.base.description, &self.prog)
        );
        Command::new(self.prog.clone())
            .bin_name(self.prog.clone())
            .version(self.verbspace.version.clone())
            .about(about.trim().to_string())
            .override_usage(with_prog(&self.base.usage, &self.prog))
            .help_template(GLOBAL_HELP_TEMPLATE)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .disable_help_subcommand(true)
            .subcommand_value_name("VERB")
            .subcommand_help_heading("Verbs")
            .args(self.base.options.iter().map(option_arg))
    }

    fn verb_command(&self, verb: &Verb) -> Command {
        let spec = &verb.cli_spec;
        let mut usage = format!("{} {}", self.prog, verb.name);
        if !spec.options.is_empty() {
            usage.push_str(" [OPTIONS]");
        }
        if !spec.usage.is_empty() {
            usage.push(' ');
            usage.push_str(&with_prog(&spec.usage, &self.prog));
        }
        Command::new(verb.name.clone())
            .about(with_prog(&spec.description, &self.prog))
            .override_usage(usage)
            .disable_help_flag(true)
            .args(spec.options.iter().map(option_arg))
            .arg(
                Arg::new(ARGS_ID)
                    .value_name("ARGUMENTS")
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .hide(true),
            )
    }

    /// A standalone parser for `verb`, used for its detailed help.
    pub fn create_verb_parser(&self, verb: &Verb) -> Command {
        self.verb_command(verb).name(format!("{} {}", self.prog, verb.name))
    }

    /// The whole command: base options and every verb.
    pub fn global_parser(&self) -> Command {
        let mut command = self.base_command();
        for verb in self.verbspace.verbs().iter() {
            command = command.subcommand(
                Command::new(verb.name.clone()).about(with_prog(&verb.cli_spec.description, &self.prog)),
            );
        }
        command
    }

    /// Help of the whole command: base options and every verb.
    pub fn global_help(&self) -> String {
        self.global_parser().render_help().to_string()
    }

    /// Detailed help of `verb`, including its long description.
    pub fn verb_help(&self, verb: &Verb) -> String {
        let mut text = self.create_verb_parser(verb).render_help().to_string();
        if let Some(description2) = &verb.cli_spec.description2 {
            text.push('\n');
            text.push_str(description2.trim());
            text.push('\n');
        }
        text
    }

    /// Prints [`verb_help`](Self::verb_help) to stdout.
    pub fn print_help(&self, verb: &Verb) {
        print!("{}", self.verb_help(verb));
    }

    /// Prints [`global_help`](Self::global_help) to stdout.
    pub fn print_global_help(&self) {
        println!("{}", self.global_help());
    }

    /// Parses `args` (without the program name).
    pub fn parse(&self, args: &[String]) -> Result<ParsedCommand<'a>> {
        let Some(verb_name) = args.iter().find(|a| !a.starts_with('-')) else {
            self.print_global_help();
            return Err(utility::abort(["A verb is required."]));
        };
        let Some(verb) = self.verbspace.verb(verb_name) else {
            self.print_global_help();
            return Err(utility::abort([format!("Unknown verb \"{}\".", verb_name)]));
        };
        log::debug!("Parsing arguments for verb \"{}\": {:?}", verb.name, args);

        let composite = self
            .base_command()
            .subcommand(self.verb_command(verb))
            .subcommand_required(true);
        let matches = composite
            .try_get_matches_from(std::iter::once(self.prog.as_str()).chain(args.iter().map(String::as_str)))
            .map_err(|e| utility::abort([e.render().to_string().trim_end().to_string()]))?;

        let outer_opts = BaseFlags::from_options(&collect_options(&self.base.options, &matches));
        let Some(verb_matches) = matches.subcommand_matches(&verb.name) else {
            return Err(utility::abort([format!("Unknown verb \"{}\".", verb_name)]));
        };
        let opts = collect_options(&verb.cli_spec.options, verb_matches);
        let verb_args: Vec<String> = verb_matches
            .get_many::<String>(ARGS_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Ok(ParsedCommand {
            verb,
            opts,
            args: verb_args,
            parser: self.create_verb_parser(verb),
            outer_opts,
        })
    }
}
