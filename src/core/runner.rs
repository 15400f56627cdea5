//! # Verb Runner
//!
//! The execution context of one verb invocation. A runner owns the parsed
//! options and arguments, borrows the verbspaces and configuration, and carries
//! a [`JavaRunner`] bound to the classpath computed for the verb.
//!
//! Nested calls (`call`) re-parse a synthetic command line through a fresh
//! [`CommandProcessor`] and run a fresh runner, so a called verb gets the same
//! option handling and usage text as one typed on the command line.

use crate::{
    cli::processor::{CommandProcessor, ParsedCommand},
    constants::{CATALOG_CONFIG_KEY, CLASSPATH_CONFIG_KEY},
    core::{
        config::VoltConfig,
        environment::{Environment, classpath_separator},
        interpolator::Interpolator,
        java::{JavaExtras, JavaRunner},
        packager,
        utility::{self, VoltError},
        verbspace::{VerbSpace, VerbSpaces},
    },
    models::{BaseFlags, GoAction, Step, Verb, VerbBody, VerbOptions},
    system::executor::{self, ExecutionError, RunOptions},
};
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Per-call additions passed down to a nested runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerExtras {
    /// Prepended to the nested verb's classpath.
    pub classpath: Option<String>,
}

/// Execution context handed to a verb body.
#[derive(Debug)]
pub struct VerbRunner<'a> {
    /// The running verb.
    pub verb: &'a Verb,
    /// Parsed verb options.
    pub opts: VerbOptions,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Parser built for the verb, used for its usage line.
    pub parser: clap::Command,
    /// Global flags.
    pub outer_opts: BaseFlags,
    /// Verbspace the verb belongs to.
    pub verbspace: &'a VerbSpace,
    /// Every internal verbspace, for `space.verb` calls and packaging.
    pub internal_verbspaces: &'a VerbSpaces,
    /// Loaded configuration.
    pub config: &'a mut VoltConfig,
    /// Command processor for help output and nested calls.
    pub processor: &'a CommandProcessor<'a>,
    /// Process environment.
    pub env: &'a Environment,
    /// Action taken by `go`.
    pub go_default: Option<GoAction>,
    /// Project file path.
    pub project_path: PathBuf,
    /// Java launcher carrying the verb's classpath.
    pub java: JavaRunner,
}

/// Joins the non-empty classpath segments, earlier segments first.
fn build_classpath<'s>(segments: impl IntoIterator<Item = &'s str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

impl<'a> VerbRunner<'a> {
    /// Builds the context for a parsed command.
    pub fn new(
        command: ParsedCommand<'a>,
        verbspace: &'a VerbSpace,
        internal_verbspaces: &'a VerbSpaces,
        config: &'a mut VoltConfig,
        processor: &'a CommandProcessor<'a>,
        env: &'a Environment,
        extras: &RunnerExtras,
    ) -> Result<Self> {
        let ParsedCommand {
            verb,
            opts,
            args,
            parser,
            outer_opts,
        } = command;

        let config_classpath = config.get_expanded(CLASSPATH_CONFIG_KEY)?;
        let classpath = build_classpath(
            extras
                .classpath
                .as_deref()
                .into_iter()
                .chain(verb.classpath.as_deref())
                .chain(env.classpath.iter().map(String::as_str))
                .chain(config_classpath.as_deref()),
        );
        log::debug!("Classpath for \"{}\": {}", verb.name, classpath);

        let java = JavaRunner::new(
            classpath,
            env.java.clone(),
            env.java_opts.clone(),
            outer_opts.dryrun,
            outer_opts.pause,
            env.cancellation.clone(),
        );
        Ok(Self {
            verb,
            opts,
            args,
            parser,
            outer_opts,
            verbspace,
            internal_verbspaces,
            config,
            processor,
            env,
            go_default: None,
            project_path: env.project_path(),
            java,
        })
    }

    /// Runs the verb body.
    ///
    /// An interrupt seen before, between script steps or after the body wins
    /// over whatever the body returned.
    pub fn execute(&mut self) -> Result<()> {
        let verb = self.verb;
        self.go_default = verb.go_default.clone();
        log::debug!("Executing verb \"{}\" from '{}'.", verb.name, verb.origin);
        self.env.check_interrupted()?;
        let result = match &verb.body {
            VerbBody::Native(func) => func(self),
            VerbBody::Script(steps) => steps.iter().try_for_each(|step| {
                self.env.check_interrupted()?;
                self.run_step(step)
            }),
        };
        self.env.check_interrupted()?;
        result
    }

    fn interpolator(&self) -> Interpolator<'_> {
        Interpolator::new(
            &self.verb.name,
            &self.args,
            &self.opts,
            &*self.config,
            &self.project_path,
        )
    }

    fn run_step(&mut self, step: &Step) -> Result<()> {
        log::trace!("Step: {:?}", step);
        let interpolator = self.interpolator();
        match step {
            Step::Shell {
                argv,
                ignore_errors,
            } => {
                let argv = interpolator.expand_list(argv)?;
                self.run_shell(&argv, *ignore_errors)
            }
            Step::Java {
                class,
                args,
                java_opts,
                classpath,
                remote_debug,
            } => {
                let class = interpolator.expand(class)?;
                let args = interpolator.expand_list(args)?;
                let java_opts = interpolator.expand_list(java_opts)?;
                let port = interpolator.expand_opt(remote_debug.as_ref())?;
                let extras = JavaExtras {
                    classpath: interpolator.expand_opt(classpath.as_ref())?,
                    remote_debug: self.debug_port(port.as_deref())?,
                };
                self.java.execute(&class, &java_opts, &args, &extras)
            }
            Step::Javac { outdir, sources } => {
                let outdir = self.env.cwd.join(interpolator.expand(outdir)?);
                let sources = interpolator.expand_list(sources)?;
                self.java.compile(&outdir, &sources)
            }
            Step::Call {
                verb,
                args,
                classpath,
            } => {
                let name = interpolator.expand(verb)?;
                let args = interpolator.expand_list(args)?;
                let extras = RunnerExtras {
                    classpath: interpolator.expand_opt(classpath.as_ref())?,
                };
                self.call_with(&name, &args, &extras)
            }
            Step::Go(args) => {
                let args = interpolator.expand_list(args)?;
                self.go(&args)
            }
            Step::Echo(text) => {
                println!("{}", interpolator.expand(text)?);
                Ok(())
            }
            Step::Mkdir(dir) => {
                let dir = interpolator.expand(dir)?;
                self.mkdir(Path::new(&dir))
            }
            Step::Help { names, all } => {
                let names = interpolator.expand_list(names)?;
                self.help(&names, *all);
                Ok(())
            }
            Step::Abort(messages) => {
                let messages = interpolator.expand_list(messages)?;
                Err(self.abort(&messages))
            }
        }
    }

    /// Parses an expanded `remote_debug` value. Empty means no debugging.
    fn debug_port(&self, value: Option<&str>) -> Result<Option<u16>> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(port) => port.parse().map(Some).map_err(|_| {
                self.abort(&[format!("Remote debug port \"{}\" is not a valid port number.", port)])
            }),
        }
    }

    /// Runs an external command, honouring dry-run and pause.
    pub fn shell(&self, argv: &[String]) -> Result<()> {
        self.run_shell(argv, false)
    }

    fn run_shell(&self, argv: &[String], ignore_errors: bool) -> Result<()> {
        let options = RunOptions {
            dryrun: self.outer_opts.dryrun,
            pause: self.outer_opts.pause,
            ignore_errors,
            cwd: None,
        };
        executor::run_cmd(argv, &options, &self.env.cancellation)
            .map_err(ExecutionError::into_fatal)
    }

    /// Creates a directory and its parents.
    pub fn mkdir(&self, dir: &Path) -> Result<()> {
        if self.outer_opts.dryrun {
            println!("mkdir -p {}", dir.display());
            return Ok(());
        }
        log::info!("Creating directory '{}'", dir.display());
        fs::create_dir_all(dir).with_context(|| format!("Failed to create '{}'", dir.display()))
    }

    /// The configured catalog path. Aborts if it is not set.
    pub fn get_catalog(&self) -> Result<String> {
        self.config
            .get_required(CATALOG_CONFIG_KEY)
            .map(str::to_string)
    }

    /// True if the configured catalog file exists.
    pub fn catalog_exists(&self) -> Result<bool> {
        Ok(Path::new(&self.get_catalog()?).exists())
    }

    /// Reports a fatal error in this verb with its usage. Return the result as the error.
    pub fn abort(&self, messages: &[String]) -> anyhow::Error {
        let mut lines = vec![format!("Fatal error in \"{}\" command.", self.verb.name)];
        lines.extend(messages.iter().cloned());
        utility::error(&lines);
        println!();
        println!("{}", self.parser.clone().render_usage());
        VoltError::Abort {
            messages: Vec::new(),
        }
        .into()
    }

    /// Prints the usage of the whole command.
    pub fn usage(&self) {
        self.to_stdout(|out| self.write_usage(out));
    }

    /// Writes the usage of the whole command to `out`.
    pub fn write_usage(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", self.processor.global_help())
    }

    fn write_verb_help(&self, out: &mut dyn Write, verb: &Verb) -> io::Result<()> {
        writeln!(out)?;
        write!(out, "{}", self.processor.verb_help(verb))
    }

    fn to_stdout(&self, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = write(&mut stdout).and_then(|()| stdout.flush()) {
            log::warn!("Could not write help: {}", e);
        }
    }

    /// With `all`, prints everything; with names, detailed help for each;
    /// otherwise the command usage. Unknown names are reported, not fatal.
    pub fn help(&self, names: &[String], all: bool) {
        self.to_stdout(|out| self.write_help(out, names, all));
    }

    /// Writes the output of [`help`](Self::help) to `out`. Specific verbs come
    /// before the common ones.
    pub fn write_help(&self, out: &mut dyn Write, names: &[String], all: bool) -> io::Result<()> {
        let verbs = self.verbspace.verbs();
        if all {
            write!(out, "\n===== Full Help =====\n")?;
            self.write_usage(out)?;
            for verb in verbs.iter().filter(|v| !v.cli_spec.base_verb) {
                write!(out, "\n===== Verb: {} =====\n", verb.name)?;
                self.write_verb_help(out, verb)?;
            }
            for verb in verbs.iter().filter(|v| v.cli_spec.base_verb) {
                write!(out, "\n===== Common Verb: {} =====\n", verb.name)?;
                self.write_verb_help(out, verb)?;
            }
        } else if names.is_empty() {
            self.write_usage(out)?;
        } else {
            for name in names {
                match verbs.get(name) {
                    Some(verb) => self.write_verb_help(out, verb)?,
                    None => {
                        utility::error_to(out, &[format!("Verb \"{}\" was not found.", name)])?;
                        self.write_usage(out)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Packages the running verbspace, or each named internal verbspace.
    pub fn package(&self, output_dir: Option<&str>, force: bool, names: &[String]) -> Result<()> {
        let output_dir = self.env.cwd.join(output_dir.unwrap_or(""));
        if names.is_empty() {
            let space = self.verbspace;
            packager::create_package(
                self.env,
                &output_dir,
                &space.name,
                &space.version,
                &space.description,
                force,
            )?;
            return Ok(());
        }
        for name in names {
            let Some(space) = self.internal_verbspaces.get(name) else {
                return Err(utility::abort([format!(
                    "Unknown base command \"{}\" specified for packaging.",
                    name
                )]));
            };
            packager::create_package(
                self.env,
                &output_dir,
                &space.name,
                &space.version,
                &space.description,
                force,
            )?;
        }
        Ok(())
    }

    /// Replaces the action taken by `go`.
    pub fn set_go_default(&mut self, go_default: GoAction) {
        self.go_default = Some(go_default);
    }

    /// Runs the verb's default action.
    pub fn go(&mut self, args: &[String]) -> Result<()> {
        match self.go_default.clone() {
            None => Err(utility::abort([format!(
                "Verb \"{}\" does not provide a default go action.",
                self.verb.name
            )])),
            Some(GoAction::Help) => {
                let names: &[String] = if args.is_empty() { &self.args } else { args };
                self.help(names, self.opts.get_bool("all"));
                Ok(())
            }
            Some(GoAction::Package) => {
                let params: &[String] = if args.is_empty() { &self.args } else { args };
                let (output_dir, names) = match params.split_first() {
                    Some((dir, names)) => (Some(dir.as_str()), names),
                    None => (None, params),
                };
                self.package(output_dir, self.opts.get_bool("force"), names)
            }
            Some(GoAction::Java { class }) => {
                self.java.execute(&class, &[], args, &JavaExtras::default())
            }
        }
    }

    /// Runs another verb with `args`. `space.verb` addresses an internal verbspace.
    pub fn call(&mut self, name: &str, args: &[String]) -> Result<()> {
        self.call_with(name, args, &RunnerExtras::default())
    }

    /// Like [`call`](Self::call) with a classpath prepended for the nested verb.
    pub fn call_with(&mut self, name: &str, args: &[String], extras: &RunnerExtras) -> Result<()> {
        if name.is_empty() {
            return Err(utility::abort(["No arguments were passed to VerbRunner.call()."]));
        }
        let internal_verbspaces = self.internal_verbspaces;
        let (verbspace, verb_name) = match name.split_once('.') {
            None => (self.verbspace, name),
            Some((space_name, verb_name)) => {
                let Some(space) = internal_verbspaces.get(space_name) else {
                    return Err(utility::abort([format!(
                        "Unknown name passed to VerbRunner.call(): {}",
                        space_name
                    )]));
                };
                if space.verb(verb_name).is_none() {
                    let mut messages = vec![
                        format!("Unknown verb passed to VerbRunner.call(): {}", name),
                        format!("Available verbs in \"{}\":", space_name),
                    ];
                    messages.extend(utility::indented(space.verb_names()));
                    return Err(utility::abort(messages));
                }
                (space, verb_name)
            }
        };
        log::debug!("Calling \"{}\" in \"{}\" with {:?}", verb_name, verbspace.name, args);

        let mut argv = vec![verb_name.to_string()];
        argv.extend(args.iter().cloned());
        let processor = CommandProcessor::new(verbspace);
        let mut command = processor.parse(&argv)?;
        command.outer_opts = self.outer_opts;
        let mut runner = VerbRunner::new(
            command,
            verbspace,
            internal_verbspaces,
            &mut *self.config,
            &processor,
            self.env,
            extras,
        )?;
        runner.execute()
    }
}
