// src/core/java.rs

use crate::{
    CancellationToken,
    constants::{LIBRARY_PATH_ENV, LOG4J_CONFIG_ENV},
    system::executor::{self, ExecutionError, RunOptions},
};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Source/target level passed to `javac`.
const JAVAC_RELEASE: &str = "1.8";

/// Per-call additions to a Java command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaExtras {
    /// Prepended to the runner's classpath for this call only.
    pub classpath: Option<String>,
    /// Opens a JDWP socket on this port and suspends until a debugger attaches.
    pub remote_debug: Option<u16>,
}

/// Executes or compiles Java programs against a fixed classpath.
#[derive(Debug, Clone)]
pub struct JavaRunner {
    /// Full classpath, earlier segments first.
    pub classpath: String,
    java: PathBuf,
    java_opts: Vec<String>,
    dryrun: bool,
    pause: bool,
    cancellation: CancellationToken,
}

/// The option family an option belongs to; overrides replace options of the same family.
fn option_family(option: &str) -> &str {
    for prefix in ["-Xmx", "-Xms", "-Xss", "-Xmn"] {
        if option.starts_with(prefix) {
            return prefix;
        }
    }
    if let Some(rest) = option.strip_prefix("-XX:") {
        let name_end = 4 + rest.find('=').unwrap_or(rest.len());
        let start = if rest.starts_with('+') || rest.starts_with('-') { 5 } else { 4 };
        return option.get(start..name_end).unwrap_or(option);
    }
    if option.starts_with("-D") {
        return option.split_once('=').map_or(option, |(name, _)| name);
    }
    option
}

/// Merges `overrides` into `base`, dropping base options of an overridden family.
pub fn merge_java_options(base: &[String], overrides: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = base
        .iter()
        .filter(|opt| {
            !overrides
                .iter()
                .any(|o| option_family(o) == option_family(opt))
        })
        .cloned()
        .collect();
    merged.extend(overrides.iter().cloned());
    merged
}

impl JavaRunner {
    /// A runner for `java`. `dryrun` and `pause` behave as for shell steps.
    pub fn new(
        classpath: String,
        java: PathBuf,
        java_opts: Vec<String>,
        dryrun: bool,
        pause: bool,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            classpath,
            java,
            java_opts,
            dryrun,
            pause,
            cancellation,
        }
    }

    /// Builds the full `java` command line without running it.
    pub fn build_command(
        &self,
        java_class: &str,
        java_opts_override: &[String],
        args: &[String],
        extras: &JavaExtras,
    ) -> Vec<String> {
        let classpath = match extras.classpath.as_deref() {
            Some(extra) if !extra.is_empty() && !self.classpath.is_empty() => format!(
                "{}{}{}",
                extra,
                crate::core::environment::classpath_separator(),
                self.classpath
            ),
            Some(extra) if !extra.is_empty() => extra.to_string(),
            _ => self.classpath.clone(),
        };

        let mut java_args = vec![self.java.display().to_string()];
        java_args.extend(merge_java_options(&self.java_opts, java_opts_override));
        if let Some(port) = extras.remote_debug {
            java_args.extend([
                "-Xdebug".to_string(),
                "-Xnoagent".to_string(),
                "-Djava.compiler=NONE".to_string(),
                format!(
                    "-Xrunjdwp:transport=dt_socket,address={},server=y,suspend=y",
                    port
                ),
            ]);
        }
        match std::env::var(LOG4J_CONFIG_ENV) {
            Ok(path) => java_args.push(format!("-Dlog4j.configuration=file://{}", path)),
            Err(_) => log::debug!("{} is not set; log4j uses its defaults.", LOG4J_CONFIG_ENV),
        }
        match std::env::var(LIBRARY_PATH_ENV) {
            Ok(path) => java_args.push(format!("-Djava.library.path={}", path)),
            Err(_) => log::debug!("{} is not set; no native library path.", LIBRARY_PATH_ENV),
        }
        java_args.push("-classpath".to_string());
        java_args.push(classpath);
        java_args.push(java_class.to_string());
        java_args.extend(args.iter().filter(|a| !a.is_empty()).cloned());
        java_args
    }

    /// Runs a Java class with option overrides.
    pub fn execute(
        &self,
        java_class: &str,
        java_opts_override: &[String],
        args: &[String],
        extras: &JavaExtras,
    ) -> Result<()> {
        let argv = self.build_command(java_class, java_opts_override, args, extras);
        executor::run_cmd(&argv, &self.run_options(), &self.cancellation)
            .map_err(ExecutionError::into_fatal)?;
        Ok(())
    }

    /// Builds the `javac` command line without running it.
    pub fn build_compile_command(&self, outdir: &Path, srcfiles: &[String]) -> Vec<String> {
        let mut argv = vec![
            "javac".to_string(),
            "-target".to_string(),
            JAVAC_RELEASE.to_string(),
            "-source".to_string(),
            JAVAC_RELEASE.to_string(),
            "-classpath".to_string(),
            self.classpath.clone(),
            "-d".to_string(),
            outdir.display().to_string(),
        ];
        argv.extend(srcfiles.iter().filter(|f| !f.is_empty()).cloned());
        argv
    }

    /// Compiles Java sources into `outdir`, creating it if needed.
    pub fn compile(&self, outdir: &Path, srcfiles: &[String]) -> Result<()> {
        if !outdir.exists() && !self.dryrun {
            fs::create_dir_all(outdir)
                .with_context(|| format!("Failed to create '{}'", outdir.display()))?;
        }
        let argv = self.build_compile_command(outdir, srcfiles);
        executor::run_cmd(&argv, &self.run_options(), &self.cancellation)
            .map_err(ExecutionError::into_fatal)?;
        Ok(())
    }

    fn run_options(&self) -> RunOptions<'static> {
        RunOptions {
            dryrun: self.dryrun,
            pause: self.pause,
            ..Default::default()
        }
    }
}
