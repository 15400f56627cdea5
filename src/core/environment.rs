// src/core/environment.rs

use crate::{
    CancellationToken,
    constants::{
        CLASSPATH_ENV, DEFAULT_JAVA_OPTS, HOME_ENV, JAVA_HOME_ENV, JAVA_OPTS_ENV, LIB_DIR_ENV,
        PROJECT_FILENAME,
    },
    core::{bundle::Bundle, utility::VoltError},
};
use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Separator between classpath segments on this platform.
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") { ";" } else { ":" }
}

/// Process-wide facts resolved once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Name the program was invoked as.
    pub command_name: String,
    /// Directory of the script or binary that invoked the command, if any.
    pub command_dir: Option<PathBuf>,
    /// Program version string.
    pub version: String,
    /// `$VOLTDB_HOME`, or the distribution root around the binary.
    pub home: PathBuf,
    /// Root of the support library tree. Holds the framework's own `<command>.d` directories.
    pub lib_dir: PathBuf,
    /// Working directory. Configuration and packages are resolved against it.
    pub cwd: PathBuf,
    /// Base Java classpath segments.
    pub classpath: Vec<String>,
    /// The `java` executable.
    pub java: PathBuf,
    /// Base JVM options.
    pub java_opts: Vec<String>,
    /// The package this process was booted from, if any.
    pub bundle: Option<Bundle>,
    /// Set by the Ctrl+C listener.
    pub cancellation: CancellationToken,
}

impl Environment {
    /// Resolves the environment from the running process.
    pub fn initialize(
        command_name: &str,
        command_dir: Option<PathBuf>,
        version: &str,
        bundle: Option<Bundle>,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to determine the working directory")?;
        let home = resolve_home(&cwd);
        let lib_dir = env::var_os(LIB_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("lib").join("voltcli"));

        let java = env::var_os(JAVA_HOME_ENV)
            .map(|java_home| PathBuf::from(java_home).join("bin").join("java"))
            .unwrap_or_else(|| PathBuf::from("java"));

        let java_opts = match env::var(JAVA_OPTS_ENV) {
            Ok(raw) if !raw.trim().is_empty() => shlex::split(&raw)
                .ok_or_else(|| anyhow!("Could not parse {}: {}", JAVA_OPTS_ENV, raw))?,
            _ => DEFAULT_JAVA_OPTS.iter().map(|s| s.to_string()).collect(),
        };

        let mut classpath: Vec<String> = env::var_os(CLASSPATH_ENV)
            .map(|raw| {
                env::split_paths(&raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.display().to_string())
                    .collect()
            })
            .unwrap_or_default();
        for jar_dir in [home.join("voltdb"), home.join("lib")] {
            classpath.extend(list_jars(&jar_dir));
        }

        log::debug!(
            "Environment: home='{}', lib='{}', cwd='{}'",
            home.display(),
            lib_dir.display(),
            cwd.display()
        );

        Ok(Self {
            command_name: command_name.to_string(),
            command_dir,
            version: version.to_string(),
            home,
            lib_dir,
            cwd,
            classpath,
            java,
            java_opts,
            bundle,
            cancellation,
        })
    }

    /// A self-contained environment rooted at explicit directories. Nothing is
    /// read from the process environment.
    pub fn with_lib_dir(command_name: &str, version: &str, lib_dir: &Path, cwd: &Path) -> Self {
        Self {
            command_name: command_name.to_string(),
            command_dir: None,
            version: version.to_string(),
            home: lib_dir.parent().unwrap_or(lib_dir).to_path_buf(),
            lib_dir: lib_dir.to_path_buf(),
            cwd: cwd.to_path_buf(),
            classpath: Vec::new(),
            java: PathBuf::from("java"),
            java_opts: DEFAULT_JAVA_OPTS.iter().map(|s| s.to_string()).collect(),
            bundle: None,
            cancellation: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `project.xml` in the working directory.
    pub fn project_path(&self) -> PathBuf {
        self.cwd.join(PROJECT_FILENAME)
    }

    /// True when booted from a package.
    pub fn is_packaged(&self) -> bool {
        self.bundle.is_some()
    }

    /// Fails with [`VoltError::Interrupted`] once Ctrl+C has been pressed.
    pub fn check_interrupted(&self) -> Result<()> {
        if self.cancellation.load(Ordering::SeqCst) {
            return Err(VoltError::Interrupted.into());
        }
        Ok(())
    }
}

/// `$VOLTDB_HOME`, else the parent of the directory holding the running binary.
fn resolve_home(cwd: &Path) -> PathBuf {
    if let Some(home) = env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    env::current_exe()
        .ok()
        .and_then(|exe| dunce::canonicalize(exe).ok())
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.to_path_buf())
}

/// Jar files directly inside `dir`, sorted. Missing directories yield nothing.
fn list_jars(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut jars: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jar"))
        .map(|path| path.display().to_string())
        .collect();
    jars.sort();
    jars
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_jars_only_returns_sorted_jars() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.jar"), b"").unwrap();
        fs::write(dir.path().join("a.jar"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let jars = list_jars(dir.path());
        assert_eq!(jars.len(), 2);
        assert!(jars[0].ends_with("a.jar"));
        assert!(jars[1].ends_with("b.jar"));
    }

    #[test]
    fn test_list_jars_missing_dir_is_empty() {
        assert!(list_jars(Path::new("definitely/not/here")).is_empty());
    }

    #[test]
    fn test_with_lib_dir_uses_given_paths() {
        let dir = tempdir().unwrap();
        let env = Environment::with_lib_dir("volt", "1.0", dir.path(), dir.path());
        assert_eq!(env.lib_dir, dir.path());
        assert_eq!(env.project_path(), dir.path().join("project.xml"));
        assert!(!env.is_packaged());
    }
}
