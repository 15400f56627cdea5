// src/constants.rs

/// The name of the runtime binary. Bundles re-enter through it.
pub const RUNTIME_NAME: &str = "voltcli";

/// The command assumed when the runtime is invoked under its own name.
pub const DEFAULT_COMMAND: &str = "volt";

/// Commands loaded as internal verbspaces so that verbs can delegate to them.
pub const INTERNAL_COMMANDS: &[&str] = &["volt", "voltadmin"];

/// Descriptions shown in global help for the commands shipped with the runtime.
pub const COMMAND_DESCRIPTIONS: &[(&str, &str)] = &[
    ("volt", "Command line interface to VoltDB functions."),
    ("voltadmin", "Administrative functions for VoltDB clusters."),
];

/// Suffix of the per-command directory holding verb-definition units.
pub const VERBS_SUBDIR_SUFFIX: &str = ".d";

/// File extension of script verb units.
pub const UNIT_EXTENSION: &str = "toml";

/// The permanent configuration file (in the working directory).
pub const PERMANENT_CONFIG_FILENAME: &str = "volt.cfg";

/// The local override configuration file (in the working directory).
pub const LOCAL_CONFIG_FILENAME: &str = "volt_local.cfg";

/// Namespace prepended to bare configuration keys by the `config` verb.
pub const CONFIG_KEY_NAMESPACE: &str = "volt";

/// Configuration key extending the Java classpath.
pub const CLASSPATH_CONFIG_KEY: &str = "volt.classpath";

/// Configuration key naming the catalog jar.
pub const CATALOG_CONFIG_KEY: &str = "volt.catalog";

/// Project file looked up in the working directory.
pub const PROJECT_FILENAME: &str = "project.xml";

// --- Environment variables ---

/// Root of a VoltDB distribution.
pub const HOME_ENV: &str = "VOLTDB_HOME";
/// Overrides the support library directory.
pub const LIB_DIR_ENV: &str = "VOLTCLI_LIB";
/// log4j configuration handed to Java programs.
pub const LOG4J_CONFIG_ENV: &str = "LOG4J_CONFIG_PATH";
/// Native library directory handed to Java programs.
pub const LIBRARY_PATH_ENV: &str = "VOLTDB_VOLTDB";
/// Java installation; `bin/java` is run from it.
pub const JAVA_HOME_ENV: &str = "JAVA_HOME";
/// Extra JVM options, split like a shell would.
pub const JAVA_OPTS_ENV: &str = "JAVA_OPTS";
/// Base classpath segments.
pub const CLASSPATH_ENV: &str = "CLASSPATH";

/// Java options used when `JAVA_OPTS` is not set.
pub const DEFAULT_JAVA_OPTS: &[&str] = &["-Xmx1024m", "-XX:+HeapDumpOnOutOfMemoryError"];

// --- Package layout ---

/// Interpreter line written at the top of every package.
pub const PACKAGE_PREAMBLE: &str = "#!/usr/bin/env voltcli\n";

/// Marker opening the package header line.
pub const PACKAGE_MAGIC: &str = "VOLTPKG";

/// Version of the package payload layout.
pub const PACKAGE_FORMAT_VERSION: u32 = 1;

/// Name of the bootstrap entry inside a package.
pub const PACKAGE_BOOTSTRAP_ENTRY: &str = "__main__";

/// Directory inside a package holding the copied library tree.
pub const PACKAGE_LIB_DIR: &str = "lib";

/// Compiled artifacts left out of packages.
pub const PACKAGE_EXCLUDES: &[&str] = &[r"[.]bin$"];
