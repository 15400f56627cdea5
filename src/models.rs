// src/models.rs

use crate::core::runner::VerbRunner;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// --- OPTION MODELS ---
// Shared by the base command and every verb.

/// The kind of value an option carries.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    #[default]
    /// A flag that takes no value.
    Boolean,
    /// Free-form text.
    String,
    /// A signed integer.
    Integer,
}

/// One declared command line option.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OptionSpec {
    /// Short flag including the dash, e.g. `-o`.
    #[serde(default)]
    pub short: Option<String>,
    /// Long flag including the dashes, e.g. `--output`.
    #[serde(default)]
    pub long: Option<String>,
    /// Key under which the parsed value is stored.
    pub dest: String,
    /// Value type; boolean when omitted.
    #[serde(default)]
    pub kind: OptionKind,
    /// One line shown in the option list.
    #[serde(default)]
    pub help: String,
    /// Value used when the option is not given. Not allowed for booleans.
    #[serde(default)]
    pub default: Option<String>,
}

impl OptionSpec {
    fn with_kind(kind: OptionKind, short: &str, long: &str, dest: &str, help: &str) -> Self {
        Self {
            short: (!short.is_empty()).then(|| short.to_string()),
            long: (!long.is_empty()).then(|| long.to_string()),
            dest: dest.to_string(),
            kind,
            help: help.to_string(),
            default: None,
        }
    }

    /// A flag that is `true` when present.
    pub fn boolean(short: &str, long: &str, dest: &str, help: &str) -> Self {
        Self::with_kind(OptionKind::Boolean, short, long, dest, help)
    }

    /// An option taking a string value.
    pub fn string(short: &str, long: &str, dest: &str, help: &str) -> Self {
        Self::with_kind(OptionKind::String, short, long, dest, help)
    }

    /// An option taking an integer value.
    pub fn integer(short: &str, long: &str, dest: &str, help: &str) -> Self {
        Self::with_kind(OptionKind::Integer, short, long, dest, help)
    }

    /// Sets the value used when the option is absent.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The short flag as a single character (`-o` -> `o`).
    pub fn short_char(&self) -> Option<char> {
        let name = self.short.as_deref()?.strip_prefix('-')?;
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '-' => Some(c),
            _ => None,
        }
    }

    /// The long flag without its leading dashes (`--output` -> `output`).
    pub fn long_name(&self) -> Option<&str> {
        self.long
            .as_deref()
            .and_then(|l| l.strip_prefix("--"))
            .filter(|l| !l.is_empty())
    }

    /// Returns true if `token` names this option.
    pub fn matches_flag(&self, token: &str) -> bool {
        self.short.as_deref() == Some(token) || self.long.as_deref() == Some(token)
    }
}

/// A parsed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A boolean flag.
    Bool(bool),
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// Declared but not given and without a default.
    Unset,
}

impl OptionValue {
    /// True only for a set boolean flag.
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    /// The string value, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Text form used when substituting the value into an argument.
    pub fn to_arg_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Unset => String::new(),
        }
    }
}

/// Parsed option values keyed by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerbOptions(BTreeMap<String, OptionValue>);

impl VerbOptions {
    /// Stores the value for `dest`, replacing any previous one.
    pub fn insert(&mut self, dest: impl Into<String>, value: OptionValue) {
        self.0.insert(dest.into(), value);
    }

    /// The raw value stored for `dest`.
    pub fn get(&self, dest: &str) -> Option<&OptionValue> {
        self.0.get(dest)
    }

    /// True if `dest` is a set boolean flag.
    pub fn get_bool(&self, dest: &str) -> bool {
        self.get(dest).is_some_and(OptionValue::as_bool)
    }

    /// The string value of `dest`.
    pub fn get_str(&self, dest: &str) -> Option<&str> {
        self.get(dest).and_then(OptionValue::as_str)
    }

    /// The integer value of `dest`.
    pub fn get_int(&self, dest: &str) -> Option<i64> {
        self.get(dest).and_then(OptionValue::as_int)
    }
}

/// Ordered option declarations plus usage text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliSpec {
    /// One-line summary shown in verb listings.
    pub description: String,
    /// Positional argument synopsis, e.g. `[FILE ...]`.
    pub usage: String,
    /// Declared options in declaration order.
    pub options: Vec<OptionSpec>,
    /// Long-form text printed after the option list in detailed help.
    pub description2: Option<String>,
    /// Common verbs (`help`, `package`, ...) are listed after the specific ones.
    pub base_verb: bool,
}

/// The global flags every command accepts before its verb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseFlags {
    /// `-d`/`--debug`: debug logging.
    pub debug: bool,
    /// `-n`/`--dry-run`: print commands instead of running them.
    pub dryrun: bool,
    /// `-p`/`--pause`: confirm before each command.
    pub pause: bool,
    /// `-v`/`--verbose`: verbose logging.
    pub verbose: bool,
}

// --- VERB MODELS ---

/// Native verb body, invoked with the execution context.
pub type NativeVerbFn = fn(&mut VerbRunner<'_>) -> anyhow::Result<()>;

/// The action `runner.go()` performs for a verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoAction {
    /// Print the verb's help.
    Help,
    /// Build a runnable package.
    Package,
    /// Run a Java class with the verb's arguments.
    Java {
        /// Main class.
        class: String,
    },
}

/// What a verb does when executed.
#[derive(Clone)]
pub enum VerbBody {
    /// Rust function registered by a native unit.
    Native(NativeVerbFn),
    /// Steps compiled from a script unit.
    Script(Vec<Step>),
}

impl fmt::Debug for VerbBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Script(steps) => f.debug_tuple("Script").field(steps).finish(),
        }
    }
}

/// A named executable unit of a verbspace.
#[derive(Debug, Clone)]
pub struct Verb {
    /// Name typed on the command line.
    pub name: String,
    /// Options and help text.
    pub cli_spec: CliSpec,
    /// Extra classpath for Java steps.
    pub classpath: Option<String>,
    /// Action taken by a `go` step or `runner.go()`.
    pub go_default: Option<GoAction>,
    /// What runs when the verb executes.
    pub body: VerbBody,
    /// Where the verb was declared, for diagnostics.
    pub origin: String,
}

// --- SCRIPT UNIT AST ---
// Produced by the compiler from `*.toml` units and interpreted by the runner.

/// One pre-parsed piece of a step argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateComponent {
    /// Text copied as is.
    Literal(String),
    /// `<args>`: every positional argument.
    Args,
    /// `<args::N>`: one positional argument (empty if absent).
    Arg(usize),
    /// `<opts::DEST>`: a parsed option value.
    Opt(String),
    /// `<config::KEY>`: a required configuration value.
    Config(String),
    /// `<catalog>`: the configured catalog path.
    Catalog,
    /// `<project>`: the project file path.
    Project,
    /// `<verb>`: the running verb's name.
    VerbName,
}

/// A step argument split into literal and substituted parts.
pub type Template = Vec<TemplateComponent>;

/// A compiled script step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run an external command.
    Shell {
        /// Command and arguments.
        argv: Vec<Template>,
        /// Keep going on a non-zero exit status.
        ignore_errors: bool,
    },
    /// Run a Java class.
    Java {
        /// Main class.
        class: Template,
        /// Program arguments.
        args: Vec<Template>,
        /// Extra JVM options.
        java_opts: Vec<Template>,
        /// Classpath prepended to the verb's.
        classpath: Option<Template>,
        /// JDWP port to listen on.
        remote_debug: Option<Template>,
    },
    /// Compile Java sources.
    Javac {
        /// Output directory for class files.
        outdir: Template,
        /// Source files.
        sources: Vec<Template>,
    },
    /// Run another verb.
    Call {
        /// Verb name.
        verb: Template,
        /// Arguments passed to it.
        args: Vec<Template>,
        /// Classpath prepended for the called verb.
        classpath: Option<Template>,
    },
    /// Perform the verb's default action.
    Go(Vec<Template>),
    /// Print a line.
    Echo(Template),
    /// Create a directory and its parents.
    Mkdir(Template),
    /// Print help.
    Help {
        /// Verbs to describe; all verbs when empty.
        names: Vec<Template>,
        /// Include every verb's full help.
        all: bool,
    },
    /// Stop with the given error lines.
    Abort(Vec<Template>),
}

// --- TOML UNIT MODELS (what is read from `<command>.d/*.toml`) ---

/// A script verb unit file.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlUnit {
    /// Data-client symbols the unit relies on.
    #[serde(default)]
    pub uses: Vec<String>,
    /// Declared verbs.
    #[serde(default, rename = "verb")]
    pub verbs: Vec<TomlVerb>,
}

/// One `[[verb]]` table of a unit file.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlVerb {
    /// Verb name.
    pub name: String,
    /// One-line summary.
    #[serde(default)]
    pub description: String,
    /// Positional argument synopsis.
    #[serde(default)]
    pub usage: String,
    /// Long help text.
    pub description2: Option<String>,
    /// Extra classpath for Java steps.
    pub classpath: Option<String>,
    /// Class run by a `go` step.
    pub java_class: Option<String>,
    /// List the verb with the common verbs.
    #[serde(default)]
    pub base_verb: bool,
    /// `[[verb.option]]` tables.
    #[serde(default, rename = "option")]
    pub options: Vec<OptionSpec>,
    /// Steps run in order.
    #[serde(default)]
    pub steps: Vec<TomlStep>,
}

/// A step as written in a unit file, keyed by step kind.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TomlStep {
    /// `shell = [...]`
    Shell(Vec<String>),
    /// `java = {...}`
    Java(TomlJavaStep),
    /// `javac = {...}`
    Javac(TomlJavacStep),
    /// `call = {...}`
    Call(TomlCallStep),
    /// `go = [...]`
    Go(Vec<String>),
    /// `echo = "..."`
    Echo(String),
    /// `mkdir = "..."`
    Mkdir(String),
    /// `help = {...}`
    Help(TomlHelpStep),
    /// `abort = [...]`
    Abort(Vec<String>),
}

/// Fields of a `java` step.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TomlJavaStep {
    /// Main class.
    pub class: String,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra JVM options.
    #[serde(default)]
    pub java_opts: Vec<String>,
    /// Classpath prepended to the verb's.
    pub classpath: Option<String>,
    /// JDWP port; an empty expansion leaves debugging off.
    pub remote_debug: Option<String>,
}

/// Fields of a `javac` step.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TomlJavacStep {
    /// Output directory for class files.
    pub outdir: String,
    /// Source files; at least one is required.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Fields of a `call` step.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TomlCallStep {
    /// Verb name.
    pub verb: String,
    /// Arguments passed to the verb.
    #[serde(default)]
    pub args: Vec<String>,
    /// Classpath prepended for the called verb.
    pub classpath: Option<String>,
}

/// Fields of a `help` step.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TomlHelpStep {
    /// Verbs to describe.
    #[serde(default)]
    pub names: Vec<String>,
    /// Include every verb's full help.
    #[serde(default)]
    pub all: bool,
}

// --- PACKAGE MODELS ---

/// The generated `__main__` entry of a package.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    /// Command name.
    pub name: String,
    /// Program version.
    pub version: String,
    /// One-line description.
    pub description: String,
    /// Whether the program runs from a package.
    pub package: bool,
}

/// One file stored in a package.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Path relative to the package root.
    pub path: String,
    /// File contents.
    pub data: Vec<u8>,
}

/// The compressed body of a package.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BundlePayload {
    /// Files in the package.
    pub entries: Vec<BundleEntry>,
}
