//! # Compiler
//!
//! Turns script verb units (`<command>.d/*.toml`) into verb declarations. Step
//! arguments are pre-parsed into `TemplateComponent`s here so that errors in a unit
//! surface when it is loaded, never halfway through running a verb.

use crate::models::{
    CliSpec, OptionKind, OptionSpec, Step, Template, TemplateComponent, TomlStep, TomlUnit,
    TomlVerb,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

lazy_static! {
    // Regex to capture potential tokens, with an optional escape character `\`.
    static ref TOKEN_RE: Regex = Regex::new(r"\\?<([^<>]+)>").expect("token regex is valid");
}

/// Represents errors that can occur while compiling a verb unit.
#[derive(Error, Debug)]
pub enum CompilerError {
    /// The TOML content of the unit is invalid and could not be parsed.
    #[error("Failed to parse verb unit '{origin}': {source}")]
    TomlParse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    /// The unit parsed but declares something unusable.
    #[error("Invalid verb unit '{origin}': {message}")]
    Invalid { origin: String, message: String },
}

/// A verb declared by a script unit, ready to hand to the decorators.
#[derive(Debug, Clone)]
pub struct CompiledVerb {
    /// Unit name, taken from the file stem.
    pub name: String,
    /// Options and help text.
    pub spec: CliSpec,
    /// Prepended to the classpath of the verb's Java programs.
    pub classpath: Option<String>,
    /// Makes `go` run this class.
    pub java_class: Option<String>,
    /// Never empty; a verb without steps runs `go <args>`.
    pub steps: Vec<Step>,
}

/// The compiled form of one unit file.
#[derive(Debug, Clone, Default)]
pub struct CompiledUnit {
    /// Client symbols the unit declares it needs.
    pub uses: Vec<String>,
    /// Verbs in declaration order.
    pub verbs: Vec<CompiledVerb>,
}

// --- PUBLIC COMPILER API ---

/// Parses and compiles the text of a unit. `origin` names the unit in errors.
pub fn compile_unit(text: &str, origin: &str) -> Result<CompiledUnit, CompilerError> {
    let unit: TomlUnit = toml::from_str(text).map_err(|source| CompilerError::TomlParse {
        origin: origin.to_string(),
        source,
    })?;
    let invalid = |message: String| CompilerError::Invalid {
        origin: origin.to_string(),
        message,
    };

    let mut verbs = Vec::with_capacity(unit.verbs.len());
    for toml_verb in unit.verbs {
        let name = toml_verb.name.clone();
        verbs.push(compile_verb(toml_verb).map_err(|m| invalid(format!("verb \"{}\": {}", name, m)))?);
    }
    Ok(CompiledUnit {
        uses: unit.uses,
        verbs,
    })
}

/// Splits a string into literal and token components.
pub fn tokenize_string(text: &str) -> Result<Template, String> {
    let mut components = Vec::new();

    // Helper to push literals and handle merging.
    let push_literal = |components: &mut Template, s: &str| {
        if s.is_empty() {
            return;
        }
        if let Some(TemplateComponent::Literal(last)) = components.last_mut() {
            last.push_str(s);
        } else {
            components.push(TemplateComponent::Literal(s.to_string()));
        }
    };

    let mut last_index = 0;
    for caps in TOKEN_RE.captures_iter(text) {
        let (Some(full_match), Some(content)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_literal(&mut components, text.get(last_index..full_match.start()).unwrap_or(""));

        if let Some(escaped) = full_match.as_str().strip_prefix('\\') {
            push_literal(&mut components, escaped);
        } else {
            components.push(parse_token_content(content.as_str())?);
        }
        last_index = full_match.end();
    }
    push_literal(&mut components, text.get(last_index..).unwrap_or(""));

    Ok(components)
}

fn parse_token_content(content: &str) -> Result<TemplateComponent, String> {
    let trimmed = content.trim();
    if let Some(index) = trimmed.strip_prefix("args::") {
        let index = index
            .parse::<usize>()
            .map_err(|_| format!("invalid argument index in <{}>", trimmed))?;
        return Ok(TemplateComponent::Arg(index));
    }
    if let Some(dest) = trimmed.strip_prefix("opts::") {
        return non_empty(dest, trimmed).map(TemplateComponent::Opt);
    }
    if let Some(key) = trimmed.strip_prefix("config::") {
        return non_empty(key, trimmed).map(TemplateComponent::Config);
    }
    match trimmed {
        "args" => Ok(TemplateComponent::Args),
        "catalog" => Ok(TemplateComponent::Catalog),
        "project" => Ok(TemplateComponent::Project),
        "verb" => Ok(TemplateComponent::VerbName),
        _ => Err(format!("unknown token <{}>", trimmed)),
    }
}

fn non_empty(name: &str, token: &str) -> Result<String, String> {
    if name.is_empty() {
        Err(format!("token <{}> needs a name", token))
    } else {
        Ok(name.to_string())
    }
}

fn tokenize_all(items: &[String]) -> Result<Vec<Template>, String> {
    items.iter().map(|s| tokenize_string(s)).collect()
}

fn tokenize_opt(item: Option<&String>) -> Result<Option<Template>, String> {
    item.map(|s| tokenize_string(s)).transpose()
}

fn compile_step(step: &TomlStep) -> Result<Step, String> {
    Ok(match step {
        TomlStep::Shell(argv) => {
            let Some((first, rest)) = argv.split_first() else {
                return Err("a shell step needs a command".to_string());
            };
            // A leading `-` on the program tolerates a non-zero exit status.
            let (program, ignore_errors) = match first.strip_prefix('-') {
                Some(p) if !p.is_empty() => (p.to_string(), true),
                _ => (first.clone(), false),
            };
            let mut templates = vec![tokenize_string(&program)?];
            templates.extend(tokenize_all(rest)?);
            Step::Shell {
                argv: templates,
                ignore_errors,
            }
        }
        TomlStep::Java(java) => Step::Java {
            class: tokenize_string(&java.class)?,
            args: tokenize_all(&java.args)?,
            java_opts: tokenize_all(&java.java_opts)?,
            classpath: tokenize_opt(java.classpath.as_ref())?,
            remote_debug: tokenize_opt(java.remote_debug.as_ref())?,
        },
        TomlStep::Javac(javac) => {
            if javac.sources.is_empty() {
                return Err("a javac step needs at least one source".to_string());
            }
            Step::Javac {
                outdir: tokenize_string(&javac.outdir)?,
                sources: tokenize_all(&javac.sources)?,
            }
        }
        TomlStep::Call(call) => Step::Call {
            verb: tokenize_string(&call.verb)?,
            args: tokenize_all(&call.args)?,
            classpath: tokenize_opt(call.classpath.as_ref())?,
        },
        TomlStep::Go(args) => Step::Go(tokenize_all(args)?),
        TomlStep::Echo(text) => Step::Echo(tokenize_string(text)?),
        TomlStep::Mkdir(dir) => Step::Mkdir(tokenize_string(dir)?),
        TomlStep::Help(help) => Step::Help {
            names: tokenize_all(&help.names)?,
            all: help.all,
        },
        TomlStep::Abort(messages) => Step::Abort(tokenize_all(messages)?),
    })
}

/// Checks flag syntax, duplicates and defaults of a verb's options.
pub fn validate_options(options: &[OptionSpec]) -> Result<(), String> {
    let mut flags = HashSet::new();
    let mut dests = HashSet::new();
    for option in options {
        if option.dest.is_empty() {
            return Err("an option has an empty dest".to_string());
        }
        if option.dest.starts_with("__") {
            return Err(format!("dest \"{}\" is reserved", option.dest));
        }
        if option.short.is_none() && option.long.is_none() {
            return Err(format!("option \"{}\" needs a short or long flag", option.dest));
        }
        if option.short.is_some() && option.short_char().is_none() {
            return Err(format!(
                "option \"{}\" has an invalid short flag (expected -X)",
                option.dest
            ));
        }
        if option.long.is_some() && option.long_name().is_none() {
            return Err(format!(
                "option \"{}\" has an invalid long flag (expected --name)",
                option.dest
            ));
        }
        for flag in option.short.iter().chain(option.long.iter()) {
            if !flags.insert(flag.clone()) {
                return Err(format!("flag {} is declared twice", flag));
            }
        }
        if !dests.insert(option.dest.clone()) {
            return Err(format!("dest \"{}\" is declared twice", option.dest));
        }
        if let (OptionKind::Boolean, Some(default)) = (option.kind, &option.default) {
            return Err(format!(
                "boolean option \"{}\" cannot have a default (\"{}\"); it is false unless given",
                option.dest, default
            ));
        }
        if let (OptionKind::Integer, Some(default)) = (option.kind, &option.default)
            && default.parse::<i64>().is_err()
        {
            return Err(format!(
                "option \"{}\" has a non-integer default \"{}\"",
                option.dest, default
            ));
        }
    }
    Ok(())
}

fn compile_verb(toml_verb: TomlVerb) -> Result<CompiledVerb, String> {
    if toml_verb.name.is_empty() || toml_verb.name.contains('.') || toml_verb.name.starts_with('-')
    {
        return Err("verb names must be non-empty, without '.' and not start with '-'".to_string());
    }
    validate_options(&toml_verb.options)?;

    let mut steps = toml_verb
        .steps
        .iter()
        .map(compile_step)
        .collect::<Result<Vec<_>, _>>()?;
    if steps.is_empty() {
        // Without steps a verb runs its default action with all of its arguments.
        steps.push(Step::Go(vec![vec![TemplateComponent::Args]]));
    }

    Ok(CompiledVerb {
        name: toml_verb.name,
        spec: CliSpec {
            description: toml_verb.description,
            usage: toml_verb.usage,
            options: toml_verb.options,
            description2: toml_verb.description2,
            base_verb: toml_verb.base_verb,
        },
        classpath: toml_verb.classpath,
        java_class: toml_verb.java_class,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Tokenizer Tests ---

    #[test]
    fn test_tokenizer_handles_escaped_tokens_and_merges_literals() {
        let components = tokenize_string(r"a \<args> b").unwrap();
        assert_eq!(components, vec![TemplateComponent::Literal("a <args> b".to_string())]);
    }

    #[test]
    fn test_tokenizer_with_all_tokens() {
        let components =
            tokenize_string("<args>|<args::2>|<opts::out>|<config::volt.x>|<catalog>|<project>|<verb>")
                .unwrap();
        assert_eq!(
            components,
            vec![
                TemplateComponent::Args,
                TemplateComponent::Literal("|".to_string()),
                TemplateComponent::Arg(2),
                TemplateComponent::Literal("|".to_string()),
                TemplateComponent::Opt("out".to_string()),
                TemplateComponent::Literal("|".to_string()),
                TemplateComponent::Config("volt.x".to_string()),
                TemplateComponent::Literal("|".to_string()),
                TemplateComponent::Catalog,
                TemplateComponent::Literal("|".to_string()),
                TemplateComponent::Project,
                TemplateComponent::Literal("|".to_string()),
                TemplateComponent::VerbName,
            ]
        );
    }

    #[test]
    fn test_tokenizer_rejects_unknown_tokens() {
        assert!(tokenize_string("<nope>").is_err());
        assert!(tokenize_string("<args::x>").is_err());
        assert!(tokenize_string("<opts::>").is_err());
    }

    // --- Unit Compilation Tests ---

    #[test]
    fn test_compile_unit_with_options_and_steps() {
        let text = r#"
uses = ["VoltTable"]

[[verb]]
name = "compile"
description = "Compile the catalog."
usage = "PROJECT"
classpath = "extra.jar"

[[verb.option]]
short = "-o"
long = "--output"
dest = "output"
kind = "string"
help = "output jar"

steps = [
    { shell = ["-rm", "-f", "<opts::output>"] },
    { call = { verb = "voltadmin.status" } },
    { help = { all = true } },
]
"#;
        // `steps` after an array of tables belongs to the last table, which is the option.
        // Units therefore list `steps` before any `[[verb.option]]` block.
        assert!(compile_unit(text, "bad.toml").is_err());

        let text = r#"
uses = ["VoltTable"]

[[verb]]
name = "compile"
description = "Compile the catalog."
usage = "PROJECT"
classpath = "extra.jar"
steps = [
    { shell = ["-rm", "-f", "<opts::output>"] },
    { call = { verb = "voltadmin.status" } },
    { help = { all = true } },
]

[[verb.option]]
short = "-o"
long = "--output"
dest = "output"
kind = "string"
help = "output jar"
"#;
        let unit = compile_unit(text, "compile.toml").unwrap();
        assert_eq!(unit.uses, vec!["VoltTable".to_string()]);
        assert_eq!(unit.verbs.len(), 1);
        let verb = &unit.verbs[0];
        assert_eq!(verb.name, "compile");
        assert_eq!(verb.spec.options.len(), 1);
        assert_eq!(verb.classpath.as_deref(), Some("extra.jar"));
        assert_eq!(verb.steps.len(), 3);
        match &verb.steps[0] {
            Step::Shell {
                argv,
                ignore_errors,
            } => {
                assert!(*ignore_errors);
                assert_eq!(argv[0], vec![TemplateComponent::Literal("rm".to_string())]);
                assert_eq!(argv[2], vec![TemplateComponent::Opt("output".to_string())]);
            }
            other => panic!("unexpected step: {:?}", other),
        }
        assert!(matches!(verb.steps[2], Step::Help { all: true, .. }));
    }

    #[test]
    fn test_verb_without_steps_defaults_to_go() {
        let unit = compile_unit(
            "[[verb]]\nname = \"start\"\njava_class = \"org.voltdb.VoltDB\"\n",
            "start.toml",
        )
        .unwrap();
        assert_eq!(unit.verbs[0].java_class.as_deref(), Some("org.voltdb.VoltDB"));
        assert_eq!(
            unit.verbs[0].steps,
            vec![Step::Go(vec![vec![TemplateComponent::Args]])]
        );
    }

    #[test]
    fn test_toml_error_names_the_unit() {
        let err = compile_unit("[[verb]]\nname = ", "broken.toml").unwrap_err();
        assert!(matches!(err, CompilerError::TomlParse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = compile_unit("[[verb]]\nname = \"x\"\ncolour = \"red\"\n", "x.toml").unwrap_err();
        assert!(matches!(err, CompilerError::TomlParse { .. }));
    }

    #[test]
    fn test_invalid_verb_name() {
        let err = compile_unit("[[verb]]\nname = \"a.b\"\n", "x.toml").unwrap_err();
        assert!(matches!(err, CompilerError::Invalid { .. }));
    }

    #[test]
    fn test_boolean_default_names_the_unit() {
        let text = "[[verb]]\nname = \"x\"\n\n[[verb.option]]\nshort = \"-q\"\ndest = \"quiet\"\ndefault = \"true\"\n";
        let err = compile_unit(text, "quiet.toml").unwrap_err();
        assert!(matches!(err, CompilerError::Invalid { .. }));
        assert!(err.to_string().contains("quiet.toml"));
    }

    #[test]
    fn test_empty_shell_step() {
        let err = compile_unit("[[verb]]\nname = \"x\"\nsteps = [{ shell = [] }]\n", "x.toml")
            .unwrap_err();
        assert!(err.to_string().contains("shell step"));
    }

    #[test]
    fn test_java_and_javac_steps() {
        let text = r#"
[[verb]]
name = "build"
steps = [
    { javac = { outdir = "obj", sources = ["<args>"] } },
    { java = { class = "Main", remote_debug = "<opts::port>" } },
]
"#;
        let unit = compile_unit(text, "build.toml").unwrap();
        let steps = &unit.verbs[0].steps;
        assert_eq!(
            steps[0],
            Step::Javac {
                outdir: vec![TemplateComponent::Literal("obj".to_string())],
                sources: vec![vec![TemplateComponent::Args]],
            }
        );
        match &steps[1] {
            Step::Java { remote_debug, .. } => {
                assert_eq!(remote_debug, &Some(vec![TemplateComponent::Opt("port".to_string())]));
            }
            other => panic!("unexpected step: {:?}", other),
        }

        let err = compile_unit(
            "[[verb]]\nname = \"x\"\nsteps = [{ javac = { outdir = \"obj\" } }]\n",
            "x.toml",
        )
        .unwrap_err();
        assert!(err.to_string().contains("javac step"));
    }

    // --- Option Validation Tests ---

    #[test]
    fn test_validate_options_rejects_bad_flags_and_duplicates() {
        let bad_short = OptionSpec::boolean("-ab", "", "x", "");
        assert!(validate_options(&[bad_short]).is_err());

        let bad_long = OptionSpec::boolean("", "-x", "x", "");
        assert!(validate_options(&[bad_long]).is_err());

        let duplicate = [
            OptionSpec::boolean("-f", "--force", "force", ""),
            OptionSpec::boolean("-f", "--fast", "fast", ""),
        ];
        assert!(validate_options(&duplicate).is_err());

        let bad_default = OptionSpec::integer("-n", "--count", "count", "").with_default("many");
        assert!(validate_options(&[bad_default]).is_err());

        let flag_default = OptionSpec::boolean("-q", "--quiet", "quiet", "").with_default("true");
        let err = validate_options(&[flag_default]).unwrap_err();
        assert!(err.contains("quiet"));

        let good = [
            OptionSpec::boolean("-f", "--force", "force", ""),
            OptionSpec::integer("", "--count", "count", "").with_default("3"),
        ];
        assert!(validate_options(&good).is_ok());
    }
}
