//! # Verb-Authoring Namespace
//!
//! Every verb unit is loaded with an explicit registration handle,
//! [`VerbDecorators`], instead of ambient globals. The handle exposes a fixed set
//! of declaration methods and gives read access to the [`VoltNamespace`]: option
//! helpers and the names of the data-client types units may rely on.

use crate::{
    core::{compiler, verbspace::VerbSet},
    models::{CliSpec, GoAction, OptionSpec, Verb, VerbBody},
};
use anyhow::{Result, anyhow};

/// Data-client types exposed to verb authors. Units list the ones they use.
pub const CLIENT_SYMBOLS: &[&str] = &[
    "VoltProcedure",
    "VoltResponse",
    "VoltException",
    "VoltTable",
    "VoltColumn",
    "FastSerializer",
];

/// Capabilities shared by every unit of one command. Retained by the verbspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoltNamespace {
    command_name: String,
    client_symbols: &'static [&'static str],
}

impl VoltNamespace {
    /// Namespace for `command_name` exposing the data-client symbols.
    pub fn new(command_name: &str) -> Self {
        Self {
            command_name: command_name.to_string(),
            client_symbols: CLIENT_SYMBOLS,
        }
    }

    /// Command the units belong to.
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// Symbols a unit may list under `uses`.
    pub fn client_symbols(&self) -> &[&'static str] {
        self.client_symbols
    }

    /// True if `name` is a known data-client symbol.
    pub fn has_client_symbol(&self, name: &str) -> bool {
        self.client_symbols.contains(&name)
    }

    /// See [`OptionSpec::boolean`].
    pub fn boolean_option(&self, short: &str, long: &str, dest: &str, help: &str) -> OptionSpec {
        OptionSpec::boolean(short, long, dest, help)
    }

    /// See [`OptionSpec::string`].
    pub fn string_option(&self, short: &str, long: &str, dest: &str, help: &str) -> OptionSpec {
        OptionSpec::string(short, long, dest, help)
    }

    /// See [`OptionSpec::integer`].
    pub fn integer_option(&self, short: &str, long: &str, dest: &str, help: &str) -> OptionSpec {
        OptionSpec::integer(short, long, dest, help)
    }
}

/// The registration handle passed to each unit while it loads.
#[derive(Debug)]
pub struct VerbDecorators<'v> {
    namespace: &'v VoltNamespace,
    verbs: &'v mut VerbSet,
    origin: String,
}

impl<'v> VerbDecorators<'v> {
    /// A handle registering into `verbs`.
    pub fn new(namespace: &'v VoltNamespace, verbs: &'v mut VerbSet) -> Self {
        Self {
            namespace,
            verbs,
            origin: String::new(),
        }
    }

    /// Records where the verbs declared next come from.
    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = origin.into();
    }

    /// The namespace shared by the command's units.
    pub fn namespace(&self) -> &VoltNamespace {
        self.namespace
    }

    /// Declares a verb.
    pub fn command(&mut self, name: &str, spec: CliSpec, body: VerbBody) -> Result<()> {
        self.declare(name, spec, None, None, body)
    }

    /// Declares a verb listed among the common verbs in full help.
    pub fn base_command(&mut self, name: &str, mut spec: CliSpec, body: VerbBody) -> Result<()> {
        spec.base_verb = true;
        self.declare(name, spec, None, None, body)
    }

    /// Declares a verb whose default action runs `java_class`.
    pub fn java_command(
        &mut self,
        name: &str,
        spec: CliSpec,
        java_class: &str,
        classpath: Option<String>,
        body: VerbBody,
    ) -> Result<()> {
        let go = GoAction::Java {
            class: java_class.to_string(),
        };
        self.declare(name, spec, classpath, Some(go), body)
    }

    /// Declares a verb with a classpath fragment but no default action.
    pub fn command_with_classpath(
        &mut self,
        name: &str,
        spec: CliSpec,
        classpath: Option<String>,
        body: VerbBody,
    ) -> Result<()> {
        self.declare(name, spec, classpath, None, body)
    }

    fn declare(
        &mut self,
        name: &str,
        spec: CliSpec,
        classpath: Option<String>,
        go_default: Option<GoAction>,
        body: VerbBody,
    ) -> Result<()> {
        compiler::validate_options(&spec.options)
            .map_err(|m| anyhow!("Verb \"{}\" in '{}': {}", name, self.origin, m))?;
        self.verbs.insert(Verb {
            name: name.to_string(),
            cli_spec: spec,
            classpath: classpath.filter(|cp| !cp.is_empty()),
            go_default,
            body,
            origin: self.origin.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Step, TemplateComponent};

    fn script() -> VerbBody {
        VerbBody::Script(vec![Step::Echo(vec![TemplateComponent::Literal("hi".into())])])
    }

    #[test]
    fn test_namespace_exposes_client_symbols() {
        let ns = VoltNamespace::new("volt");
        assert_eq!(ns.command_name(), "volt");
        assert!(ns.has_client_symbol("VoltTable"));
        assert!(ns.has_client_symbol("FastSerializer"));
        assert!(!ns.has_client_symbol("Socket"));
        assert_eq!(ns.client_symbols().len(), 6);
    }

    #[test]
    fn test_decorators_register_verbs_with_origin() {
        let ns = VoltNamespace::new("volt");
        let mut verbs = VerbSet::default();
        let mut decorators = VerbDecorators::new(&ns, &mut verbs);
        decorators.set_origin("unit.toml");
        decorators
            .java_command("start", CliSpec::default(), "org.voltdb.VoltDB", Some("x.jar".into()), script())
            .unwrap();
        decorators.base_command("status", CliSpec::default(), script()).unwrap();

        let start = verbs.get("start").unwrap();
        assert_eq!(start.origin, "unit.toml");
        assert_eq!(start.classpath.as_deref(), Some("x.jar"));
        assert_eq!(
            start.go_default,
            Some(GoAction::Java {
                class: "org.voltdb.VoltDB".to_string()
            })
        );
        assert!(verbs.get("status").unwrap().cli_spec.base_verb);
    }

    #[test]
    fn test_decorators_reject_invalid_options() {
        let ns = VoltNamespace::new("volt");
        let mut verbs = VerbSet::default();
        let mut decorators = VerbDecorators::new(&ns, &mut verbs);
        let spec = CliSpec {
            options: vec![ns.boolean_option("-x", "", "", "")],
            ..Default::default()
        };
        assert!(decorators.command("bad", spec, script()).is_err());
        assert!(verbs.is_empty());
    }
}
