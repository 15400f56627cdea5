//! # Verb Registry
//!
//! Builds a [`VerbSpace`]: the complete, versioned set of verbs for one command.
//!
//! Units are loaded in a fixed precedence chain, lowest first:
//!
//! 1. native units compiled into the binary for the command,
//! 2. `<lib_dir>/<command>.d/`,
//! 3. `<command_dir>/<command>.d/` (the invoking script's directory),
//! 4. `<cwd>/<command>.d/`,
//! 5. `lib/<command>.d/` inside the running package, if any.
//!
//! A later declaration of a verb name replaces the earlier one (last registration
//! wins) but keeps the earlier position in help order. `help` and `package` are
//! added afterwards if nothing declared them.

use crate::{
    constants::{PACKAGE_LIB_DIR, VERBS_SUBDIR_SUFFIX},
    core::{
        bundle::{Bundle, join_entry},
        environment::Environment,
        finder::{VerbSourceFinder, VerbUnit},
        namespace::{VerbDecorators, VoltNamespace},
    },
    models::Verb,
    verbs,
};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Internal verbspaces keyed by command name.
pub type VerbSpaces = BTreeMap<String, VerbSpace>;

/// Verbs in declaration order with unique names.
#[derive(Debug, Clone, Default)]
pub struct VerbSet {
    verbs: Vec<Verb>,
}

impl VerbSet {
    /// Adds `verb`, replacing (in place) any verb with the same name.
    /// Returns the replaced verb.
    pub fn insert(&mut self, verb: Verb) -> Option<Verb> {
        match self.verbs.iter_mut().find(|v| v.name == verb.name) {
            Some(slot) => {
                log::debug!(
                    "Verb \"{}\" from '{}' overrides the one from '{}'.",
                    verb.name,
                    verb.origin,
                    slot.origin
                );
                Some(std::mem::replace(slot, verb))
            }
            None => {
                self.verbs.push(verb);
                None
            }
        }
    }

    /// The verb called `name`.
    pub fn get(&self, name: &str) -> Option<&Verb> {
        self.verbs.iter().find(|v| v.name == name)
    }

    /// True if a verb called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Verbs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Verb> {
        self.verbs.iter()
    }

    /// Verb names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.verbs.iter().map(|v| v.name.as_str())
    }

    /// Number of verbs.
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    /// True if there are no verbs.
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

/// The complete set of verbs for one command, plus metadata.
#[derive(Debug, Clone)]
pub struct VerbSpace {
    /// Command name.
    pub name: String,
    /// Version shown by `--version`.
    pub version: String,
    /// One-line description shown in help.
    pub description: String,
    /// The namespace the units were loaded with.
    pub namespace: VoltNamespace,
    verbs: VerbSet,
}

impl VerbSpace {
    /// Assembles a verbspace from loaded verbs.
    pub fn new(
        name: &str,
        version: &str,
        description: &str,
        namespace: VoltNamespace,
        verbs: VerbSet,
    ) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            namespace,
            verbs,
        }
    }

    /// The verb called `name`.
    pub fn verb(&self, name: &str) -> Option<&Verb> {
        self.verbs.get(name)
    }

    /// All verbs.
    pub fn verbs(&self) -> &VerbSet {
        &self.verbs
    }

    /// Verb names in declaration order.
    pub fn verb_names(&self) -> Vec<&str> {
        self.verbs.names().collect()
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Scan roots in load order, without duplicates.
pub fn scan_base_dirs(env: &Environment, command_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = vec![env.lib_dir.clone()];
    for candidate in command_dir.into_iter().chain(std::iter::once(env.cwd.as_path())) {
        if !dirs.iter().any(|d| same_dir(d, candidate)) {
            dirs.push(candidate.to_path_buf());
        }
    }
    dirs
}

/// Builds the verbspace of `command_name`.
pub fn load_verbspace(
    env: &Environment,
    command_name: &str,
    command_dir: Option<&Path>,
    version: &str,
    description: &str,
    package: Option<&Bundle>,
) -> Result<VerbSpace> {
    log::debug!(
        "Loading verbspace for \"{}\" from {:?}...",
        command_name,
        command_dir
    );
    let verbs_subdir = format!("{}{}", command_name, VERBS_SUBDIR_SUFFIX);

    let namespace = VoltNamespace::new(command_name);
    let mut verb_set = VerbSet::default();
    {
        let mut decorators = VerbDecorators::new(&namespace, &mut verb_set);

        for unit in verbs::native_units().iter().filter(|u| u.command == command_name) {
            decorators.set_origin(unit.origin());
            unit.register(&mut decorators)?;
        }

        let mut finder = VerbSourceFinder::new();
        for scan_dir in scan_base_dirs(env, command_dir) {
            finder.add_path(scan_dir.join(&verbs_subdir));
        }
        if let Some(bundle) = package {
            finder.add_resource(bundle, &join_entry(PACKAGE_LIB_DIR, &verbs_subdir));
        }
        let loaded = finder.search_and_load(&mut decorators)?;
        log::debug!("Loaded {} verb unit(s) for \"{}\".", loaded, command_name);
    }

    for builtin in verbs::builtin::standard_verbs() {
        if !verb_set.contains(&builtin.name) {
            verb_set.insert(builtin);
        }
    }

    Ok(VerbSpace::new(
        command_name,
        version,
        description,
        namespace,
        verb_set,
    ))
}
