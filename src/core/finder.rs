// src/core/finder.rs

use crate::{
    constants::UNIT_EXTENSION,
    core::{
        bundle::Bundle,
        compiler::{self, CompiledUnit},
        namespace::VerbDecorators,
        utility,
    },
    models::VerbBody,
};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Something that declares verbs when loaded.
pub trait VerbUnit {
    /// Where the unit comes from (file path, package entry or built-in name).
    fn origin(&self) -> &str;

    /// Declares the unit's verbs through the registration handle.
    fn register(&self, decorators: &mut VerbDecorators<'_>) -> Result<()>;
}

/// A verb unit compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct NativeUnit {
    /// The command whose verbspace the unit belongs to.
    pub command: &'static str,
    /// Shown as the origin of its verbs.
    pub origin: &'static str,
    /// Adds the unit's verbs.
    pub register: fn(&mut VerbDecorators<'_>) -> Result<()>,
}

impl VerbUnit for NativeUnit {
    fn origin(&self) -> &str {
        self.origin
    }

    fn register(&self, decorators: &mut VerbDecorators<'_>) -> Result<()> {
        (self.register)(decorators)
    }
}

/// A `*.toml` verb unit.
#[derive(Debug, Clone)]
pub struct ScriptUnit {
    origin: String,
    compiled: CompiledUnit,
}

impl ScriptUnit {
    /// Compiles `text`; errors name `origin`.
    pub fn from_source(text: &str, origin: &str) -> Result<Self> {
        let compiled = compiler::compile_unit(text, origin)
            .map_err(|e| utility::abort([e.to_string()]))?;
        Ok(Self {
            origin: origin.to_string(),
            compiled,
        })
    }
}

impl VerbUnit for ScriptUnit {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn register(&self, decorators: &mut VerbDecorators<'_>) -> Result<()> {
        let unknown: Vec<&String> = self
            .compiled
            .uses
            .iter()
            .filter(|symbol| !decorators.namespace().has_client_symbol(symbol))
            .collect();
        if !unknown.is_empty() {
            let mut messages = vec![format!(
                "Verb unit '{}' uses unknown client symbol(s):",
                self.origin
            )];
            messages.extend(utility::indented(unknown));
            return Err(utility::abort(messages));
        }

        for verb in &self.compiled.verbs {
            let body = VerbBody::Script(verb.steps.clone());
            match &verb.java_class {
                Some(class) => decorators.java_command(
                    &verb.name,
                    verb.spec.clone(),
                    class,
                    verb.classpath.clone(),
                    body,
                )?,
                None => decorators.command_with_classpath(
                    &verb.name,
                    verb.spec.clone(),
                    verb.classpath.clone(),
                    body,
                )?,
            }
        }
        Ok(())
    }
}

/// Finds script units in directories and package resource locations.
#[derive(Debug, Default)]
pub struct VerbSourceFinder<'b> {
    paths: Vec<PathBuf>,
    resources: Vec<(&'b Bundle, String)>,
}

fn is_unit_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == UNIT_EXTENSION)
}

impl<'b> VerbSourceFinder<'b> {
    /// An empty finder.
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Adds a `<command>.d` directory. Missing directories are skipped when searching.
    pub fn add_path(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Adds a location inside a package, e.g. `lib/volt.d`.
    pub fn add_resource(&mut self, bundle: &'b Bundle, location: &str) {
        self.resources
            .push((bundle, format!("{}/", location.trim_end_matches('/'))));
    }

    /// Reads every unit in search order. Missing or unreadable directories are skipped.
    pub fn search(&self) -> Result<Vec<ScriptUnit>> {
        let mut units = Vec::new();
        for dir in &self.paths {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::debug!("Skipping verb directory '{}': {}", dir.display(), e);
                    continue;
                }
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .filter(|path| path.file_name().is_some_and(|n| is_unit_name(&n.to_string_lossy())))
                .collect();
            files.sort();
            for file in files {
                let origin = file.display().to_string();
                let text = fs::read_to_string(&file).map_err(|e| {
                    utility::abort([format!("Failed to read verb unit '{}': {}", origin, e)])
                })?;
                units.push(ScriptUnit::from_source(&text, &origin)?);
            }
        }

        for (bundle, location) in &self.resources {
            for (path, data) in bundle.entries_under(location) {
                // Only direct children of the location, like a directory scan.
                let Some(name) = path.strip_prefix(location.as_str()) else {
                    continue;
                };
                if name.contains('/') || !is_unit_name(name) {
                    continue;
                }
                let origin = format!("{}:{}", bundle.path().display(), path);
                let text = String::from_utf8_lossy(data);
                units.push(ScriptUnit::from_source(&text, &origin)?);
            }
        }
        Ok(units)
    }

    /// Loads every unit found into `decorators`, in search order.
    pub fn search_and_load(&self, decorators: &mut VerbDecorators<'_>) -> Result<usize> {
        let units = self.search()?;
        for unit in &units {
            log::debug!("Loading verb unit '{}'", unit.origin());
            decorators.set_origin(unit.origin());
            unit.register(decorators)?;
        }
        Ok(units.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{namespace::VoltNamespace, verbspace::VerbSet};
    use tempfile::tempdir;

    fn load(finder: &VerbSourceFinder<'_>) -> Result<VerbSet> {
        let namespace = VoltNamespace::new("volt");
        let mut verbs = VerbSet::default();
        let mut decorators = VerbDecorators::new(&namespace, &mut verbs);
        finder.search_and_load(&mut decorators)?;
        Ok(verbs)
    }

    #[test]
    fn test_missing_directories_are_skipped() {
        let mut finder = VerbSourceFinder::new();
        finder.add_path(PathBuf::from("no/such/dir/volt.d"));
        assert!(load(&finder).unwrap().is_empty());
    }

    #[test]
    fn test_units_load_in_file_name_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), "[[verb]]\nname = \"x\"\ndescription = \"from b\"\n").unwrap();
        fs::write(dir.path().join("a.toml"), "[[verb]]\nname = \"x\"\ndescription = \"from a\"\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a unit").unwrap();

        let mut finder = VerbSourceFinder::new();
        finder.add_path(dir.path().to_path_buf());
        let verbs = load(&finder).unwrap();
        assert_eq!(verbs.len(), 1);
        assert_eq!(verbs.get("x").unwrap().cli_spec.description, "from b");
    }

    #[test]
    fn test_malformed_unit_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.toml"), "[[verb]\n").unwrap();
        let mut finder = VerbSourceFinder::new();
        finder.add_path(dir.path().to_path_buf());
        let err = load(&finder).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_unknown_client_symbol_is_fatal() {
        let unit = ScriptUnit::from_source("uses = [\"Nope\"]\n", "u.toml").unwrap();
        let namespace = VoltNamespace::new("volt");
        let mut verbs = VerbSet::default();
        let mut decorators = VerbDecorators::new(&namespace, &mut verbs);
        let err = unit.register(&mut decorators).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_native_unit_registers_through_handle() {
        fn register(decorators: &mut VerbDecorators<'_>) -> Result<()> {
            decorators.command("native", Default::default(), VerbBody::Script(Vec::new()))
        }
        let unit = NativeUnit {
            command: "volt",
            origin: "builtin:native",
            register,
        };
        let namespace = VoltNamespace::new("volt");
        let mut verbs = VerbSet::default();
        let mut decorators = VerbDecorators::new(&namespace, &mut verbs);
        decorators.set_origin(unit.origin());
        unit.register(&mut decorators).unwrap();
        assert_eq!(verbs.get("native").unwrap().origin, "builtin:native");
    }
}
