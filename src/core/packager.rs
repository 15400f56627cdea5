//! # Packager
//!
//! Writes a verbspace and the support library into one self-executing archive.
//! The archive starts with a `#!` line naming the runtime, so on unix it runs
//! directly; elsewhere it must be started as `voltcli <package>`. Its `__main__`
//! entry records which command to boot, and `lib/` mirrors the library tree.

use crate::{
    constants::{
        PACKAGE_BOOTSTRAP_ENTRY, PACKAGE_EXCLUDES, PACKAGE_LIB_DIR, PACKAGE_PREAMBLE,
        RUNTIME_NAME,
    },
    core::{bundle::BundleWriter, environment::Environment, utility},
    models::Bootstrap,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Creates the package `output_dir/name`.
pub fn create_package(
    env: &Environment,
    output_dir: &Path,
    name: &str,
    version: &str,
    description: &str,
    force: bool,
) -> Result<PathBuf> {
    let output_path = output_dir.join(name);
    utility::info(format!(
        "Creating compressed executable program: {}",
        output_path.display()
    ));
    let mut writer = BundleWriter::open(&output_path, force, PACKAGE_PREAMBLE, PACKAGE_EXCLUDES)?;

    let bootstrap = Bootstrap {
        name: name.to_string(),
        version: version.to_string(),
        description: description.to_string(),
        package: true,
    };
    let bootstrap = toml::to_string(&bootstrap).context("Failed to generate package bootstrap.")?;
    writer.add_file_from_string(&bootstrap, PACKAGE_BOOTSTRAP_ENTRY);

    let added = if env.lib_dir.is_dir() {
        writer.add_directory(&env.lib_dir, PACKAGE_LIB_DIR)?
    } else if let Some(bundle) = &env.bundle {
        // Repackaging from a package whose library only exists inside it.
        writer.add_bundle_tree(bundle, &format!("{}/", PACKAGE_LIB_DIR))
    } else {
        log::warn!(
            "Library directory '{}' does not exist; the package holds no verb units.",
            env.lib_dir.display()
        );
        0
    };
    log::debug!("Packaged {} library file(s) for \"{}\".", added, name);

    let path = writer.close(true)?;
    if !cfg!(unix) {
        utility::warning(&[
            "Generated packages cannot be started directly on this platform.".to_string(),
            format!("Run it as \"{} {}\".", RUNTIME_NAME, path.display()),
        ]);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::Bundle;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_package_contains_bootstrap_and_library() {
        let lib = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(lib.path().join("volt.d")).unwrap();
        fs::write(lib.path().join("volt.d").join("a.toml"), "[[verb]]\nname = \"a\"\n").unwrap();
        fs::write(lib.path().join("volt.d").join("a.bin"), b"x").unwrap();
        let env = Environment::with_lib_dir("volt", "2.1", lib.path(), out.path());

        let path = create_package(&env, out.path(), "volt", "2.1", "Volt tools", false).unwrap();
        assert_eq!(path, out.path().join("volt"));

        let bundle = Bundle::open(&path).unwrap();
        let bootstrap = bundle.bootstrap().unwrap();
        assert_eq!(bootstrap.name, "volt");
        assert_eq!(bootstrap.version, "2.1");
        assert_eq!(bootstrap.description, "Volt tools");
        assert!(bootstrap.package);
        assert!(bundle.file("lib/volt.d/a.toml").is_some());
        assert!(bundle.file("lib/volt.d/a.bin").is_none());
    }

    #[test]
    fn test_repackaging_from_a_package() {
        let lib = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(lib.path().join("volt.d")).unwrap();
        fs::write(lib.path().join("volt.d").join("a.toml"), "[[verb]]\nname = \"a\"\n").unwrap();
        let env = Environment::with_lib_dir("volt", "1", lib.path(), out.path());
        let first = create_package(&env, out.path(), "volt", "1", "d", false).unwrap();

        let mut packaged = Environment::with_lib_dir("volt", "1", &out.path().join("missing"), out.path());
        packaged.bundle = Some(Bundle::open(&first).unwrap());
        let second_dir = out.path().join("second");
        let second = create_package(&packaged, &second_dir, "volt", "1", "d", false).unwrap();
        assert!(Bundle::open(&second).unwrap().file("lib/volt.d/a.toml").is_some());
    }
}
