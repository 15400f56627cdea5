// EN: src/cli/preprocess.rs

use crate::models::{OptionKind, OptionSpec, OptionValue, VerbOptions};

/// Scans argv for the global flags only, before any verb is known.
///
/// Scanning stops at the first token that is not a flag (the verb) or at `--`.
/// Unknown flags are ignored here; the full parse reports them later.
#[derive(Debug, Clone)]
pub struct CommandPreprocessor<'s> {
    options: &'s [OptionSpec],
}

impl<'s> CommandPreprocessor<'s> {
    /// Scans for `options` only.
    pub fn new(options: &'s [OptionSpec]) -> Self {
        Self { options }
    }

    /// Returns the value of every option, `false`/unset when absent.
    pub fn preprocess(&self, args: &[String]) -> VerbOptions {
        let mut values = VerbOptions::default();
        for option in self.options {
            if option.kind == OptionKind::Boolean {
                values.insert(option.dest.clone(), OptionValue::Bool(false));
            }
        }

        for arg in args {
            if arg == "--" || !arg.starts_with('-') || arg == "-" {
                break;
            }
            if arg.starts_with("--") {
                self.set_flag(&mut values, arg);
            } else if let Some(group) = arg.strip_prefix('-') {
                // Grouped short flags, e.g. `-vd`.
                for c in group.chars() {
                    self.set_flag(&mut values, &format!("-{}", c));
                }
            }
        }
        values
    }

    fn set_flag(&self, values: &mut VerbOptions, flag: &str) {
        match self
            .options
            .iter()
            .find(|o| o.kind == OptionKind::Boolean && o.matches_flag(flag))
        {
            Some(option) => values.insert(option.dest.clone(), OptionValue::Bool(true)),
            None => log::trace!("Pre-scan ignores flag '{}'.", flag),
        }
    }

    /// The value of the option named by either flag, if it was seen.
    pub fn get_option(&self, values: &VerbOptions, short: &str, long: &str) -> bool {
        self.options
            .iter()
            .find(|o| o.matches_flag(short) || o.matches_flag(long))
            .is_some_and(|o| values.get_bool(&o.dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::base_cli_spec;
    use crate::models::BaseFlags;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_verbose_before_verb() {
        let spec = base_cli_spec();
        let pre = CommandPreprocessor::new(&spec.options);
        let values = pre.preprocess(&args(&["-v", "help"]));
        assert!(pre.get_option(&values, "-v", "--verbose"));
        assert!(!pre.get_option(&values, "-d", "--debug"));
        assert!(BaseFlags::from_options(&values).verbose);
    }

    #[test]
    fn test_grouped_and_long_flags() {
        let spec = base_cli_spec();
        let pre = CommandPreprocessor::new(&spec.options);
        let flags = BaseFlags::from_options(&pre.preprocess(&args(&["-vd", "--dry-run", "start"])));
        assert!(flags.verbose);
        assert!(flags.debug);
        assert!(flags.dryrun);
        assert!(!flags.pause);
    }

    #[test]
    fn test_flags_after_verb_are_not_global() {
        let spec = base_cli_spec();
        let pre = CommandPreprocessor::new(&spec.options);
        let flags = BaseFlags::from_options(&pre.preprocess(&args(&["start", "-v"])));
        assert!(!flags.verbose);
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        let spec = base_cli_spec();
        let pre = CommandPreprocessor::new(&spec.options);
        let flags = BaseFlags::from_options(&pre.preprocess(&args(&["--bogus", "-p", "x"])));
        assert!(flags.pause);
    }
}
