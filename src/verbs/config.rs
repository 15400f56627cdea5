// src/verbs/config.rs

use crate::{
    constants::CONFIG_KEY_NAMESPACE,
    core::{namespace::VerbDecorators, runner::VerbRunner, utility},
    models::{CliSpec, VerbBody},
};
use anyhow::Result;

/// Registers the `config` verb.
pub fn register(decorators: &mut VerbDecorators<'_>) -> Result<()> {
    decorators.command(
        "config",
        CliSpec {
            description: "Configure project settings.".to_string(),
            usage: "KEY=VALUE ...".to_string(),
            ..Default::default()
        },
        VerbBody::Native(config),
    )
}

/// Splits `KEY=VALUE`, trimming both sides. Bare keys go under `volt.`.
fn parse_assignment(arg: &str) -> Option<(String, String)> {
    let (key, value) = arg.split_once('=')?;
    let key = key.trim();
    let key = if key.contains('.') {
        key.to_string()
    } else {
        format!("{}.{}", CONFIG_KEY_NAMESPACE, key)
    };
    Some((key, value.trim().to_string()))
}

fn config(runner: &mut VerbRunner<'_>) -> Result<()> {
    if runner.args.is_empty() {
        return Err(utility::abort(["At least one argument is required."]));
    }
    let bad: Vec<&String> = runner.args.iter().filter(|a| !a.contains('=')).collect();
    if !bad.is_empty() {
        let mut messages = vec!["Bad arguments (must be KEY=VALUE format):".to_string()];
        messages.extend(utility::indented(bad));
        return Err(utility::abort(messages));
    }

    let assignments: Vec<(String, String)> =
        runner.args.iter().filter_map(|a| parse_assignment(a)).collect();
    for (key, value) in assignments {
        runner.config.set_local(&key, &value)?;
        utility::info(format!("Configuration: {}={}", key, value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_keys_get_the_volt_prefix() {
        assert_eq!(
            parse_assignment("catalog = my.jar"),
            Some(("volt.catalog".to_string(), "my.jar".to_string()))
        );
        assert_eq!(
            parse_assignment("other.key=a=b"),
            Some(("other.key".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_assignment("novalue"), None);
    }
}
