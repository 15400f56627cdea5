// EN: src/core/interpolator.rs

use crate::{
    constants::CATALOG_CONFIG_KEY,
    core::config::VoltConfig,
    models::{Template, TemplateComponent, VerbOptions},
};
use anyhow::Result;
use std::path::Path;

/// Expands pre-parsed step templates against one verb invocation.
#[derive(Debug, Clone, Copy)]
pub struct Interpolator<'a> {
    verb_name: &'a str,
    args: &'a [String],
    opts: &'a VerbOptions,
    config: &'a VoltConfig,
    project_path: &'a Path,
}

impl<'a> Interpolator<'a> {
    /// Builds an interpolator over parsed arguments and options.
    pub fn new(
        verb_name: &'a str,
        args: &'a [String],
        opts: &'a VerbOptions,
        config: &'a VoltConfig,
        project_path: &'a Path,
    ) -> Self {
        Self {
            verb_name,
            args,
            opts,
            config,
            project_path,
        }
    }

    /// Expands one template into a single string. `<args>` joins with spaces.
    pub fn expand(&self, template: &Template) -> Result<String> {
        let mut out = String::new();
        for component in template {
            match component {
                TemplateComponent::Literal(text) => out.push_str(text),
                TemplateComponent::Args => out.push_str(&self.args.join(" ")),
                TemplateComponent::Arg(index) => {
                    if let Some(arg) = self.args.get(*index) {
                        out.push_str(arg);
                    }
                }
                TemplateComponent::Opt(dest) => {
                    if let Some(value) = self.opts.get(dest) {
                        out.push_str(&value.to_arg_string());
                    }
                }
                TemplateComponent::Config(key) => out.push_str(self.config.get_required(key)?),
                TemplateComponent::Catalog => {
                    out.push_str(self.config.get_required(CATALOG_CONFIG_KEY)?);
                }
                TemplateComponent::Project => out.push_str(&self.project_path.display().to_string()),
                TemplateComponent::VerbName => out.push_str(self.verb_name),
            }
        }
        Ok(out)
    }

    /// Expands an argument list. A template that is exactly `<args>` splices
    /// every positional argument in as separate items.
    pub fn expand_list(&self, templates: &[Template]) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(templates.len());
        for template in templates {
            if matches!(template.as_slice(), [TemplateComponent::Args]) {
                out.extend(self.args.iter().cloned());
            } else {
                out.push(self.expand(template)?);
            }
        }
        Ok(out)
    }

    /// [`expand`](Self::expand) for optional templates.
    pub fn expand_opt(&self, template: Option<&Template>) -> Result<Option<String>> {
        template.map(|t| self.expand(t)).transpose()
    }
}
