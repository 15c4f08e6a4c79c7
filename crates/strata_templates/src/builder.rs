//! The public entry point: register a group, ad-hoc templates and variables,
//! then build.

use indexmap::IndexMap;
use tracing::info;

use crate::build::{Build, BuildData, BuildDiff, Inspection};
use crate::error::TemplateResult;
use crate::model::{Template, TemplateGroup, Variable};
use crate::resolver::DependencyResolver;
use crate::structure::{Structure, StructureAssembler};

/// Options for a single build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Group output by template category instead of returning a flat list.
    pub group_by_category: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            group_by_category: true,
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by_category(mut self, group_by_category: bool) -> Self {
        self.group_by_category = group_by_category;
        self
    }

    pub fn flat() -> Self {
        Self::default().group_by_category(false)
    }
}

/// Fluent template builder.
///
/// Registration methods may be called in any order and replace earlier
/// registrations with the same name. Building only reads the registered
/// state, so the builder can be reconfigured and built again.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    group: Option<TemplateGroup>,
    user_templates: IndexMap<String, Template>,
    user_variables: IndexMap<String, Variable>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the root group, replacing any previous one.
    pub fn set_group(mut self, group: TemplateGroup) -> Self {
        self.group = Some(group);
        self
    }

    /// Register an ad-hoc template, merged after the group's templates.
    pub fn add_user_template(mut self, template: Template) -> Self {
        self.user_templates.insert(template.key(), template);
        self
    }

    /// Register a variable that overrides every template and group variable.
    pub fn add_user_variable(mut self, variable: Variable) -> Self {
        self.user_variables.insert(variable.key(), variable);
        self
    }

    pub fn group(&self) -> Option<&TemplateGroup> {
        self.group.as_ref()
    }

    pub fn user_templates(&self) -> impl Iterator<Item = &Template> {
        self.user_templates.values()
    }

    pub fn user_variables(&self) -> impl Iterator<Item = &Variable> {
        self.user_variables.values()
    }

    /// Assemble the merged structure without substituting anything.
    pub fn structure(&self) -> TemplateResult<Structure> {
        StructureAssembler::new(self.group.as_ref())
            .with_user_templates(self.user_templates.values())
            .with_user_variables(self.user_variables.values())
            .assemble()
    }

    /// Distinct categories of the merged templates.
    pub fn categories(&self) -> TemplateResult<Vec<String>> {
        let structure = self.structure()?;
        Ok(structure.categories().into_iter().map(String::from).collect())
    }

    /// Build with default options (grouped by category).
    pub fn build(&self) -> TemplateResult<Build> {
        self.build_with(BuildOptions::default())
    }

    pub fn build_with(&self, options: BuildOptions) -> TemplateResult<Build> {
        let structure = self.structure()?;

        let items = {
            let mut resolver = DependencyResolver::new(&structure);
            resolver.check_required()?;
            resolver.check_cycles()?;

            structure
                .items()
                .iter()
                .map(|item| resolver.render(item))
                .collect::<TemplateResult<Vec<_>>>()?
        };

        let data = if options.group_by_category {
            BuildData::grouped(items)
        } else {
            BuildData::flat(items)
        };

        info!(
            "Built {} item(s) in {} categor{}",
            data.len(),
            data.categories().len(),
            if data.categories().len() == 1 { "y" } else { "ies" }
        );

        Ok(Build::new(data, structure))
    }

    /// Provenance of every element of `build`.
    pub fn inspect(&self, build: &Build) -> Vec<Inspection> {
        build.inspect()
    }

    /// Difference between two builds, `before` to `after`.
    pub fn diff(&self, before: &Build, after: &Build) -> BuildDiff {
        before.diff(after)
    }
}
