//! Structure assembly: merge a group hierarchy and ad-hoc templates into one
//! precedence-resolved view of templates, items and variables.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::model::{Item, Template, TemplateGroup, Variable};
use crate::tree::{fold_by_name, resolve_tree_map};

/// The merged, not yet substituted view of everything a build draws from.
///
/// Earlier entries in each list have lower precedence than later ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structure {
    templates: Vec<Template>,
    items: Vec<Item>,
    variables: Vec<Variable>,
}

impl Structure {
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Get a template by name.
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.key() == name)
    }

    /// Get a variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.key() == name)
    }

    /// Distinct template categories, in template order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for template in &self.templates {
            if !categories.contains(&template.category()) {
                categories.push(template.category());
            }
        }
        categories
    }
}

/// Assembles a [`Structure`] from a root group plus builder-registered
/// templates and variables.
///
/// Precedence, lowest to highest: templates in group-tree order (each
/// template's own tree descendants first), user templates, template
/// variables, group variables, user variables.
pub struct StructureAssembler<'a> {
    group: Option<&'a TemplateGroup>,
    user_templates: Vec<&'a Template>,
    user_variables: Vec<&'a Variable>,
}

impl<'a> StructureAssembler<'a> {
    pub fn new(group: Option<&'a TemplateGroup>) -> Self {
        Self {
            group,
            user_templates: Vec::new(),
            user_variables: Vec::new(),
        }
    }

    pub fn with_user_templates(mut self, templates: impl IntoIterator<Item = &'a Template>) -> Self {
        self.user_templates.extend(templates);
        self
    }

    pub fn with_user_variables(mut self, variables: impl IntoIterator<Item = &'a Variable>) -> Self {
        self.user_variables.extend(variables);
        self
    }

    /// Merge everything into a new structure. Inputs are only read.
    pub fn assemble(&self) -> TemplateResult<Structure> {
        if self.group.is_none() && self.user_templates.is_empty() {
            return Err(TemplateError::Configuration(
                "nothing to build: no template group or user templates registered".to_string(),
            ));
        }

        let groups: Vec<&TemplateGroup> = match self.group {
            Some(group) => resolve_tree_map(group)?.into_values().collect(),
            None => Vec::new(),
        };

        // Templates, in order of precedence. A name met again moves to its
        // later position so its items are merged after everything it outranks.
        let mut templates: IndexMap<String, &Template> = IndexMap::new();
        let sources = groups
            .iter()
            .copied()
            .flat_map(|group| group.templates())
            .chain(self.user_templates.iter().copied());

        for source in sources {
            for (name, template) in resolve_tree_map(source)? {
                if fold_by_name(&mut templates, name.clone(), template) {
                    debug!("Template '{}' overridden", name);
                }
            }
        }

        // Items and template variables
        let mut items: Vec<Item> = Vec::new();
        let mut variables: IndexMap<String, &Variable> = IndexMap::new();

        for template in templates.values() {
            for item in template.items() {
                let existing = template
                    .unique_keys()
                    .and_then(|keys| find_item_index(&items, item, keys.iter()));

                match existing {
                    Some(index) => {
                        debug!(
                            "Replacing {} at position {} with {} from template '{}'",
                            items[index].label(),
                            index,
                            item.label(),
                            template.name()
                        );
                        items[index] = item.clone();
                    }
                    None => items.push(item.clone()),
                }
            }

            for variable in template.variables() {
                record_variable(&mut variables, variable, "template");
            }
        }

        for group in &groups {
            for variable in group.variables() {
                record_variable(&mut variables, variable, "group");
            }
        }

        for variable in self.user_variables.iter().copied() {
            record_variable(&mut variables, variable, "user");
        }

        let structure = Structure {
            templates: templates.into_values().cloned().collect(),
            items,
            variables: variables.into_values().cloned().collect(),
        };

        info!(
            "Assembled structure: {} template(s), {} item(s), {} variable(s)",
            structure.templates.len(),
            structure.items.len(),
            structure.variables.len()
        );

        Ok(structure)
    }
}

fn record_variable<'a>(
    variables: &mut IndexMap<String, &'a Variable>,
    variable: &'a Variable,
    source: &str,
) {
    if variables.insert(variable.key(), variable).is_some() {
        debug!("Variable '{}' overridden by {} variable", variable.name(), source);
    }
}

/// Find the first item whose value matches `item` on every key in `keys`.
///
/// Returns `None` when nothing matches, or when `item` carries none of the
/// keys at all (such an item cannot identify anything).
pub fn find_item_index<'k>(
    items: &[Item],
    item: &Item,
    keys: impl Iterator<Item = &'k String> + Clone,
) -> Option<usize> {
    let probe: Vec<Option<&serde_json::Value>> =
        keys.clone().map(|key| item.value().get(key)).collect();

    if probe.iter().all(Option::is_none) {
        return None;
    }

    items.iter().position(|candidate| {
        keys.clone()
            .map(|key| candidate.value().get(key))
            .eq(probe.iter().copied())
    })
}
