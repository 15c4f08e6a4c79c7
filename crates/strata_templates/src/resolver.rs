//! Dependency resolution: substitute variable values into items.
//!
//! Variables may reference other variables, so values are resolved depth
//! first with an explicit stack and memoized. A variable that (transitively) references itself is
//! a [`TemplateError::Cycle`].

use std::collections::{btree_set, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::build::{ItemIdentity, RenderedItem};
use crate::error::{TemplateError, TemplateResult};
use crate::model::{Item, ItemValue, Scalar, Template, Variable, DEFAULT_CATEGORY};
use crate::placeholder::substitute;
use crate::structure::Structure;

/// A variable value with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariable {
    pub value: String,
    /// The variable itself plus every variable its value was built from.
    pub contributors: BTreeSet<String>,
}

/// Who referenced a variable, for error reporting.
struct Referrer {
    label: String,
    template: Option<String>,
}

impl Referrer {
    fn item(item: &Item) -> Self {
        Self {
            label: item.label(),
            template: item.template().map(|t| t.key()),
        }
    }

    fn variable(variable: &Variable) -> Self {
        Self {
            label: format!("variable '{}'", variable.name()),
            template: variable.template().map(|t| t.key()),
        }
    }
}

/// A variable being resolved, with the dependencies not yet visited.
struct Pending<'s> {
    name: String,
    variable: &'s Variable,
    dependencies: btree_set::Iter<'s, String>,
}

/// Resolves variables and renders items against one [`Structure`].
pub struct DependencyResolver<'s> {
    variables: IndexMap<String, &'s Variable>,
    templates: HashMap<String, &'s Template>,
    resolved: HashMap<String, ResolvedVariable>,
    positions: HashMap<String, usize>,
}

impl<'s> DependencyResolver<'s> {
    pub fn new(structure: &'s Structure) -> Self {
        Self {
            variables: structure
                .variables()
                .iter()
                .map(|v| (v.key(), v))
                .collect(),
            templates: structure
                .templates()
                .iter()
                .map(|t| (t.key(), t))
                .collect(),
            resolved: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    /// Fail if any required variable is left without a value.
    pub fn check_required(&self) -> TemplateResult<()> {
        for variable in self.variables.values() {
            if variable.is_required() && variable.value().is_none() {
                return Err(required_unresolved(variable));
            }
        }
        Ok(())
    }

    /// Fail if the variables' dependencies form a cycle, whether or not any
    /// item references them. References to undefined variables are skipped
    /// here and reported when they are actually resolved.
    pub fn check_cycles(&self) -> TemplateResult<()> {
        let mut finished: HashSet<&str> = HashSet::new();

        for root in self.variables.keys() {
            if finished.contains(root.as_str()) {
                continue;
            }

            let mut on_path: HashSet<&str> = HashSet::from([root.as_str()]);
            let mut stack: Vec<(&str, std::vec::IntoIter<&str>)> =
                vec![(root.as_str(), self.defined_dependencies(root))];

            loop {
                let Some((_, dependencies)) = stack.last_mut() else {
                    break;
                };

                if let Some(dependency) = dependencies.next() {
                    if finished.contains(dependency) {
                        continue;
                    }
                    if on_path.contains(dependency) {
                        let path: Vec<&str> = stack.iter().map(|(name, _)| *name).collect();
                        return Err(variable_cycle(&path, dependency));
                    }
                    on_path.insert(dependency);
                    stack.push((dependency, self.defined_dependencies(dependency)));
                } else if let Some((name, _)) = stack.pop() {
                    on_path.remove(name);
                    finished.insert(name);
                }
            }
        }
        Ok(())
    }

    fn defined_dependencies(&self, name: &str) -> std::vec::IntoIter<&str> {
        self.variables
            .get(name)
            .map(|variable| {
                variable
                    .depends_on()
                    .iter()
                    .map(String::as_str)
                    .filter(|dependency| self.variables.contains_key(*dependency))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
            .into_iter()
    }

    /// Resolve one variable by name.
    pub fn resolve_variable(&mut self, name: &str) -> TemplateResult<ResolvedVariable> {
        let referrer = Referrer {
            label: "caller".to_string(),
            template: None,
        };
        self.resolve(name, &referrer)
    }

    /// Resolve `name` and everything it depends on, dependencies first,
    /// with an explicit stack of variables still waiting on a dependency.
    fn resolve(&mut self, name: &str, referrer: &Referrer) -> TemplateResult<ResolvedVariable> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(done.clone());
        }

        let mut stack: Vec<Pending<'s>> = vec![self.pending(name, referrer)?];

        loop {
            let Some(top) = stack.last_mut() else {
                break;
            };

            if let Some(dependency) = top.dependencies.next() {
                let owner = top.variable;
                if self.resolved.contains_key(dependency.as_str()) {
                    continue;
                }
                if stack.iter().any(|p| p.name == *dependency) {
                    let path: Vec<&str> = stack.iter().map(|p| p.name.as_str()).collect();
                    return Err(variable_cycle(&path, dependency));
                }
                let next = self.pending(dependency, &Referrer::variable(owner))?;
                stack.push(next);
            } else if let Some(done) = stack.pop() {
                self.finish(done);
            }
        }

        self.resolved
            .get(name)
            .cloned()
            .ok_or_else(|| missing_variable(name, referrer))
    }

    fn pending(&self, name: &str, referrer: &Referrer) -> TemplateResult<Pending<'s>> {
        let variable: &'s Variable = self
            .variables
            .get(name)
            .copied()
            .ok_or_else(|| missing_variable(name, referrer))?;

        if variable.is_required() && variable.value().is_none() {
            return Err(required_unresolved(variable));
        }

        Ok(Pending {
            name: name.to_string(),
            variable,
            dependencies: variable.depends_on().iter(),
        })
    }

    /// Substitute a variable whose dependencies are all resolved.
    fn finish(&mut self, pending: Pending<'s>) {
        let raw = match pending.variable.value() {
            Some(Scalar::Text(text)) => text.clone(),
            Some(Scalar::Integer(n)) => n.to_string(),
            None => String::new(),
        };

        let mut contributors = BTreeSet::from([pending.name.clone()]);
        let mut values = HashMap::new();
        for dependency in pending.variable.depends_on() {
            if let Some(resolved) = self.resolved.get(dependency) {
                contributors.extend(resolved.contributors.iter().cloned());
                values.insert(dependency.clone(), resolved.value.clone());
            }
        }

        let resolved = ResolvedVariable {
            value: substitute(&raw, &values),
            contributors,
        };
        debug!("Resolved variable '{}' = '{}'", pending.name, resolved.value);

        self.resolved.insert(pending.name, resolved);
    }

    /// Render one item: substitute every placeholder in its keys and string
    /// values. Items must be rendered in structure order, since unkeyed items
    /// are identified by their position within their template.
    pub fn render(&mut self, item: &Item) -> TemplateResult<RenderedItem> {
        let referrer = Referrer::item(item);
        let mut values = HashMap::new();
        let mut contributors = BTreeSet::new();

        for dependency in item.depends_on() {
            let resolved = self.resolve(dependency, &referrer)?;
            contributors.extend(resolved.contributors);
            values.insert(dependency.clone(), resolved.value);
        }

        let mut rendered = ItemValue::new();
        for (key, value) in item.value() {
            let value = match value {
                serde_json::Value::String(text) => serde_json::Value::String(substitute(text, &values)),
                other => other.clone(),
            };
            rendered.insert(substitute(key, &values), value);
        }

        let template_key = item.template().map(|t| t.key());
        let template = template_key
            .as_deref()
            .and_then(|key| self.templates.get(key).copied());

        let position = self
            .positions
            .entry(template_key.clone().unwrap_or_default())
            .or_insert(0);
        let identity = ItemIdentity::new(
            template_key.clone().unwrap_or_default(),
            template.and_then(Template::unique_keys),
            &rendered,
            *position,
        );
        *position += 1;

        Ok(RenderedItem {
            name: item.name().cloned(),
            template: item.template().cloned(),
            group: template.and_then(|t| t.group()).cloned(),
            category: template
                .map(|t| t.category().to_string())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            identity,
            values: rendered,
            variables: contributors,
        })
    }
}

fn missing_variable(name: &str, referrer: &Referrer) -> TemplateError {
    TemplateError::MissingVariable {
        variable: name.to_string(),
        referenced_by: referrer.label.clone(),
        template: referrer.template.clone(),
    }
}

fn variable_cycle(path: &[&str], repeated: &str) -> TemplateError {
    let start = path.iter().position(|name| *name == repeated).unwrap_or(0);
    let mut chain: Vec<String> = path[start..].iter().map(|name| name.to_string()).collect();
    chain.push(repeated.to_string());
    TemplateError::Cycle {
        kind: "variable",
        chain,
    }
}

fn required_unresolved(variable: &Variable) -> TemplateError {
    TemplateError::RequiredVariableUnresolved {
        variable: variable.key(),
        template: variable.template().map(|t| t.key()),
        group: variable.group().map(|g| g.key()),
    }
}
