//! Domain model for composable templates.
//!
//! Entities are built once through their `with_*` constructors and read
//! afterwards. Attaching an item or variable to a template (or a template or
//! variable to a group) stamps the owner's name on it so that every merged
//! element can be traced back to where it came from.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::placeholder::extract_placeholders;

/// Category used when a template does not declare one.
pub const DEFAULT_CATEGORY: &str = "default";

/// Ordered key/value payload of an [`Item`].
pub type ItemValue = IndexMap<String, serde_json::Value>;

/// Name of a template, group, item or variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Name {
    Integer(i64),
    Text(String),
}

impl Name {
    /// Key used for name-based lookups and placeholder matching.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Integer(n) => write!(f, "{}", n),
            Name::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::Text(s.to_string())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::Text(s)
    }
}

impl From<i64> for Name {
    fn from(n: i64) -> Self {
        Name::Integer(n)
    }
}

impl From<i32> for Name {
    fn from(n: i32) -> Self {
        Name::Integer(n.into())
    }
}

/// Value of a [`Variable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Integer(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Integer(n.into())
    }
}

/// A named value used to fill placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    name: Name,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Scalar>,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    depends_on: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<Name>,
}

impl Variable {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            value: None,
            required: false,
            description: None,
            depends_on: BTreeSet::new(),
            template: None,
            group: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.set_value(Some(value.into()));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the value and recompute `depends_on`.
    pub fn set_value(&mut self, value: Option<Scalar>) {
        self.depends_on = match &value {
            Some(Scalar::Text(text)) => extract_placeholders(text),
            _ => BTreeSet::new(),
        };
        self.value = value;
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn key(&self) -> String {
        self.name.key()
    }

    pub fn value(&self) -> Option<&Scalar> {
        self.value.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Variable names referenced by this variable's value.
    pub fn depends_on(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Template this variable was declared in.
    pub fn template(&self) -> Option<&Name> {
        self.template.as_ref()
    }

    /// Group this variable was declared in.
    pub fn group(&self) -> Option<&Name> {
        self.group.as_ref()
    }

    fn attach_template(&mut self, template: &Name) {
        self.template = Some(template.clone());
    }

    fn attach_group(&mut self, group: &Name) {
        self.group = Some(group.clone());
    }
}

/// One unit of output data belonging to a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<Name>,
    value: ItemValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    depends_on: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<Name>,
}

impl Item {
    /// Create an anonymous item from key/value pairs.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        let value = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_value(value)
    }

    /// Create an anonymous item from an already built value map.
    pub fn from_value(value: ItemValue) -> Self {
        let mut item = Self {
            name: None,
            value: ItemValue::new(),
            description: None,
            depends_on: BTreeSet::new(),
            template: None,
        };
        item.set_value(value);
        item
    }

    /// Create a named item from key/value pairs.
    pub fn named<I, K, V>(name: impl Into<Name>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Self::new(entries).with_name(name)
    }

    pub fn with_name(mut self, name: impl Into<Name>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the value and recompute `depends_on` from its keys and string values.
    pub fn set_value(&mut self, value: ItemValue) {
        let mut depends_on = BTreeSet::new();
        for (key, entry) in &value {
            depends_on.extend(extract_placeholders(key));
            if let serde_json::Value::String(text) = entry {
                depends_on.extend(extract_placeholders(text));
            }
        }
        self.depends_on = depends_on;
        self.value = value;
    }

    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    pub fn value(&self) -> &ItemValue {
        &self.value
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Variable names referenced anywhere in this item's value.
    pub fn depends_on(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Template this item belongs to.
    pub fn template(&self) -> Option<&Name> {
        self.template.as_ref()
    }

    /// Human-readable label used in error messages and reports.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("item '{}'", name),
            None => "anonymous item".to_string(),
        }
    }

    fn attach_template(&mut self, template: &Name) {
        self.template = Some(template.clone());
    }
}

/// A named, composable configuration fragment.
///
/// `children` are templates this one builds upon: they are merged first, so
/// the containing template has the final say on name collisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    name: Name,
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    items: Vec<Item>,
    variables: Vec<Variable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unique_keys: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<Name>,
}

impl Template {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            description: None,
            items: Vec::new(),
            variables: Vec::new(),
            unique_keys: None,
            children: Vec::new(),
            group: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_item(mut self, mut item: Item) -> Self {
        item.attach_template(&self.name);
        self.items.push(item);
        self
    }

    pub fn with_items(self, items: impl IntoIterator<Item = Item>) -> Self {
        items.into_iter().fold(self, Template::with_item)
    }

    pub fn with_variable(mut self, mut variable: Variable) -> Self {
        variable.attach_template(&self.name);
        self.variables.push(variable);
        self
    }

    pub fn with_variables(self, variables: impl IntoIterator<Item = Variable>) -> Self {
        variables.into_iter().fold(self, Template::with_variable)
    }

    /// Keys of item values that identify "the same" item across overrides.
    pub fn with_unique_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        self.unique_keys = if keys.is_empty() { None } else { Some(keys) };
        self
    }

    pub fn with_child(mut self, mut child: Template) -> Self {
        if let Some(group) = &self.group {
            child.attach_group(group);
        }
        self.children.push(child);
        self
    }

    /// Single-parent inheritance: `parent` becomes the last child.
    pub fn extends(self, parent: Template) -> Self {
        self.with_child(parent)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn key(&self) -> String {
        self.name.key()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn unique_keys(&self) -> Option<&BTreeSet<String>> {
        self.unique_keys.as_ref()
    }

    pub fn children(&self) -> &[Template] {
        &self.children
    }

    /// Group this template was registered in.
    pub fn group(&self) -> Option<&Name> {
        self.group.as_ref()
    }

    fn attach_group(&mut self, group: &Name) {
        self.group = Some(group.clone());
        for child in &mut self.children {
            child.attach_group(group);
        }
    }
}

/// A named collection of templates plus group-scoped variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateGroup {
    name: Name,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    templates: Vec<Template>,
    variables: Vec<Variable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TemplateGroup>,
}

impl TemplateGroup {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            description: None,
            templates: Vec::new(),
            variables: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_template(mut self, mut template: Template) -> Self {
        template.attach_group(&self.name);
        self.templates.push(template);
        self
    }

    pub fn with_templates(self, templates: impl IntoIterator<Item = Template>) -> Self {
        templates.into_iter().fold(self, TemplateGroup::with_template)
    }

    pub fn with_variable(mut self, mut variable: Variable) -> Self {
        variable.attach_group(&self.name);
        self.variables.push(variable);
        self
    }

    pub fn with_variables(self, variables: impl IntoIterator<Item = Variable>) -> Self {
        variables.into_iter().fold(self, TemplateGroup::with_variable)
    }

    pub fn with_child(mut self, child: TemplateGroup) -> Self {
        self.children.push(child);
        self
    }

    /// Single-parent inheritance: `parent` becomes the last child.
    pub fn extends(self, parent: TemplateGroup) -> Self {
        self.with_child(parent)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn key(&self) -> String {
        self.name.key()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn children(&self) -> &[TemplateGroup] {
        &self.children
    }
}
