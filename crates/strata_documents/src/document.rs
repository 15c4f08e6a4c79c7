//! Serialized document shapes.
//!
//! A document file may declare any mix of top-level templates, groups, a
//! root group, user templates and user variables. Wherever a template or
//! group is expected inside another one it can be given inline or by the
//! name of a top-level entry.

use serde::{Deserialize, Serialize};
use strata_templates::{Item, ItemValue, Name, Scalar, Variable};

/// One parsed document file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentFile {
    #[serde(default)]
    pub templates: Vec<TemplateDocument>,
    #[serde(default)]
    pub groups: Vec<GroupDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default)]
    pub user_templates: Vec<TemplateRef>,
    #[serde(default)]
    pub user_variables: Vec<VariableDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDocument {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemDocument>,
    #[serde(default)]
    pub variables: Vec<VariableDocument>,
    #[serde(default)]
    pub unique_keys: Vec<String>,
    #[serde(default)]
    pub children: Vec<TemplateRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<TemplateRef>,
}

impl TemplateDocument {
    /// Children in merge order, `extends` last.
    pub fn child_refs(&self) -> impl Iterator<Item = &TemplateRef> {
        self.children.iter().chain(self.extends.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDocument {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub templates: Vec<TemplateRef>,
    #[serde(default)]
    pub variables: Vec<VariableDocument>,
    #[serde(default)]
    pub children: Vec<GroupRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<GroupRef>,
}

impl GroupDocument {
    /// Children in merge order, `extends` last.
    pub fn child_refs(&self) -> impl Iterator<Item = &GroupRef> {
        self.children.iter().chain(self.extends.iter())
    }
}

/// A template given inline or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateRef {
    Named(Name),
    Inline(Box<TemplateDocument>),
}

/// A group given inline or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupRef {
    Named(Name),
    Inline(Box<GroupDocument>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDocument {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariableDocument {
    pub fn to_variable(&self) -> Variable {
        let mut variable = Variable::new(self.name.clone()).required(self.required);
        variable.set_value(self.value.clone());
        match &self.description {
            Some(description) => variable.with_description(description.clone()),
            None => variable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(default)]
    pub value: ItemValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ItemDocument {
    pub fn to_item(&self) -> Item {
        let mut item = Item::from_value(self.value.clone());
        if let Some(name) = &self.name {
            item = item.with_name(name.clone());
        }
        if let Some(description) = &self.description {
            item = item.with_description(description.clone());
        }
        item
    }
}
