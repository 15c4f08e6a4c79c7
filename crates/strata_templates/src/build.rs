//! Build results: rendered data plus the structure it came from.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::model::{ItemValue, Name};
use crate::structure::Structure;

/// Stable identity of an output element, used to compare builds.
///
/// Items of templates with `unique_keys` are identified by their template
/// and the rendered values at those keys; any other item by its position
/// among its template's items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemIdentity {
    Keyed {
        template: String,
        keys: Vec<(String, String)>,
    },
    Positional {
        template: String,
        position: usize,
    },
}

impl ItemIdentity {
    pub fn new(
        template: String,
        unique_keys: Option<&BTreeSet<String>>,
        values: &ItemValue,
        position: usize,
    ) -> Self {
        let keys: Vec<(String, String)> = unique_keys
            .into_iter()
            .flatten()
            .filter_map(|key| values.get(key).map(|value| (key.clone(), scalar_text(value))))
            .collect();

        if keys.is_empty() {
            ItemIdentity::Positional { template, position }
        } else {
            ItemIdentity::Keyed { template, keys }
        }
    }

    pub fn template(&self) -> &str {
        match self {
            ItemIdentity::Keyed { template, .. } | ItemIdentity::Positional { template, .. } => {
                template
            }
        }
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemIdentity::Keyed { template, keys } => {
                let keys: Vec<String> = keys.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{}[{}]", template, keys.join(", "))
            }
            ItemIdentity::Positional { template, position } => write!(f, "{}#{}", template, position),
        }
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One output element with its provenance.
///
/// Serializes as its rendered values only.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem {
    pub name: Option<Name>,
    pub template: Option<Name>,
    pub group: Option<Name>,
    pub category: String,
    pub identity: ItemIdentity,
    pub values: ItemValue,
    /// Variables that contributed to the substitution, transitively.
    pub variables: BTreeSet<String>,
}

impl Serialize for RenderedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Rendered items, either flat or grouped by template category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BuildData {
    Flat(Vec<RenderedItem>),
    Grouped(IndexMap<String, Vec<RenderedItem>>),
}

impl BuildData {
    pub fn flat(items: Vec<RenderedItem>) -> Self {
        BuildData::Flat(items)
    }

    /// Group items by category, categories in order of first appearance.
    pub fn grouped(items: Vec<RenderedItem>) -> Self {
        let mut groups: IndexMap<String, Vec<RenderedItem>> = IndexMap::new();
        for item in items {
            groups.entry(item.category.clone()).or_default().push(item);
        }
        BuildData::Grouped(groups)
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, BuildData::Grouped(_))
    }

    /// Every item, categories concatenated in order when grouped.
    pub fn items(&self) -> Vec<&RenderedItem> {
        match self {
            BuildData::Flat(items) => items.iter().collect(),
            BuildData::Grouped(groups) => groups.values().flatten().collect(),
        }
    }

    /// Items of one category.
    pub fn category(&self, category: &str) -> Vec<&RenderedItem> {
        match self {
            BuildData::Flat(items) => items.iter().filter(|i| i.category == category).collect(),
            BuildData::Grouped(groups) => groups
                .get(category)
                .map(|items| items.iter().collect())
                .unwrap_or_default(),
        }
    }

    pub fn categories(&self) -> Vec<&str> {
        match self {
            BuildData::Flat(items) => {
                let mut categories: Vec<&str> = Vec::new();
                for item in items {
                    if !categories.contains(&item.category.as_str()) {
                        categories.push(&item.category);
                    }
                }
                categories
            }
            BuildData::Grouped(groups) => groups.keys().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BuildData::Flat(items) => items.len(),
            BuildData::Grouped(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where one output element came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    pub category: String,
    /// Index within the category when grouped, within the whole build otherwise.
    pub index: usize,
    pub identity: ItemIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Name>,
    pub variables: BTreeSet<String>,
}

/// An element present in only one of two builds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub identity: ItemIdentity,
    pub category: String,
    pub values: ItemValue,
}

/// An element present in both builds with different content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangedEntry {
    pub identity: ItemIdentity,
    pub category: String,
    pub before: ItemValue,
    pub after: ItemValue,
}

/// Structural difference between two builds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildDiff {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub changed: Vec<ChangedEntry>,
}

impl BuildDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Final substituted output plus the structure that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Build {
    data: BuildData,
    structure: Structure,
}

impl Build {
    pub fn new(data: BuildData, structure: Structure) -> Self {
        Self { data, structure }
    }

    pub fn data(&self) -> &BuildData {
        &self.data
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn items(&self) -> Vec<&RenderedItem> {
        self.data.items()
    }

    /// Trace every output element back to its template, group and variables.
    pub fn inspect(&self) -> Vec<Inspection> {
        let describe = |index: usize, item: &RenderedItem| Inspection {
            category: item.category.clone(),
            index,
            identity: item.identity.clone(),
            item: item.name.clone(),
            template: item.template.clone(),
            group: item.group.clone(),
            variables: item.variables.clone(),
        };

        match &self.data {
            BuildData::Flat(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| describe(index, item))
                .collect(),
            BuildData::Grouped(groups) => groups
                .values()
                .flat_map(|items| items.iter().enumerate())
                .map(|(index, item)| describe(index, item))
                .collect(),
        }
    }

    /// Compare this build (before) with `other` (after).
    pub fn diff(&self, other: &Build) -> BuildDiff {
        let before = index_by_identity(&self.data);
        let after = index_by_identity(&other.data);
        let mut diff = BuildDiff::default();

        for (key, old) in &before {
            match after.get(key) {
                None => diff.removed.push(entry(old)),
                Some(new) if new.values != old.values || new.category != old.category => {
                    diff.changed.push(ChangedEntry {
                        identity: old.identity.clone(),
                        category: new.category.clone(),
                        before: old.values.clone(),
                        after: new.values.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        for (key, new) in &after {
            if !before.contains_key(key) {
                diff.added.push(entry(new));
            }
        }

        diff
    }
}

/// Index items by identity plus occurrence, so items sharing an identity
/// are paired up in order instead of collapsing into one entry.
fn index_by_identity(data: &BuildData) -> IndexMap<(&ItemIdentity, usize), &RenderedItem> {
    let mut seen: HashMap<&ItemIdentity, usize> = HashMap::new();
    data.items()
        .into_iter()
        .map(|item| {
            let occurrence = seen.entry(&item.identity).or_insert(0);
            let key = (&item.identity, *occurrence);
            *occurrence += 1;
            (key, item)
        })
        .collect()
}

fn entry(item: &RenderedItem) -> DiffEntry {
    DiffEntry {
        identity: item.identity.clone(),
        category: item.category.clone(),
        values: item.values.clone(),
    }
}
