//! Document sets: every loaded document merged into one name-indexed
//! catalog, materialised into engine values on demand.

use std::collections::HashSet;

use indexmap::IndexMap;
use strata_templates::{
    resolve_tree, Name, Template, TemplateBuilder, TemplateError, TemplateGroup, TemplateResult,
    TreeNode,
};
use tracing::{debug, info};

use crate::document::{
    DocumentFile, GroupDocument, GroupRef, ItemDocument, TemplateDocument, TemplateRef,
    VariableDocument,
};
use crate::error::{DocumentError, DocumentResult};

/// Top-level templates and groups of one or more documents, plus the build
/// configuration they declare.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    templates: IndexMap<String, TemplateDocument>,
    groups: IndexMap<String, GroupDocument>,
    root: Option<String>,
    user_templates: Vec<TemplateRef>,
    user_variables: IndexMap<String, VariableDocument>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(file: DocumentFile) -> DocumentResult<Self> {
        let mut set = Self::new();
        set.merge(file)?;
        Ok(set)
    }

    /// Merge one more document into the set.
    ///
    /// Top-level names must be unique across the whole set. User variables
    /// from later documents replace earlier ones.
    pub fn merge(&mut self, file: DocumentFile) -> DocumentResult<()> {
        for template in file.templates {
            let name = template.name.key();
            if self.templates.contains_key(&name) {
                return Err(DocumentError::DuplicateName {
                    kind: "template",
                    name,
                });
            }
            debug!("Registered template document '{}'", name);
            self.templates.insert(name, template);
        }

        for group in file.groups {
            let name = group.name.key();
            if self.groups.contains_key(&name) {
                return Err(DocumentError::DuplicateName { kind: "group", name });
            }
            debug!("Registered group document '{}'", name);
            self.groups.insert(name, group);
        }

        if let Some(root) = file.root {
            if self.root.as_ref().is_some_and(|existing| *existing != root) {
                return Err(DocumentError::DuplicateName {
                    kind: "root",
                    name: root,
                });
            }
            self.root = Some(root);
        }

        self.user_templates.extend(file.user_templates);
        for variable in file.user_variables {
            self.add_user_variable(variable);
        }

        Ok(())
    }

    /// Choose the root group by name, overriding any declared root.
    pub fn set_root(&mut self, root: impl Into<String>) {
        self.root = Some(root.into());
    }

    pub fn add_user_variable(&mut self, variable: VariableDocument) {
        let name = variable.name.key();
        if self.user_variables.insert(name.clone(), variable).is_some() {
            debug!("User variable '{}' overridden", name);
        }
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.groups.is_empty() && self.user_templates.is_empty()
    }

    /// Materialise a top-level template with its whole child tree.
    pub fn template(&self, name: &str) -> DocumentResult<Template> {
        let doc = self
            .templates
            .get(name)
            .ok_or_else(|| DocumentError::UnknownTemplate {
                name: name.to_string(),
                referenced_by: "caller".to_string(),
            })?;
        self.build_template(doc)
    }

    /// Materialise a top-level group with its templates and child groups.
    pub fn group(&self, name: &str) -> DocumentResult<TemplateGroup> {
        let doc = self
            .groups
            .get(name)
            .ok_or_else(|| DocumentError::UnknownGroup {
                name: name.to_string(),
                referenced_by: "caller".to_string(),
            })?;
        self.build_group(doc)
    }

    /// Name of the group to build from.
    ///
    /// An explicit root wins. Otherwise the root is the only group no other
    /// group refers to; several such groups are ambiguous.
    pub fn root_name(&self) -> DocumentResult<Option<String>> {
        if let Some(root) = &self.root {
            if !self.groups.contains_key(root) {
                return Err(DocumentError::UnknownGroup {
                    name: root.clone(),
                    referenced_by: "root".to_string(),
                });
            }
            return Ok(Some(root.clone()));
        }

        let references = self.references();
        let mut candidates: Vec<String> = self
            .groups
            .keys()
            .filter(|name| !references.groups.contains(*name))
            .cloned()
            .collect();

        match candidates.len() {
            0 if self.groups.is_empty() => Ok(None),
            0 => {
                // Every group is referenced by another one, so some of them
                // must form a cycle.
                for doc in self.groups.values() {
                    resolve_tree(GroupNode { set: self, doc }).map_err(DocumentError::from_template)?;
                }
                Err(DocumentError::AmbiguousRoot(self.groups.keys().cloned().collect()))
            }
            1 => Ok(candidates.pop()),
            _ => Err(DocumentError::AmbiguousRoot(candidates)),
        }
    }

    /// Templates registered directly on the builder.
    ///
    /// Without declared user templates and without a root group, every
    /// top-level template nothing else refers to is used.
    pub fn user_templates(&self) -> DocumentResult<Vec<Template>> {
        if !self.user_templates.is_empty() {
            let owner = Name::from("user_templates");
            return self
                .user_templates
                .iter()
                .map(|r| {
                    let doc = self
                        .lookup_template(r, &owner)
                        .map_err(DocumentError::from_template)?;
                    self.build_template(doc)
                })
                .collect();
        }

        if self.root_name()?.is_some() {
            return Ok(Vec::new());
        }

        let references = self.references();
        self.templates
            .iter()
            .filter(|(name, _)| !references.templates.contains(*name))
            .map(|(_, doc)| self.build_template(doc))
            .collect()
    }

    pub fn user_variables(&self) -> impl Iterator<Item = &VariableDocument> {
        self.user_variables.values()
    }

    /// A builder configured with the root group, user templates and user
    /// variables of this set.
    pub fn into_builder(self) -> DocumentResult<TemplateBuilder> {
        let mut builder = TemplateBuilder::new();

        if let Some(root) = self.root_name()? {
            builder = builder.set_group(self.group(&root)?);
        }

        for template in self.user_templates()? {
            builder = builder.add_user_template(template);
        }

        for variable in self.user_variables.values() {
            builder = builder.add_user_variable(variable.to_variable());
        }

        info!(
            "Configured builder: root group {:?}, {} user template(s), {} user variable(s)",
            builder.group().map(TemplateGroup::key),
            builder.user_templates().count(),
            builder.user_variables().count()
        );

        Ok(builder)
    }

    fn lookup_template<'d>(
        &'d self,
        reference: &'d TemplateRef,
        referenced_by: &Name,
    ) -> TemplateResult<&'d TemplateDocument> {
        match reference {
            TemplateRef::Inline(doc) => Ok(&**doc),
            TemplateRef::Named(name) => {
                self.templates
                    .get(&name.key())
                    .ok_or_else(|| TemplateError::UnknownNode {
                        kind: "template",
                        name: name.key(),
                        referenced_by: referenced_by.key(),
                    })
            }
        }
    }

    fn lookup_group<'d>(
        &'d self,
        reference: &'d GroupRef,
        referenced_by: &Name,
    ) -> TemplateResult<&'d GroupDocument> {
        match reference {
            GroupRef::Inline(doc) => Ok(&**doc),
            GroupRef::Named(name) => {
                self.groups
                    .get(&name.key())
                    .ok_or_else(|| TemplateError::UnknownNode {
                        kind: "group",
                        name: name.key(),
                        referenced_by: referenced_by.key(),
                    })
            }
        }
    }

    fn build_template(&self, doc: &TemplateDocument) -> DocumentResult<Template> {
        resolve_tree(TemplateNode { set: self, doc }).map_err(DocumentError::from_template)?;
        self.materialize_template(doc)
            .map_err(DocumentError::from_template)
    }

    // Only called on trees already checked for cycles.
    fn materialize_template(&self, doc: &TemplateDocument) -> TemplateResult<Template> {
        let mut template = Template::new(doc.name.clone())
            .with_items(doc.items.iter().map(ItemDocument::to_item))
            .with_variables(doc.variables.iter().map(VariableDocument::to_variable))
            .with_unique_keys(doc.unique_keys.iter().cloned());

        if let Some(category) = &doc.category {
            template = template.with_category(category.clone());
        }
        if let Some(description) = &doc.description {
            template = template.with_description(description.clone());
        }

        for child in &doc.children {
            let child = self.lookup_template(child, &doc.name)?;
            template = template.with_child(self.materialize_template(child)?);
        }
        if let Some(parent) = &doc.extends {
            let parent = self.lookup_template(parent, &doc.name)?;
            template = template.extends(self.materialize_template(parent)?);
        }

        Ok(template)
    }

    fn build_group(&self, doc: &GroupDocument) -> DocumentResult<TemplateGroup> {
        resolve_tree(GroupNode { set: self, doc }).map_err(DocumentError::from_template)?;

        let mut group = TemplateGroup::new(doc.name.clone())
            .with_variables(doc.variables.iter().map(VariableDocument::to_variable));
        if let Some(description) = &doc.description {
            group = group.with_description(description.clone());
        }

        for reference in &doc.templates {
            let template = self
                .lookup_template(reference, &doc.name)
                .map_err(DocumentError::from_template)?;
            group = group.with_template(self.build_template(template)?);
        }

        for reference in doc.child_refs() {
            let child = self
                .lookup_group(reference, &doc.name)
                .map_err(DocumentError::from_template)?;
            group = group.with_child(self.build_group(child)?);
        }

        Ok(group)
    }

    /// Names referred to from anywhere inside the set.
    fn references(&self) -> References {
        let mut references = References::default();
        for doc in self.templates.values() {
            references.visit_template(doc);
        }
        for doc in self.groups.values() {
            references.visit_group(doc);
        }
        references
    }
}

#[derive(Default)]
struct References {
    templates: HashSet<String>,
    groups: HashSet<String>,
}

impl References {
    fn visit_template(&mut self, doc: &TemplateDocument) {
        for reference in doc.child_refs() {
            match reference {
                TemplateRef::Named(name) => {
                    self.templates.insert(name.key());
                }
                TemplateRef::Inline(inline) => self.visit_template(inline),
            }
        }
    }

    fn visit_group(&mut self, doc: &GroupDocument) {
        for reference in &doc.templates {
            match reference {
                TemplateRef::Named(name) => {
                    self.templates.insert(name.key());
                }
                TemplateRef::Inline(inline) => self.visit_template(inline),
            }
        }
        for reference in doc.child_refs() {
            match reference {
                GroupRef::Named(name) => {
                    self.groups.insert(name.key());
                }
                GroupRef::Inline(inline) => self.visit_group(inline),
            }
        }
    }
}

/// A template document seen through its name references.
#[derive(Clone, Copy)]
struct TemplateNode<'d> {
    set: &'d DocumentSet,
    doc: &'d TemplateDocument,
}

impl<'d> TreeNode for TemplateNode<'d> {
    type Id = *const TemplateDocument;

    const KIND: &'static str = "template";

    fn node_id(&self) -> Self::Id {
        self.doc as *const TemplateDocument
    }

    fn node_name(&self) -> String {
        self.doc.name.key()
    }

    fn child_nodes(&self) -> TemplateResult<Vec<Self>> {
        let (set, doc) = (self.set, self.doc);
        doc.child_refs()
            .map(|reference| {
                set.lookup_template(reference, &doc.name)
                    .map(|child| TemplateNode { set, doc: child })
            })
            .collect()
    }
}

/// A group document seen through its name references.
#[derive(Clone, Copy)]
struct GroupNode<'d> {
    set: &'d DocumentSet,
    doc: &'d GroupDocument,
}

impl<'d> TreeNode for GroupNode<'d> {
    type Id = *const GroupDocument;

    const KIND: &'static str = "group";

    fn node_id(&self) -> Self::Id {
        self.doc as *const GroupDocument
    }

    fn node_name(&self) -> String {
        self.doc.name.key()
    }

    fn child_nodes(&self) -> TemplateResult<Vec<Self>> {
        let (set, doc) = (self.set, self.doc);
        doc.child_refs()
            .map(|reference| {
                set.lookup_group(reference, &doc.name)
                    .map(|child| GroupNode { set, doc: child })
            })
            .collect()
    }
}
