//! # strata_templates
//!
//! Composable configuration templates for Strata.
//!
//! Templates hold items (ordered key/value records) and variables. Items and
//! variable values may contain `{name}` placeholders that are substituted at
//! build time. Templates nest: a template's children are merged first, so the
//! containing template wins on name collisions. Groups bundle templates and
//! group-level variables and nest the same way.
//!
//! Precedence, lowest to highest:
//!
//! - templates in group-tree order, then templates added to the builder
//! - template variables, then group variables, then builder variables
//!
//! ## Example
//!
//! ```rust
//! use strata_templates::{Item, Template, TemplateBuilder, TemplateGroup, Variable};
//!
//! let records = Template::new("records")
//!     .with_category("networking")
//!     .with_unique_keys(["name"])
//!     .with_variable(Variable::new("domain").required(true))
//!     .with_item(Item::named("www", [("name", "www.{domain}"), ("type", "A")]));
//!
//! let group = TemplateGroup::new("site")
//!     .with_template(records)
//!     .with_variable(Variable::new("domain").with_value("example.com"));
//!
//! let build = TemplateBuilder::new().set_group(group).build().unwrap();
//! let networking = build.data().category("networking");
//! assert_eq!(networking[0].values["name"], "www.example.com");
//! ```

pub mod build;
pub mod builder;
pub mod error;
pub mod model;
pub mod placeholder;
pub mod resolver;
pub mod structure;
pub mod tree;

pub use build::{
    Build, BuildData, BuildDiff, ChangedEntry, DiffEntry, Inspection, ItemIdentity, RenderedItem,
};
pub use builder::{BuildOptions, TemplateBuilder};
pub use error::{TemplateError, TemplateResult};
pub use model::{Item, ItemValue, Name, Scalar, Template, TemplateGroup, Variable, DEFAULT_CATEGORY};
pub use resolver::{DependencyResolver, ResolvedVariable};
pub use structure::{Structure, StructureAssembler};
pub use tree::{fold_by_name, resolve_tree, resolve_tree_map, TreeNode};
