//! Integration tests for template composition and builds.

use serde_json::json;
use strata_templates::placeholder::has_placeholders;
use strata_templates::{
    BuildOptions, Item, ItemIdentity, Name, Template, TemplateBuilder, TemplateError,
    TemplateGroup, Variable,
};

fn child_template() -> Template {
    Template::new("child")
        .with_unique_keys(["name", "content"])
        .with_variable(Variable::new("domain").required(true))
        .with_variable(Variable::new("subdomain").with_value("sub"))
        .with_item(Item::named(
            "Item 2",
            [("name", "2.{domain}"), ("content", "{domain}")],
        ))
        .with_item(Item::named(
            "Item 3",
            [("name", "{subdomain}.test.com"), ("content", "my-redirect.test.com")],
        ))
        .with_item(Item::named(
            "Item 4",
            [("name", "{subdomain}.{domain}"), ("content", "my-redirect.test.com")],
        ))
}

fn parent_template() -> Template {
    Template::new("parent")
        .with_unique_keys(["name"])
        .with_variable(Variable::new("subsubdomain").with_value("subsub"))
        .with_item(Item::named(
            "1",
            [("name", "{subsubdomain}.{subdomain}.test.com")],
        ))
        .with_item(Item::named(
            "Item 2",
            [("name", "2.{domain}"), ("content", "{domain}")],
        ))
        .with_child(child_template())
}

fn standalone_template() -> Template {
    Template::new("standalone")
        .with_category("networking")
        .with_item(Item::new([("name", "2.test.com"), ("content", "{domain}")]))
}

fn group() -> TemplateGroup {
    TemplateGroup::new("Group")
        .with_template(parent_template())
        .with_template(standalone_template())
        .with_variable(Variable::new("domain").with_value("group_domain.com"))
}

fn value_of(item: &strata_templates::RenderedItem, key: &str) -> String {
    item.values[key].as_str().unwrap_or_default().to_string()
}

#[test]
fn test_structure_of_group() {
    let builder = TemplateBuilder::new().set_group(group());
    let structure = builder.structure().unwrap();

    let templates: Vec<_> = structure.templates().iter().map(Template::key).collect();
    assert_eq!(templates, vec!["child", "parent", "standalone"]);

    let items: Vec<_> = structure
        .items()
        .iter()
        .map(|item| (item.template().map(Name::key), item.name().map(Name::key)))
        .collect();
    assert_eq!(
        items,
        vec![
            (Some("parent".to_string()), Some("Item 2".to_string())),
            (Some("child".to_string()), Some("Item 3".to_string())),
            (Some("child".to_string()), Some("Item 4".to_string())),
            (Some("parent".to_string()), Some("1".to_string())),
            (Some("standalone".to_string()), None),
        ]
    );

    let variables: Vec<_> = structure.variables().iter().map(Variable::key).collect();
    assert_eq!(variables, vec!["domain", "subdomain", "subsubdomain"]);
    assert_eq!(
        structure.variable("subdomain").and_then(|v| v.template()).map(Name::key),
        Some("child".to_string())
    );
    assert_eq!(
        structure.variable("subsubdomain").and_then(|v| v.template()).map(Name::key),
        Some("parent".to_string())
    );
}

#[test]
fn test_end_to_end_build() {
    let build = TemplateBuilder::new().set_group(group()).build().unwrap();
    let data = build.data();

    assert!(data.is_grouped());
    assert_eq!(data.categories(), vec!["default", "networking"]);

    let default = data.category("default");
    assert_eq!(default.len(), 4);
    assert_eq!(value_of(default[0], "name"), "2.group_domain.com");
    assert_eq!(value_of(default[0], "content"), "group_domain.com");
    assert_eq!(value_of(default[1], "name"), "sub.test.com");
    assert_eq!(value_of(default[2], "name"), "sub.group_domain.com");
    assert_eq!(value_of(default[3], "name"), "subsub.sub.test.com");

    let networking = data.category("networking");
    assert_eq!(networking.len(), 1);
    assert_eq!(value_of(networking[0], "content"), "group_domain.com");
    assert_eq!(
        networking[0].identity,
        ItemIdentity::Positional {
            template: "standalone".to_string(),
            position: 0,
        }
    );
}

#[test]
fn test_no_defined_placeholder_survives() {
    let build = TemplateBuilder::new().set_group(group()).build().unwrap();

    for item in build.items() {
        for (key, value) in &item.values {
            assert!(!has_placeholders(key), "placeholder left in key {}", key);
            if let Some(text) = value.as_str() {
                assert!(!has_placeholders(text), "placeholder left in {}", text);
            }
        }
    }
}

#[test]
fn test_grouped_output_shape() {
    let build = TemplateBuilder::new().set_group(group()).build().unwrap();
    let json = serde_json::to_value(build.data()).unwrap();

    assert_eq!(
        json["networking"],
        json!([{"name": "2.test.com", "content": "group_domain.com"}])
    );
    assert_eq!(json["default"][3], json!({"name": "subsub.sub.test.com"}));

    let yaml = serde_yaml::to_string(build.data()).unwrap();
    assert!(yaml.contains("networking:"));
}

#[test]
fn test_flat_build_keeps_structure_order() {
    let builder = TemplateBuilder::new().set_group(group());
    let build = builder.build_with(BuildOptions::flat()).unwrap();

    assert!(!build.data().is_grouped());
    let names: Vec<_> = build.items().iter().map(|i| value_of(i, "name")).collect();
    assert_eq!(
        names,
        vec![
            "2.group_domain.com",
            "sub.test.com",
            "sub.group_domain.com",
            "subsub.sub.test.com",
            "2.test.com",
        ]
    );
}

#[test]
fn test_build_is_idempotent_and_leaves_inputs_untouched() {
    let original = group();
    let builder = TemplateBuilder::new().set_group(original.clone());

    let first = builder.build().unwrap();
    let second = builder.build().unwrap();

    assert_eq!(first, second);
    assert_eq!(builder.group(), Some(&original));
}

#[test]
fn test_user_variable_beats_group_variable() {
    let build = TemplateBuilder::new()
        .set_group(group())
        .add_user_variable(Variable::new("domain").with_value("user.com"))
        .build()
        .unwrap();

    let default = build.data().category("default");
    assert_eq!(value_of(default[0], "name"), "2.user.com");
    assert_eq!(
        build.structure().variable("domain").and_then(|v| v.group()),
        None
    );
}

#[test]
fn test_required_variable_without_group_fails() {
    let err = TemplateBuilder::new()
        .add_user_template(parent_template())
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        TemplateError::RequiredVariableUnresolved {
            variable: "domain".to_string(),
            template: Some("child".to_string()),
            group: None,
        }
    );

    let build = TemplateBuilder::new()
        .add_user_template(parent_template())
        .add_user_variable(Variable::new("domain").with_value("example.org"))
        .build()
        .unwrap();
    assert_eq!(build.items().len(), 4);
}

#[test]
fn test_nothing_registered_is_a_configuration_error() {
    let err = TemplateBuilder::new().build().unwrap_err();
    assert!(matches!(err, TemplateError::Configuration(_)));
}

#[test]
fn test_undefined_variable_is_reported() {
    let err = TemplateBuilder::new()
        .add_user_template(
            Template::new("records").with_item(Item::named("mx", [("host", "mail.{zone}")])),
        )
        .build()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Variable 'zone' referenced by item 'mx' in template 'records' is not defined"
    );
}

#[test]
fn test_variable_cycle_fails_the_build() {
    let err = TemplateBuilder::new()
        .add_user_template(
            Template::new("t")
                .with_variable(Variable::new("a").with_value("{b}"))
                .with_variable(Variable::new("b").with_value("{a}"))
                .with_item(Item::new([("name", "static")])),
        )
        .build()
        .unwrap_err();

    assert!(matches!(err, TemplateError::Cycle { kind: "variable", .. }));
}

#[test]
fn test_extending_template_overrides_parent_items() {
    let base = Template::new("base")
        .with_unique_keys(["name"])
        .with_item(Item::new([("name", "www"), ("ttl", "3600")]))
        .with_item(Item::new([("name", "mail"), ("ttl", "3600")]));
    let site = Template::new("site")
        .with_unique_keys(["name"])
        .with_item(Item::new([("name", "www"), ("ttl", "60")]))
        .extends(base);

    let build = TemplateBuilder::new()
        .add_user_template(site)
        .build_with(BuildOptions::flat())
        .unwrap();

    let items = build.items();
    assert_eq!(items.len(), 2);
    assert_eq!(value_of(items[0], "ttl"), "60");
    assert_eq!(value_of(items[1], "name"), "mail");
}

#[test]
fn test_categories() {
    let builder = TemplateBuilder::new().set_group(group());
    assert_eq!(builder.categories().unwrap(), vec!["default", "networking"]);
}

#[test]
fn test_inspect_traces_provenance() {
    let builder = TemplateBuilder::new().set_group(group());
    let build = builder.build().unwrap();
    let report = builder.inspect(&build);

    assert_eq!(report.len(), 5);

    let first = &report[3];
    assert_eq!(first.category, "default");
    assert_eq!(first.index, 3);
    assert_eq!(first.item, Some(Name::from("1")));
    assert_eq!(first.template, Some(Name::from("parent")));
    assert_eq!(first.group, Some(Name::from("Group")));
    assert_eq!(
        first.variables.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["subdomain", "subsubdomain"]
    );

    let standalone = &report[4];
    assert_eq!(standalone.category, "networking");
    assert_eq!(standalone.index, 0);
    assert_eq!(standalone.item, None);
}

#[test]
fn test_diff_between_builds() {
    let builder = TemplateBuilder::new().set_group(group());
    let before = builder.build().unwrap();
    let after = builder
        .clone()
        .add_user_variable(Variable::new("domain").with_value("other.com"))
        .build()
        .unwrap();

    let diff = builder.diff(&before, &after);

    // Keyed items whose key values changed are reported as removed and added.
    assert_eq!(diff.removed.len(), 2);
    assert_eq!(diff.added.len(), 2);
    assert_eq!(diff.added[0].values["name"], "2.other.com");

    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].category, "networking");
    assert_eq!(diff.changed[0].before["content"], "group_domain.com");
    assert_eq!(diff.changed[0].after["content"], "other.com");

    assert!(builder.diff(&before, &before).is_empty());
}

fn record(template: &str, content: &str) -> Template {
    Template::new(template)
        .with_unique_keys(["name"])
        .with_item(Item::new([("name", "www"), ("content", content)]))
}

#[test]
fn test_user_template_is_merged_after_the_group_chain() {
    let group = TemplateGroup::new("site").with_template(record("records", "group"));

    let build = TemplateBuilder::new()
        .set_group(group)
        .add_user_template(record("overrides", "user"))
        .build_with(BuildOptions::flat())
        .unwrap();

    let items = build.items();
    assert_eq!(items.len(), 1);
    assert_eq!(value_of(items[0], "content"), "user");
    assert_eq!(items[0].template, Some(Name::from("overrides")));
}

#[test]
fn test_user_template_replacing_a_group_template_keeps_top_precedence() {
    let group = TemplateGroup::new("site")
        .with_template(record("base", "base"))
        .with_template(record("other", "other"));

    let builder = TemplateBuilder::new()
        .set_group(group)
        .add_user_template(record("base", "user"));

    let templates: Vec<_> = builder
        .structure()
        .unwrap()
        .templates()
        .iter()
        .map(Template::key)
        .collect();
    assert_eq!(templates, vec!["other", "base"]);

    let build = builder.build_with(BuildOptions::flat()).unwrap();
    let items = build.items();
    assert_eq!(items.len(), 1);
    assert_eq!(value_of(items[0], "content"), "user");
    assert_eq!(items[0].template, Some(Name::from("base")));
}

#[test]
fn test_template_repeated_in_a_tree_merges_at_its_last_position() {
    let root = Template::new("root")
        .with_child(record("shared", "first"))
        .with_child(record("other", "other"))
        .with_child(record("shared", "second"));

    let build = TemplateBuilder::new()
        .add_user_template(root)
        .build_with(BuildOptions::flat())
        .unwrap();

    let items = build.items();
    assert_eq!(items.len(), 1);
    assert_eq!(value_of(items[0], "content"), "second");
    assert_eq!(items[0].template, Some(Name::from("shared")));
}

#[test]
fn test_diff_keeps_items_rendering_to_the_same_identity() {
    let aliases = |items: &[&str]| {
        let template = items.iter().fold(
            Template::new("aliases")
                .with_unique_keys(["name"])
                .with_variable(Variable::new("a").with_value("x"))
                .with_variable(Variable::new("b").with_value("x")),
            |template, name| template.with_item(Item::new([("name", *name)])),
        );
        TemplateBuilder::new().add_user_template(template)
    };

    let builder = aliases(&["{a}", "{b}"]);
    let before = builder.build().unwrap();
    let after = aliases(&["{a}"]).build().unwrap();
    assert_eq!(before.items().len(), 2);
    assert_eq!(before.items()[0].identity, before.items()[1].identity);

    let diff = builder.diff(&before, &after);
    assert!(diff.added.is_empty());
    assert!(diff.changed.is_empty());
    assert_eq!(diff.removed.len(), 1);
    assert_eq!(diff.removed[0].identity.to_string(), "aliases[name=x]");
}
