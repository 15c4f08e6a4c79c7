//! Integration tests for loading documents and building from them.

use std::fs;

use strata_documents::{DocumentError, DocumentLoader, VariableDocument};
use strata_templates::{Name, TemplateError};
use tempfile::tempdir;

const SITE_YAML: &str = r#"
templates:
  - name: parent
    unique_keys: [name]
    variables:
      - name: subsubdomain
        value: subsub
    items:
      - name: "1"
        value:
          name: "{subsubdomain}.{subdomain}.test.com"
      - name: Item 2
        value:
          name: "2.{domain}"
          content: "{domain}"
    children: [child]

  - name: child
    unique_keys: [name, content]
    variables:
      - name: domain
        required: true
      - name: subdomain
        value: sub
    items:
      - name: Item 2
        value:
          name: "2.{domain}"
          content: "{domain}"
      - name: Item 3
        value:
          name: "{subdomain}.test.com"
          content: my-redirect.test.com

groups:
  - name: Group
    templates:
      - parent
      - name: standalone
        category: networking
        items:
          - value:
              name: 2.test.com
              content: "{domain}"
    variables:
      - name: domain
        value: group_domain.com
"#;

#[test]
fn test_build_from_yaml_document() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("site.yaml");
    fs::write(&path, SITE_YAML).unwrap();

    let set = DocumentLoader::load(&path).unwrap();
    assert_eq!(set.root_name().unwrap(), Some("Group".to_string()));

    let build = set.into_builder().unwrap().build().unwrap();
    let data = build.data();

    assert_eq!(data.categories(), vec!["default", "networking"]);

    let default = data.category("default");
    assert_eq!(default.len(), 3);
    assert_eq!(default[0].values["name"], "2.group_domain.com");
    assert_eq!(default[1].values["name"], "sub.test.com");
    assert_eq!(default[2].values["name"], "subsub.sub.test.com");

    let networking = data.category("networking");
    assert_eq!(networking[0].values["content"], "group_domain.com");
    assert_eq!(networking[0].group, Some(Name::from("Group")));
}

#[test]
fn test_user_variable_overrides_document() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("site.yml");
    fs::write(&path, SITE_YAML).unwrap();

    let mut set = DocumentLoader::load(&path).unwrap();
    set.add_user_variable(VariableDocument {
        name: Name::from("domain"),
        value: Some("cli.example".into()),
        required: false,
        description: None,
    });

    let build = set.into_builder().unwrap().build().unwrap();
    assert_eq!(build.data().category("default")[0].values["name"], "2.cli.example");
}

#[test]
fn test_json_and_toml_documents_merge_in_a_directory() {
    let temp = tempdir().unwrap();

    fs::write(
        temp.path().join("a_records.json"),
        r#"{
  "templates": [
    {
      "name": "records",
      "category": "dns",
      "unique_keys": ["host"],
      "variables": [{"name": "zone", "required": true}],
      "items": [
        {"name": "www", "value": {"host": "www.{zone}", "ttl": 300}},
        {"name": "mail", "value": {"host": "mail.{zone}", "ttl": 300}}
      ]
    }
  ]
}"#,
    )
    .unwrap();

    fs::write(
        temp.path().join("b_site.toml"),
        r#"
root = "site"

[[groups]]
name = "site"
templates = ["records"]

[[groups.variables]]
name = "zone"
value = "example.org"

[[user_variables]]
name = "port"
value = 8080
"#,
    )
    .unwrap();

    fs::write(temp.path().join("README.md"), "not a document").unwrap();

    let set = DocumentLoader::load(temp.path()).unwrap();
    assert_eq!(set.template_names().collect::<Vec<_>>(), vec!["records"]);
    assert_eq!(set.group_names().collect::<Vec<_>>(), vec!["site"]);

    let build = set.into_builder().unwrap().build().unwrap();
    let dns = build.data().category("dns");
    assert_eq!(dns.len(), 2);
    assert_eq!(dns[0].values["host"], "www.example.org");
    assert_eq!(dns[0].values["ttl"], 300);
    assert_eq!(dns[1].values["host"], "mail.example.org");

    assert!(build.structure().variable("port").is_some());
}

#[test]
fn test_cycle_between_named_templates() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("cycle.yaml");
    fs::write(
        &path,
        r#"
templates:
  - name: A
    extends: B
  - name: B
    extends: A
user_templates: [A]
"#,
    )
    .unwrap();

    let err = DocumentLoader::load(&path)
        .unwrap()
        .into_builder()
        .unwrap_err();

    match err {
        DocumentError::Template(TemplateError::Cycle { kind, chain }) => {
            assert_eq!(kind, "template");
            assert_eq!(chain, vec!["A", "B", "A"]);
        }
        other => panic!("expected a cycle, got {other}"),
    }
}

#[test]
fn test_duplicate_names_across_files() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("one.yaml"), "templates: [{ name: t }]").unwrap();
    fs::write(temp.path().join("two.yaml"), "templates: [{ name: t }]").unwrap();

    let err = DocumentLoader::load(temp.path()).unwrap_err();
    assert_eq!(err.to_string(), "Duplicate template 't'");
}

#[test]
fn test_unknown_root() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("site.yaml");
    fs::write(&path, "root: missing\ngroups: [{ name: site }]\n").unwrap();

    let err = DocumentLoader::load(&path).unwrap().into_builder().unwrap_err();
    assert!(matches!(err, DocumentError::UnknownGroup { ref name, .. } if name == "missing"));
}

#[test]
fn test_required_variable_error_surfaces_from_build() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("records.yaml");
    fs::write(
        &path,
        r#"
templates:
  - name: records
    variables: [{ name: zone, required: true }]
    items: [{ value: { host: "www.{zone}" } }]
"#,
    )
    .unwrap();

    let builder = DocumentLoader::load(&path).unwrap().into_builder().unwrap();
    let err = builder.build().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Required variable 'zone' in template 'records' has no value"
    );
}
