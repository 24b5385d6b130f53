use super::*;
use crate::document::{Descriptor, DocumentStore};
use serde_json::json;

fn path(segments: &[PathSegment]) -> PropPath {
    PropPath::from(segments.to_vec())
}

fn key(k: &str) -> PathSegment {
    PathSegment::Key(k.to_string())
}

fn navbar_schema() -> Value {
    json!({
        "brand": "Brand",
        "sticky": false,
        "height": 64,
        "links": [{"label": "Home", "href": "/"}],
    })
}

// =========================================================================
// paths
// =========================================================================

#[test]
fn prop_path_display() {
    let p = PropPath::root().push_key("links").push_index(2).push_key("label");
    assert_eq!(p.to_string(), "$.links[2].label");
    assert_eq!(PropPath::root().to_string(), "$");
}

#[test]
fn prop_path_deserializes_mixed_segments() {
    let p: PropPath = serde_json::from_value(json!(["links", 0, "href"])).unwrap();
    assert_eq!(p.segments(), &[key("links"), PathSegment::Index(0), key("href")]);
}

// =========================================================================
// build_editor
// =========================================================================

#[test]
fn editor_walks_schema_keys_with_typed_controls() {
    let value = json!({"brand": "Acme", "sticky": true, "height": 80, "links": []});
    let FieldNode::Object { fields, .. } = build_editor(&value, &navbar_schema()) else {
        panic!("expected object root");
    };

    assert_eq!(fields.len(), 4);
    let controls: Vec<_> = fields
        .iter()
        .filter_map(|f| match f {
            FieldNode::Primitive { label, control, value, .. } => Some((label.as_str(), *control, value.as_str())),
            _ => None,
        })
        .collect();
    assert!(controls.contains(&("brand", Control::Text, "Acme")));
    assert!(controls.contains(&("sticky", Control::Checkbox, "true")));
    assert!(controls.contains(&("height", Control::Number, "80")));
}

#[test]
fn editor_array_items_follow_current_value_against_template() {
    let value = json!({"links": [{"label": "A", "href": "/a"}, {"label": "B", "href": "/b"}]});
    let FieldNode::Object { fields, .. } = build_editor(&value, &navbar_schema()) else {
        panic!("expected object root");
    };
    let links = fields.iter().find(|f| f.path().to_string() == "$.links").unwrap();
    let FieldNode::Array { items, can_append, .. } = links else {
        panic!("expected array node");
    };
    assert_eq!(items.len(), 2);
    assert!(*can_append);
    assert_eq!(items[1].path().to_string(), "$.links[1]");
}

#[test]
fn editor_treats_missing_and_null_as_editable_text() {
    let FieldNode::Object { fields, .. } = build_editor(&json!({"brand": null}), &json!({"brand": "x", "tag": "y"})) else {
        panic!("expected object root");
    };
    assert!(fields.iter().all(|f| matches!(f, FieldNode::Primitive { control: Control::Text, value, .. } if value.is_empty())));
}

#[test]
fn editor_marks_diverged_shapes() {
    let FieldNode::Object { fields, .. } = build_editor(&json!({"links": "oops"}), &navbar_schema()) else {
        panic!("expected object root");
    };
    let links = fields.iter().find(|f| f.path().to_string() == "$.links").unwrap();
    assert!(matches!(
        links,
        FieldNode::Mismatch { expected: PropKind::Array, found: PropKind::String, .. }
    ));
}

// =========================================================================
// apply_edit: primitives
// =========================================================================

#[test]
fn input_on_text_field_passes_raw_string() {
    let props = json!({"brand": "Acme", "height": 64});
    let next = apply_edit(&props, &navbar_schema(), &path(&[key("brand")]), &EditOp::Input("  New ".into())).unwrap();
    assert_eq!(next, json!({"brand": "  New ", "height": 64}));
}

#[test]
fn input_on_number_field_parses() {
    let props = json!({"height": 64});
    let schema = navbar_schema();
    let at = path(&[key("height")]);

    assert_eq!(apply_edit(&props, &schema, &at, &EditOp::Input("72".into())).unwrap()["height"], json!(72));
    assert_eq!(apply_edit(&props, &schema, &at, &EditOp::Input("1.5".into())).unwrap()["height"], json!(1.5));
    assert!(matches!(
        apply_edit(&props, &schema, &at, &EditOp::Input("tall".into())),
        Err(EditError::InvalidNumber { .. })
    ));
}

#[test]
fn toggle_sets_boolean() {
    let next = apply_edit(&json!({"sticky": false}), &navbar_schema(), &path(&[key("sticky")]), &EditOp::Toggle(true)).unwrap();
    assert_eq!(next["sticky"], json!(true));
}

#[test]
fn toggle_on_text_field_is_rejected() {
    let err = apply_edit(&json!({"brand": "x"}), &navbar_schema(), &path(&[key("brand")]), &EditOp::Toggle(true)).unwrap_err();
    assert!(matches!(err, EditError::ShapeMismatch { .. }));
}

#[test]
fn edit_nested_array_field_rewrites_whole_props() {
    let props = json!({
        "brand": "Acme",
        "links": [{"label": "A", "href": "/a"}, {"label": "B", "href": "/b"}],
    });
    let at = path(&[key("links"), PathSegment::Index(1), key("label")]);
    let next = apply_edit(&props, &navbar_schema(), &at, &EditOp::Input("Blog".into())).unwrap();

    assert_eq!(next["brand"], "Acme");
    assert_eq!(next["links"][0], json!({"label": "A", "href": "/a"}));
    assert_eq!(next["links"][1], json!({"label": "Blog", "href": "/b"}));
}

#[test]
fn edit_fills_missing_nested_object() {
    let schema = json!({"style": {"color": "red"}});
    let next = apply_edit(&json!({}), &schema, &path(&[key("style"), key("color")]), &EditOp::Input("blue".into())).unwrap();
    assert_eq!(next, json!({"style": {"color": "blue"}}));
}

#[test]
fn edit_outside_schema_is_rejected() {
    let err = apply_edit(&json!({}), &navbar_schema(), &path(&[key("bogus")]), &EditOp::Input("x".into())).unwrap_err();
    assert_eq!(err, EditError::UnknownField { path: "$.bogus".into() });
}

// =========================================================================
// apply_edit: arrays
// =========================================================================

#[test]
fn append_pushes_fresh_template_clone() {
    let props = json!({"links": [{"label": "A", "href": "/a"}]});
    let next = apply_edit(&props, &navbar_schema(), &path(&[key("links")]), &EditOp::Append).unwrap();
    assert_eq!(
        next["links"],
        json!([{"label": "A", "href": "/a"}, {"label": "Home", "href": "/"}])
    );
}

#[test]
fn append_to_missing_array_starts_empty() {
    let next = apply_edit(&json!({}), &navbar_schema(), &path(&[key("links")]), &EditOp::Append).unwrap();
    assert_eq!(next["links"], json!([{"label": "Home", "href": "/"}]));
}

#[test]
fn append_without_template_is_rejected() {
    let err = apply_edit(&json!({"tags": ["a"]}), &json!({"tags": []}), &path(&[key("tags")]), &EditOp::Append).unwrap_err();
    assert!(matches!(err, EditError::MissingTemplate { .. }));
}

#[test]
fn remove_at_drops_one_element() {
    let props = json!({"links": [{"label": "A"}, {"label": "B"}, {"label": "C"}]});
    let next = apply_edit(&props, &navbar_schema(), &path(&[key("links")]), &EditOp::RemoveAt(1)).unwrap();
    assert_eq!(next["links"], json!([{"label": "A"}, {"label": "C"}]));

    let err = apply_edit(&props, &navbar_schema(), &path(&[key("links")]), &EditOp::RemoveAt(3)).unwrap_err();
    assert!(matches!(err, EditError::IndexOutOfBounds { index: 3, .. }));
}

// =========================================================================
// shape divergence
// =========================================================================

#[test]
fn structural_edit_on_diverged_value_is_rejected() {
    let props = json!({"links": "not-a-list"});
    let err = apply_edit(&props, &navbar_schema(), &path(&[key("links")]), &EditOp::Append).unwrap_err();
    assert_eq!(
        err,
        EditError::ShapeMismatch { path: "$.links".into(), expected: PropKind::Array, found: PropKind::String }
    );
}

#[test]
fn structural_edit_on_diverged_schema_is_rejected() {
    let schema = json!({"links": "flat"});
    let props = json!({"links": [{"label": "A"}]});
    let err = apply_edit(&props, &schema, &path(&[key("links")]), &EditOp::RemoveAt(0)).unwrap_err();
    assert!(matches!(err, EditError::ShapeMismatch { .. }));
}

#[test]
fn non_object_props_are_rejected() {
    let err = apply_edit(&json!([1, 2]), &navbar_schema(), &PropPath::root(), &EditOp::Append).unwrap_err();
    assert!(matches!(err, EditError::ShapeMismatch { expected: PropKind::Object, .. }));
}

// =========================================================================
// end to end with the store
// =========================================================================

#[test]
fn edit_result_flows_through_update_component() {
    let mut store = DocumentStore::new();
    let id = store.add_component(&Descriptor::new("hero", "layout", json!({"title": "Old", "size": "lg"})));
    let schema = json!({"title": "", "size": ""});

    let instance = store.get(&id).unwrap();
    let next = apply_edit(&instance.props, &schema, &path(&[key("title")]), &EditOp::Input("New".into())).unwrap();
    store.update_component(&id, &next);

    assert_eq!(store.get(&id).unwrap().props, json!({"title": "New", "size": "lg"}));
}

#[test]
fn schema_comes_from_sample_then_builtin_then_props() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    registry.register(
        &Descriptor::new("quote-box", "generated", json!({"quote": "sample"}))
            .with_source(r#"fn render(props) { el("blockquote", [props.quote]) }"#),
    );
    let mut store = DocumentStore::new();
    let dynamic = store.add_component(&Descriptor::new("quote-box", "generated", json!({"quote": "mine"})));
    let builtin = store.add_component(&BuiltinKind::Button.descriptor());
    let unknown = store.add_component(&Descriptor::new("mystery", "misc", json!({"x": 1})));

    assert_eq!(schema_for(store.get(&dynamic).unwrap(), &resolver, &registry), json!({"quote": "sample"}));
    assert_eq!(schema_for(store.get(&builtin).unwrap(), &resolver, &registry), BuiltinKind::Button.default_props());
    assert_eq!(schema_for(store.get(&unknown).unwrap(), &resolver, &registry), json!({"x": 1}));
}
