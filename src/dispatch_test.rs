use super::*;
use crate::document::Descriptor;
use serde_json::json;

const SHADOW_NAVBAR: &str = r#"fn render(props) { el("nav", #{ class: "generated" }, [props.brand]) }"#;

fn compiled(registry: &mut DynamicRegistry, type_id: &str, source: &str, props: Value) {
    let outcome = registry.register(&Descriptor::new(type_id, "generated", props).with_source(source));
    assert!(outcome.is_ok(), "{outcome:?}");
}

// =========================================================================
// normalization
// =========================================================================

#[test]
fn pascal_case_transform() {
    assert_eq!(to_pascal_case("hero-section"), "HeroSection");
    assert_eq!(to_pascal_case("navbar"), "Navbar");
    assert_eq!(to_pascal_case("a--b-"), "AB");
    assert_eq!(to_pascal_case(""), "");
}

#[test]
fn special_cases_override_transform() {
    let resolver = TypeResolver::new();
    assert_eq!(resolver.canonical_name("ao-message-signer"), "AOMessageSigner");
    assert_eq!(to_pascal_case("ao-message-signer"), "AoMessageSigner");
    assert_eq!(resolver.canonical_name("feature-grid"), "FeatureGrid");
}

#[test]
fn lookup_static_covers_library_ids_and_aliases() {
    let resolver = TypeResolver::new();
    for kind in BuiltinKind::ALL {
        assert_eq!(resolver.lookup_static(kind.type_id()), Some(kind), "{}", kind.type_id());
    }
    assert_eq!(resolver.lookup_static("nav-bar"), Some(BuiltinKind::Navbar));
    assert_eq!(resolver.lookup_static("Hero-Section"), Some(BuiltinKind::HeroSection));
    assert_eq!(resolver.lookup_static("hero"), None);
}

// =========================================================================
// tiers
// =========================================================================

#[test]
fn static_type_resolves_to_builtin() {
    let resolver = TypeResolver::new();
    let registry = DynamicRegistry::default();
    let resolved = resolver.resolve("hero-section", &registry);
    assert_eq!(resolved, Resolved::Static(BuiltinKind::HeroSection));
    assert_eq!(resolved.tier(), Tier::Static);
}

#[test]
fn unknown_type_resolves_to_generic_fallback() {
    let resolver = TypeResolver::new();
    let registry = DynamicRegistry::default();
    let resolved = resolver.resolve("totally-unregistered-thing", &registry);

    assert_eq!(resolved.tier(), Tier::Fallback);
    let node = resolved.render(&json!({}));
    assert!(node.text_content().contains("totally-unregistered-thing"));
}

#[test]
fn dynamic_entry_shadows_builtin() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    assert_eq!(resolver.resolve("navbar", &registry).tier(), Tier::Static);

    compiled(&mut registry, "navbar", SHADOW_NAVBAR, json!({"brand": "Gen"}));

    let resolved = resolver.resolve("navbar", &registry);
    assert_eq!(resolved.tier(), Tier::Dynamic);
    assert_eq!(resolved.render(&json!({"brand": "Acme"})).attr_value("class"), Some("generated"));
}

#[test]
fn dynamic_lookup_uses_raw_id_not_canonical_name() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    compiled(&mut registry, "nav-bar", SHADOW_NAVBAR, json!({"brand": "Gen"}));

    assert_eq!(resolver.resolve("nav-bar", &registry).tier(), Tier::Dynamic);
    assert_eq!(resolver.resolve("navbar", &registry).tier(), Tier::Static);
}

#[test]
fn failed_entry_resolves_to_diagnostic_without_static_fallthrough() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    registry.register(&Descriptor::new("navbar", "generated", json!({})).with_source("syntax error("));

    let resolved = resolver.resolve("navbar", &registry);
    assert_eq!(resolved.tier(), Tier::Diagnostic);
    let text = resolved.render(&json!({})).text_content();
    assert!(text.contains("navbar"));
    assert!(text.contains("syntax error"));
}

#[test]
fn resolution_is_deterministic() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    compiled(&mut registry, "quote-box", SHADOW_NAVBAR, json!({"brand": "x"}));

    for type_id in ["quote-box", "hero-section", "nope"] {
        let first = resolver.resolve(type_id, &registry);
        let second = resolver.resolve(type_id, &registry);
        assert_eq!(first, second, "{type_id}");
    }
}

#[test]
fn re_registration_changes_renderer_identity() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    compiled(&mut registry, "quote-box", SHADOW_NAVBAR, json!({"brand": "x"}));
    let before = resolver.resolve("quote-box", &registry);
    compiled(&mut registry, "quote-box", SHADOW_NAVBAR, json!({"brand": "x"}));
    let after = resolver.resolve("quote-box", &registry);
    assert_ne!(before, after);
}

#[test]
fn dynamic_runtime_failure_renders_diagnostic() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    let source = r#"fn render(props) { if props.fail { throw "kaboom" } "fine" }"#;
    compiled(&mut registry, "fragile", source, json!({"fail": false}));

    let resolved = resolver.resolve("fragile", &registry);
    let node = resolved.render(&json!({"fail": true}));
    assert_eq!(node.attr_value("class"), Some(crate::render::DIAGNOSTIC_CLASS));
    assert!(node.text_content().contains("kaboom"));
}

// =========================================================================
// document rendering
// =========================================================================

#[test]
fn compile_failure_isolated_from_other_instances() {
    let resolver = TypeResolver::new();
    let mut registry = DynamicRegistry::default();
    let mut store = DocumentStore::new();
    compiled(&mut registry, "quote-box", SHADOW_NAVBAR, json!({"brand": "q"}));
    store.add_component(&Descriptor::new("quote-box", "generated", json!({"brand": "q"})));
    store.add_component(&BuiltinKind::TextBlock.descriptor());

    let before = resolver.render_document(&store, &registry);

    store.add_generated_components(
        &mut registry,
        &[Descriptor::new("custom-widget", "generated", json!({})).with_source("syntax error(")],
    );
    let after = resolver.render_document(&store, &registry);

    assert_eq!(after.len(), 3);
    assert_eq!(before[0].node, after[0].node);
    assert_eq!(before[1].node, after[1].node);
    assert_eq!(after[2].tier, Tier::Diagnostic);
    assert!(after[2].node.text_content().contains("custom-widget"));
}

#[test]
fn dropped_unknown_type_renders_fallback_alongside_others() {
    let resolver = TypeResolver::new();
    let registry = DynamicRegistry::default();
    let mut store = DocumentStore::new();
    store.add_component(&BuiltinKind::Button.descriptor());
    store.add_component(&Descriptor::new("totally-unregistered-thing", "misc", json!({})));

    let rendered = resolver.render_document(&store, &registry);
    assert_eq!(rendered[0].tier, Tier::Static);
    assert_eq!(rendered[1].tier, Tier::Fallback);
    assert!(rendered[1].node.text_content().contains("totally-unregistered-thing"));
}
