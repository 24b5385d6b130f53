use super::*;
use crate::builtins::BuiltinKind;
use crate::drop::DROP_DATA_KEY;
use crate::editor::PathSegment;
use crate::frame::ErrorCode;
use crate::state::test_helpers;
use serde_json::json;

async fn session_with(descriptors: &[Descriptor]) -> (AppState, Uuid) {
    let state = test_helpers::test_app_state();
    let session_id = test_helpers::seed_session(&state, descriptors).await;
    (state, session_id)
}

// =========================================================================
// mutations
// =========================================================================

#[tokio::test]
async fn add_returns_selected_instance() {
    let (state, session_id) = session_with(&[]).await;
    let added = add(&state, session_id, &BuiltinKind::Button.descriptor()).await.unwrap();

    let snapshot = list(&state, session_id).await.unwrap();
    assert_eq!(snapshot.components.len(), 1);
    assert_eq!(snapshot.selected.as_deref(), Some(added.id.as_str()));
}

#[tokio::test]
async fn add_rejects_blank_type() {
    let (state, session_id) = session_with(&[]).await;
    let err = add(&state, session_id, &Descriptor::new(" ", "x", json!({}))).await.unwrap_err();
    assert_eq!(err.error_code(), "E_BAD_REQUEST");
}

#[tokio::test]
async fn unknown_session_is_reported() {
    let state = test_helpers::test_app_state();
    let err = list(&state, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CanvasError::SessionNotFound(_)));
}

#[tokio::test]
async fn update_merges_and_reports_missing_ids() {
    let (state, session_id) = session_with(&[Descriptor::new("hero", "layout", json!({"title": "Old", "size": "lg"}))]).await;
    let id = list(&state, session_id).await.unwrap().components[0].id.clone();

    let updated = update(&state, session_id, &id, &json!({"title": "New"})).await.unwrap();
    assert_eq!(updated.props, json!({"title": "New", "size": "lg"}));

    let err = update(&state, session_id, "ghost", &json!({})).await.unwrap_err();
    assert!(matches!(err, CanvasError::ComponentNotFound(_)));
}

#[tokio::test]
async fn edit_uses_builtin_defaults_as_schema() {
    let (state, session_id) = session_with(&[BuiltinKind::Navbar.descriptor()]).await;
    let id = list(&state, session_id).await.unwrap().components[0].id.clone();

    let at = PropPath::from(vec![PathSegment::Key("links".into())]);
    let edited = edit(&state, session_id, &id, &at, &EditOp::Append).await.unwrap();
    assert_eq!(edited.props["links"].as_array().map(Vec::len), Some(2));

    let at = PropPath::from(vec![PathSegment::Key("links".into()), PathSegment::Index(1), PathSegment::Key("label".into())]);
    let edited = edit(&state, session_id, &id, &at, &EditOp::Input("About".into())).await.unwrap();
    assert_eq!(edited.props["links"][1]["label"], "About");
}

#[tokio::test]
async fn rejected_edit_leaves_props_untouched() {
    let (state, session_id) = session_with(&[BuiltinKind::Navbar.descriptor()]).await;
    let id = list(&state, session_id).await.unwrap().components[0].id.clone();
    update(&state, session_id, &id, &json!({"links": "flattened"})).await.unwrap();

    let at = PropPath::from(vec![PathSegment::Key("links".into())]);
    let err = edit(&state, session_id, &id, &at, &EditOp::Append).await.unwrap_err();
    assert_eq!(err.error_code(), "E_SHAPE_MISMATCH");

    let snapshot = list(&state, session_id).await.unwrap();
    assert_eq!(snapshot.components[0].props["links"], "flattened");
}

#[tokio::test]
async fn drop_appends_instance() {
    let (state, session_id) = session_with(&[]).await;
    let transfer = HashMap::from([(
        DROP_DATA_KEY.to_string(),
        r#"{"type":"totally-unregistered-thing","category":"misc","defaultProps":{}}"#.to_string(),
    )]);
    let dropped = drop_payload(&state, session_id, &transfer).await.unwrap();
    assert_eq!(dropped.type_id, "totally-unregistered-thing");

    let rendered = render(&state, session_id).await.unwrap();
    assert_eq!(rendered[0].tier, Tier::Fallback);
}

#[tokio::test]
async fn bad_drop_surfaces_drop_error() {
    let (state, session_id) = session_with(&[]).await;
    let err = drop_payload(&state, session_id, &HashMap::new()).await.unwrap_err();
    assert_eq!(err.error_code(), "E_DROP_MISSING");
}

#[tokio::test]
async fn select_delete_and_move() {
    let (state, session_id) = session_with(&[BuiltinKind::Button.descriptor(), BuiltinKind::Footer.descriptor()]).await;
    let ids: Vec<String> = list(&state, session_id)
        .await
        .unwrap()
        .components
        .into_iter()
        .map(|c| c.id)
        .collect();

    assert_eq!(select(&state, session_id, Some(&ids[0])).await.unwrap().as_deref(), Some(ids[0].as_str()));
    assert_eq!(select(&state, session_id, Some("ghost")).await.unwrap(), None);

    assert!(move_component(&state, session_id, &ids[1], Direction::Up).await.unwrap());
    assert!(!move_component(&state, session_id, &ids[1], Direction::Up).await.unwrap());

    delete(&state, session_id, &ids[0]).await.unwrap();
    assert!(matches!(
        delete(&state, session_id, &ids[0]).await,
        Err(CanvasError::ComponentNotFound(_))
    ));
    assert_eq!(list(&state, session_id).await.unwrap().components.len(), 1);
}

// =========================================================================
// queries
// =========================================================================

#[tokio::test]
async fn inspect_defaults_to_selection() {
    let (state, session_id) = session_with(&[]).await;
    assert!(matches!(inspect(&state, session_id, None).await, Err(CanvasError::BadRequest(_))));

    add(&state, session_id, &BuiltinKind::CTASection.descriptor()).await.unwrap();
    let inspection = inspect(&state, session_id, None).await.unwrap();
    assert_eq!(inspection.tier, Tier::Static);
    assert_eq!(inspection.canonical_name, "CTASection");
    assert!(inspection.available);
    assert!(matches!(inspection.editor, FieldNode::Object { .. }));
    assert!(inspection.compile_error.is_none());
}

#[tokio::test]
async fn inspect_reports_compile_errors() {
    let (state, session_id) = session_with(&[]).await;
    {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&session_id).unwrap();
        session.store.add_generated_components(
            &mut session.registry,
            &[Descriptor::new("custom-widget", "generated", json!({})).with_source("syntax error(")],
        );
    }
    let id = list(&state, session_id).await.unwrap().components[0].id.clone();

    let inspection = inspect(&state, session_id, Some(&id)).await.unwrap();
    assert_eq!(inspection.tier, Tier::Diagnostic);
    assert!(inspection.compile_error.is_some());

    let status = registry_status(&state, session_id).await.unwrap();
    assert_eq!(status.len(), 1);
    assert!(!status[0].compiled);
}

#[tokio::test]
async fn export_joins_document() {
    let (state, session_id) = session_with(&[
        Descriptor::new("button", "basic", json!({"label": "Go"})),
        Descriptor::new("ao-message-signer", "arweave", json!({})),
    ])
    .await;
    let code = export(&state, session_id).await.unwrap();
    assert_eq!(code, "<Button label=\"Go\" />\n\n<AOMessageSigner />");
}
