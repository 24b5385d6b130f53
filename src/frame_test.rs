use super::*;
use serde_json::json;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("canvas:add", Data::new());
    assert_eq!(frame.syscall, "canvas:add");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.session_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_session_and_syscall() {
    let session_id = Uuid::new_v4();
    let req = Frame::request("canvas:update", Data::new()).with_session_id(session_id);
    let item = req.item(Data::new());

    assert_eq!(item.parent_id, Some(req.id));
    assert_eq!(item.session_id, Some(session_id));
    assert_eq!(item.syscall, "canvas:update");
    assert_eq!(item.status, Status::Item);
}

#[test]
fn done_with_carries_payload() {
    let req = Frame::request("canvas:list", Data::new());
    let done = req.done_with(Data::from([("n".to_string(), json!(2))]));
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.data.get("n"), Some(&json!(2)));
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn prefix_extraction() {
    assert_eq!(Frame::request("generate:prompt", Data::new()).prefix(), "generate");
    assert_eq!(Frame::request("noseparator", Data::new()).prefix(), "noseparator");
}

#[test]
fn inbound_frame_without_data_parses() {
    let raw = json!({
        "id": Uuid::new_v4(),
        "parent_id": null,
        "ts": 1,
        "syscall": "canvas:list",
        "status": "request"
    });
    let frame: Frame = serde_json::from_value(raw).unwrap();
    assert!(frame.data.is_empty());
    assert!(frame.session_id.is_none());
}

#[test]
fn field_accessors() {
    let frame = Frame::request("canvas:move", Data::new())
        .with_data("id", "component-1")
        .with_data("direction", "up")
        .with_data("props", json!({"a": 1}));

    assert_eq!(frame.str_field("id"), Some("component-1"));
    assert_eq!(frame.str_field("missing"), None);
    assert_eq!(frame.field::<serde_json::Map<String, Value>>("props").map(|m| m.len()), Some(1));
    assert_eq!(frame.field::<u32>("id"), None);
}

#[test]
fn data_from_flattens_objects() {
    let data = data_from(&json!({"id": "x", "n": 2}));
    assert_eq!(data.get("id"), Some(&json!("x")));

    let data = data_from(&vec![1, 2]);
    assert_eq!(data.get("value"), Some(&json!([1, 2])));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("gone")]
    struct Gone;

    impl ErrorCode for Gone {
        fn error_code(&self) -> &'static str {
            "E_GONE"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let err = Frame::request("canvas:delete", Data::new()).error_from(&Gone);
    assert_eq!(err.status, Status::Error);
    assert_eq!(err.str_field(FRAME_CODE), Some("E_GONE"));
    assert_eq!(err.str_field(FRAME_MESSAGE), Some("gone"));
    assert_eq!(err.data.get(FRAME_RETRYABLE).and_then(Value::as_bool), Some(true));
}

#[test]
fn cancel_references_target() {
    let req = Frame::request("generate:prompt", Data::new());
    let cancel = Frame::cancel(req.id);

    assert_eq!(cancel.parent_id, Some(req.id));
    assert_eq!(cancel.status, Status::Cancel);
}
