//! Drop payload contract — palette → canvas transfers.
//!
//! A drag carries a JSON `{type, category, defaultProps}` payload under
//! `DROP_DATA_KEY`. Bad payloads are logged and ignored; the document is
//! only touched once the payload has parsed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Descriptor, DocumentStore};
use crate::frame::ErrorCode;
use crate::registry::DynamicRegistry;

/// Transfer key the palette writes and the canvas reads.
pub const DROP_DATA_KEY: &str = "application/x-composer-component";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPayload {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub default_props: Value,
}

impl From<&Descriptor> for DropPayload {
    fn from(descriptor: &Descriptor) -> Self {
        Self {
            type_id: descriptor.type_id.clone(),
            category: descriptor.category.clone(),
            default_props: descriptor.props.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DropError {
    #[error("drop carried no {DROP_DATA_KEY} data")]
    MissingData,
    #[error("invalid drop payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("drop payload has an empty type")]
    EmptyType,
}

impl ErrorCode for DropError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingData => "E_DROP_MISSING",
            Self::Parse(_) => "E_DROP_PARSE",
            Self::EmptyType => "E_DROP_EMPTY_TYPE",
        }
    }
}

/// Parse the payload stored under `DROP_DATA_KEY` in a transfer map.
///
/// # Errors
///
/// Returns `DropError` if the key is missing, the JSON does not parse, or
/// the type is empty.
pub fn parse_payload(transfer: &HashMap<String, String>) -> Result<DropPayload, DropError> {
    let raw = transfer.get(DROP_DATA_KEY).ok_or(DropError::MissingData)?;
    let payload: DropPayload = serde_json::from_str(raw)?;
    if payload.type_id.trim().is_empty() {
        return Err(DropError::EmptyType);
    }
    Ok(payload)
}

/// Handle a drop: parse, seed props, and append a new selected instance.
///
/// Props come from the registry's sample data when the type is a compiled
/// dynamic component, otherwise from the payload's `defaultProps`. The
/// type does not need to be known anywhere; unknown types render through
/// the generic fallback.
///
/// # Errors
///
/// Returns `DropError` if the payload is unusable. The store is unchanged.
pub fn handle_drop(
    store: &mut DocumentStore,
    registry: &DynamicRegistry,
    transfer: &HashMap<String, String>,
) -> Result<String, DropError> {
    let payload = parse_payload(transfer).inspect_err(|e| {
        warn!(error = %e, "drop: ignoring payload");
    })?;

    let props = registry
        .get_dynamic_component(&payload.type_id)
        .and_then(|_| registry.get_dynamic_component_sample_data(&payload.type_id))
        .cloned()
        .unwrap_or(payload.default_props);
    let id = store.add_component(&Descriptor::new(&payload.type_id, &payload.category, props));
    debug!(%id, type_id = %payload.type_id, "drop: instance added");
    Ok(id)
}
