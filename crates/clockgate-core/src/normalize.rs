// ── Response normalization ──
//
// Device firmware disagrees on field names. Every lookup here walks an
// explicit, ordered candidate list so that normalization is a pure
// function of the payload (plus the clock, for the last-resort uid).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;

const USER_CONTAINER_KEYS: [&str; 3] = ["users", "data", "results"];

const CPF_FIELDS: [&str; 3] = ["cpf", "user_cpf", "document"];
const REGISTRATION_FIELDS: [&str; 3] = ["registration", "user_registration", "pis"];
const RFID_FIELDS: [&str; 4] = ["rfid", "card", "card_number", "badge"];
const UID_FIELDS: [&str; 3] = ["id", "code", "user_id"];

const FACE_FLAG_FIELD: &str = "has_face";
const FACE_TEMPLATE_LIST: &str = "templates";
const FACE_TEMPLATE_KIND_FIELDS: [&str; 2] = ["type", "modality"];
const FACE_LIST: &str = "faces";
const FACE_BLOB_FIELDS: [&str; 3] = ["face", "face_template", "template_face"];

const COIL_FIELDS: [&str; 2] = ["coil_paper", "coilPaper"];
const COIL_WRAPPER_KEYS: [&str; 2] = ["respostas", "responses"];

/// A device user record in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedUser {
    pub uid: String,
    pub name: String,
    pub cpf: Option<String>,
    pub registration: Option<String>,
    pub rfid: Option<String>,
    pub has_face: bool,
    /// The record exactly as the device returned it.
    pub raw: Map<String, Value>,
}

/// Normalize every object record found under the first list-valued
/// container key. Anything else yields an empty list.
pub fn normalize_users(payload: &Value) -> Vec<NormalizedUser> {
    let Some(list) = USER_CONTAINER_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
    else {
        return Vec::new();
    };

    list.iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(index, raw)| normalize_user(raw, index))
        .collect()
}

fn normalize_user(raw: &Map<String, Value>, index: usize) -> NormalizedUser {
    let cpf = first_string(raw, &CPF_FIELDS);
    let registration = first_string(raw, &REGISTRATION_FIELDS);
    let rfid = first_string(raw, &RFID_FIELDS);

    let uid = first_string(raw, &UID_FIELDS)
        .or_else(|| cpf.clone())
        .or_else(|| registration.clone())
        .unwrap_or_else(|| {
            format!("user-{index}-{}", chrono::Utc::now().timestamp_millis())
        });

    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| format!("User {}", index + 1), ToOwned::to_owned);

    NormalizedUser {
        uid,
        name,
        cpf,
        registration,
        rfid,
        has_face: has_face(raw),
        raw: raw.clone(),
    }
}

fn has_face(raw: &Map<String, Value>) -> bool {
    if raw.get(FACE_FLAG_FIELD).and_then(Value::as_bool) == Some(true) {
        return true;
    }

    let face_template = raw
        .get(FACE_TEMPLATE_LIST)
        .and_then(Value::as_array)
        .is_some_and(|templates| templates.iter().any(is_face_template));
    if face_template {
        return true;
    }

    if raw
        .get(FACE_LIST)
        .and_then(Value::as_array)
        .is_some_and(|faces| !faces.is_empty())
    {
        return true;
    }

    FACE_BLOB_FIELDS
        .iter()
        .any(|field| raw.get(*field).is_some_and(is_truthy))
}

fn is_face_template(template: &Value) -> bool {
    FACE_TEMPLATE_KIND_FIELDS.iter().any(|field| {
        template
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|kind| kind.to_ascii_lowercase().contains("face"))
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First candidate field holding a non-empty string or a number.
fn first_string(raw: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| raw.get(*field).and_then(coerce_string))
}

/// Strings are trimmed and must be non-empty; numbers render as text.
pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A finite number, or a string that parses to one.
pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

// ── Coil paper ───────────────────────────────────────────────────────

/// Remaining paper reading from a `get_coil_paper` payload.
///
/// The flat field wins; otherwise the same field is looked up inside a
/// response wrapper whose key matches case-insensitively.
pub fn extract_coil_reading(payload: &Value) -> Result<f64, CoreError> {
    let flat = COIL_FIELDS.iter().filter_map(|field| payload.get(*field));
    let nested = response_wrapper(payload)
        .into_iter()
        .flat_map(|wrapper| COIL_FIELDS.iter().filter_map(move |field| wrapper.get(*field)));

    flat.chain(nested)
        .find_map(coerce_f64)
        .ok_or_else(|| CoreError::protocol("coil paper reading missing from device response"))
}

fn response_wrapper(payload: &Value) -> Option<&Map<String, Value>> {
    let object = payload.as_object()?;
    COIL_WRAPPER_KEYS.iter().find_map(|candidate| {
        object
            .iter()
            .find(|(key, value)| key.eq_ignore_ascii_case(candidate) && value.is_object())
            .and_then(|(_, value)| value.as_object())
    })
}
