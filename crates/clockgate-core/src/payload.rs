// ── Request payload builders ──
//
// Turn loosely typed caller input into the exact bodies the terminals
// accept. Numeric fields accept JSON numbers or numeric strings; integers
// keep their integer representation on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

use crate::error::CoreError;

pub const DEFAULT_LIST_LIMIT: u64 = 100;

type Record = Map<String, Value>;

// ── Coercion helpers ─────────────────────────────────────────────────

fn as_record(data: &Value) -> Result<&Record, CoreError> {
    data.as_object()
        .ok_or_else(|| CoreError::validation("invalid request body"))
}

/// Integers beyond this magnitude are not exact as `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A JSON number, or a string holding one. Non-finite values are rejected.
fn optional_number(value: Option<&Value>) -> Option<Number> {
    match value? {
        Value::Number(n) => Some(canonical(n)),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Integral floats become integers, so `4`, `4.0` and `"4e0"` compare equal
/// and go on the wire as `4`.
fn canonical(n: &Number) -> Number {
    if n.is_f64() {
        if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER) {
            #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
            let int = f as i64;
            return Number::from(int);
        }
    }
    n.clone()
}

fn parse_number(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int.into());
    }
    if let Ok(uint) = trimmed.parse::<u64>() {
        return Some(uint.into());
    }
    let float = trimmed.parse::<f64>().ok().and_then(Number::from_f64)?;
    Some(canonical(&float))
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn require_cpf(record: &Record) -> Result<Number, CoreError> {
    optional_number(record.get("cpf")).ok_or_else(|| CoreError::validation("CPF is required"))
}

/// `primary ?? fallback`: the fallback is used only when the primary key is
/// absent or null.
fn either<'a>(record: &'a Record, primary: &str, fallback: &str) -> Option<&'a Value> {
    record
        .get(primary)
        .filter(|value| !value.is_null())
        .or_else(|| record.get(fallback))
}

fn image_of(record: &Record) -> Option<String> {
    optional_string(either(record, "imageBase64", "image"))
}

fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

// ── Builders ─────────────────────────────────────────────────────────

/// `{users:[{cpf, name?, bars?, code?, password?, rfid?, admin?}]}`
pub fn build_general_update(data: &Value) -> Result<Value, CoreError> {
    let record = as_record(data)?;
    let mut user = Record::new();
    user.insert("cpf".into(), require_cpf(record)?.into());

    for field in ["name", "bars", "password"] {
        if let Some(text) = optional_string(record.get(field)) {
            user.insert(field.into(), text.into());
        }
    }
    for field in ["code", "rfid"] {
        if let Some(number) = optional_number(record.get(field)) {
            user.insert(field.into(), number.into());
        }
    }
    if let Some(admin) = record.get("admin").and_then(Value::as_bool) {
        user.insert("admin".into(), admin.into());
    }

    Ok(json!({ "users": [user] }))
}

/// `{do_match, users:[...]}` from either a batch (`{users:[...], do_match?}`)
/// or a single user object.
pub fn build_user_creation(data: &Value) -> Result<Value, CoreError> {
    let record = as_record(data)?;

    if let Some(batch) = record
        .get("users")
        .and_then(Value::as_array)
        .filter(|batch| !batch.is_empty())
    {
        let users = batch
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .as_object()
                    .ok_or_else(|| {
                        CoreError::validation(format!("invalid user at position {}", index + 1))
                    })
                    .and_then(creation_entry)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let do_match = record
            .get("do_match")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return Ok(json!({ "do_match": do_match, "users": users }));
    }

    Ok(json!({ "do_match": false, "users": [creation_entry(record)?] }))
}

fn creation_entry(record: &Record) -> Result<Value, CoreError> {
    let name = optional_string(record.get("name"))
        .ok_or_else(|| CoreError::validation("name is required"))?;
    let mut user = Record::new();
    user.insert("name".into(), name.into());
    user.insert("cpf".into(), require_cpf(record)?.into());

    if let Some(code) = optional_number(record.get("code")) {
        user.insert("code".into(), code.into());
    }
    if let Some(registration) = optional_number(either(record, "registration", "bars")) {
        user.insert("registration".into(), registration.into());
    }
    if let Some(rfid) = optional_number(record.get("rfid")) {
        user.insert("rfid".into(), rfid.into());
    }
    if let Some(admin) = record.get("admin").and_then(Value::as_bool) {
        user.insert("admin".into(), admin.into());
    }
    if let Some(password) = optional_string(record.get("password")) {
        user.insert("password".into(), password.into());
    }
    if let Some(image) = image_of(record) {
        user.insert("image".into(), image.into());
        let timestamp = optional_number(record.get("image_timestamp"))
            .unwrap_or_else(|| now_timestamp().into());
        user.insert("image_timestamp".into(), timestamp.into());
    }

    Ok(Value::Object(user))
}

/// `{do_match:false, users:[{cpf, image, image_timestamp}]}`
pub fn build_photo_update(data: &Value) -> Result<Value, CoreError> {
    let record = as_record(data)?;
    let cpf = require_cpf(record)?;
    let image = image_of(record).ok_or_else(|| CoreError::validation("image is required"))?;
    Ok(json!({
        "do_match": false,
        "users": [{ "cpf": cpf, "image": image, "image_timestamp": now_timestamp() }]
    }))
}

/// `{users:[{cpf, remove_faces:true}]}`
pub fn build_photo_removal(data: &Value) -> Result<Value, CoreError> {
    let record = as_record(data)?;
    let cpf = require_cpf(record)?;
    Ok(json!({ "users": [{ "cpf": cpf, "remove_faces": true }] }))
}

/// `{users:[cpf, ...]}` from `cpf` and `cpfs`, first occurrence kept.
pub fn build_user_deletion(data: &Value) -> Result<Value, CoreError> {
    let record = as_record(data)?;
    let mut cpfs: Vec<Number> = Vec::new();

    let candidates = optional_number(record.get("cpf"))
        .into_iter()
        .chain(record.get("cpfs").map(parse_cpf_filter).unwrap_or_default());
    for cpf in candidates {
        if !cpfs.contains(&cpf) {
            cpfs.push(cpf);
        }
    }

    if cpfs.is_empty() {
        return Err(CoreError::validation("at least one CPF is required"));
    }
    Ok(json!({ "users": cpfs }))
}

// ── Listing ──────────────────────────────────────────────────────────

/// CPF identifiers from a list or a comma-separated string. Entries that
/// are not finite numbers are dropped.
pub fn parse_cpf_filter(value: &Value) -> Vec<Number> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| optional_number(Some(item)))
            .collect(),
        Value::String(text) => text.split(',').filter_map(parse_number).collect(),
        Value::Number(n) => vec![canonical(n)],
        _ => Vec::new(),
    }
}

/// Which selection a listing request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListFilter {
    Cpf,
    Range,
}

/// Pagination or identifier filter for `load_users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub limit: u64,
    pub offset: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpfs: Vec<Number>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            cpfs: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            cpfs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cpfs(mut self, cpfs: Vec<Number>) -> Self {
        self.cpfs = cpfs;
        self
    }

    /// Parse loosely typed query parameters, falling back to defaults for
    /// anything that is not a non-negative number.
    pub fn from_params(limit: Option<&Value>, offset: Option<&Value>, cpf: Option<&Value>) -> Self {
        Self {
            limit: non_negative(limit).unwrap_or(DEFAULT_LIST_LIMIT),
            offset: non_negative(offset).unwrap_or(0),
            cpfs: cpf.map(parse_cpf_filter).unwrap_or_default(),
        }
    }

    pub fn filter(&self) -> ListFilter {
        if self.cpfs.is_empty() {
            ListFilter::Range
        } else {
            ListFilter::Cpf
        }
    }

    /// `{users_cpf:[...]}` when filtering, otherwise `{limit, offset}`.
    /// Never both.
    pub fn request_body(&self) -> Value {
        match self.filter() {
            ListFilter::Cpf => json!({ "users_cpf": self.cpfs }),
            ListFilter::Range => json!({ "limit": self.limit, "offset": self.offset }),
        }
    }
}

fn non_negative(value: Option<&Value>) -> Option<u64> {
    let number = crate::normalize::coerce_f64(value?)?;
    if number < 0.0 {
        return None;
    }
    let floored = number.floor();
    if floored > 9_007_199_254_740_991.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let whole = floored as u64;
    Some(whole)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn general_update_requires_cpf() {
        let err = build_general_update(&json!({ "name": "x" })).unwrap_err();
        assert_eq!(err, CoreError::validation("CPF is required"));
        assert_eq!(
            build_general_update(&json!("text")).unwrap_err(),
            CoreError::validation("invalid request body")
        );
    }

    #[test]
    fn general_update_keeps_only_usable_fields() {
        let body = build_general_update(&json!({
            "cpf": "123",
            "name": "  Ana ",
            "bars": "",
            "code": "77",
            "rfid": "not-a-number",
            "admin": true,
            "extra": 1
        }))
        .unwrap();
        assert_eq!(
            body,
            json!({ "users": [{ "cpf": 123, "name": "Ana", "code": 77, "admin": true }] })
        );
    }

    #[test]
    fn creation_accepts_a_single_user() {
        let body = build_user_creation(&json!({
            "name": "Bia",
            "cpf": 5,
            "bars": "900",
            "imageBase64": "aGk=",
            "image_timestamp": 1_700_000_000
        }))
        .unwrap();
        assert_eq!(
            body,
            json!({
                "do_match": false,
                "users": [{
                    "name": "Bia",
                    "cpf": 5,
                    "registration": 900,
                    "image": "aGk=",
                    "image_timestamp": 1_700_000_000
                }]
            })
        );
    }

    #[test]
    fn creation_batch_reports_bad_position() {
        let err = build_user_creation(&json!({
            "users": [{ "name": "a", "cpf": 1 }, "oops"]
        }))
        .unwrap_err();
        assert_eq!(err, CoreError::validation("invalid user at position 2"));

        let body = build_user_creation(&json!({
            "do_match": true,
            "users": [{ "name": "a", "cpf": 1 }, { "name": "b", "cpf": "2" }]
        }))
        .unwrap();
        assert_eq!(body["do_match"], true);
        assert_eq!(body["users"][1]["cpf"], 2);
    }

    #[test]
    fn creation_defaults_image_timestamp() {
        let body = build_user_creation(&json!({ "name": "c", "cpf": 3, "image": "eA==" })).unwrap();
        assert!(body["users"][0]["image_timestamp"].as_i64().unwrap() > 0);
        assert!(build_user_creation(&json!({ "cpf": 3 })).is_err());
    }

    #[test]
    fn photo_builders() {
        let body = build_photo_update(&json!({ "cpf": 9, "image": "eA==" })).unwrap();
        assert_eq!(body["do_match"], false);
        assert_eq!(body["users"][0]["image"], "eA==");
        assert!(build_photo_update(&json!({ "cpf": 9 })).is_err());

        let body = build_photo_removal(&json!({ "cpf": "9" })).unwrap();
        assert_eq!(body, json!({ "users": [{ "cpf": 9, "remove_faces": true }] }));
    }

    #[test]
    fn deletion_merges_and_dedupes() {
        let body = build_user_deletion(&json!({ "cpf": 1, "cpfs": "2, 1,x,3" })).unwrap();
        assert_eq!(body, json!({ "users": [1, 2, 3] }));

        let body = build_user_deletion(&json!({ "cpfs": [4, "4", "5"] })).unwrap();
        assert_eq!(body, json!({ "users": [4, 5] }));

        let body = build_user_deletion(&json!({ "cpf": 4, "cpfs": [4.0, "4.0", "4e0"] })).unwrap();
        assert_eq!(body, json!({ "users": [4] }));

        let body = build_user_deletion(&json!({ "cpfs": "6.0,6,6.5" })).unwrap();
        assert_eq!(body, json!({ "users": [6, 6.5] }));

        assert!(build_user_deletion(&json!({ "cpfs": [] })).is_err());
    }

    #[test]
    fn list_query_parses_loose_params() {
        let query = ListQuery::from_params(Some(&json!("25.9")), Some(&json!(-3)), None);
        assert_eq!(query, ListQuery::new(25, 0));

        let query = ListQuery::from_params(None, None, Some(&json!("11,abc, 22")));
        assert_eq!(query.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(query.filter(), ListFilter::Cpf);
        assert_eq!(query.cpfs, vec![Number::from(11), Number::from(22)]);
    }

    #[test]
    fn list_body_never_mixes_filter_and_pagination() {
        let range = ListQuery::new(10, 20).request_body();
        assert_eq!(range, json!({ "limit": 10, "offset": 20 }));

        let filtered = ListQuery::new(10, 20)
            .with_cpfs(vec![Number::from(1)])
            .request_body();
        assert_eq!(filtered, json!({ "users_cpf": [1] }));
        assert!(filtered.get("limit").is_none() && filtered.get("offset").is_none());
    }
}
