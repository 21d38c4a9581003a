use serde::Serialize;
use serde_json::{json, Map, Value};

/// Liveness payload for `GET /`.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "refAIne",
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Validated body of `POST /refine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineRequest {
    pub prompt: String,
}

impl RefineRequest {
    /// Decode a raw request body. An absent content type is read as JSON;
    /// any other non-JSON type fails validation.
    pub fn from_body(
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Self, Vec<ValidationIssue>> {
        if body.is_empty() {
            return Err(vec![ValidationIssue::missing_body()]);
        }

        if let Some(ct) = content_type {
            if !is_json_content_type(ct) {
                let raw = Value::String(String::from_utf8_lossy(body).into_owned());
                return Err(vec![ValidationIssue::not_an_object(raw)]);
            }
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| vec![ValidationIssue::invalid_json(e.to_string())])?;
        Self::from_value(value)
    }

    /// `prompt` must be present, a string, and at least one character long.
    pub fn from_value(body: Value) -> Result<Self, Vec<ValidationIssue>> {
        let mut map = match body {
            Value::Object(map) => map,
            other => return Err(vec![ValidationIssue::not_an_object(other)]),
        };

        match map.remove("prompt") {
            Some(Value::String(prompt)) if prompt.is_empty() => {
                Err(vec![ValidationIssue::too_short(prompt)])
            }
            Some(Value::String(prompt)) => Ok(Self { prompt }),
            Some(other) => Err(vec![ValidationIssue::not_a_string(other)]),
            None => Err(vec![ValidationIssue::missing(map)]),
        }
    }
}

/// `application/json` or any `application/*+json`, parameters ignored.
fn is_json_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.split_once('/') {
        Some(("application", subtype)) => subtype == "json" || subtype.ends_with("+json"),
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineResponse {
    pub original: String,
    pub refined: String,
    pub model: String,
}

/// One entry of a 422 `detail` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub loc: Vec<&'static str>,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl ValidationIssue {
    fn prompt_issue(kind: &'static str, msg: &str, input: Value) -> Self {
        Self {
            kind,
            loc: vec!["body", "prompt"],
            msg: msg.into(),
            input: Some(input),
            ctx: None,
        }
    }

    pub fn missing_body() -> Self {
        Self {
            kind: "missing",
            loc: vec!["body"],
            msg: "Field required".into(),
            input: Some(Value::Null),
            ctx: None,
        }
    }

    pub fn missing(body: Map<String, Value>) -> Self {
        Self::prompt_issue("missing", "Field required", Value::Object(body))
    }

    pub fn too_short(prompt: String) -> Self {
        Self {
            ctx: Some(json!({ "min_length": 1 })),
            ..Self::prompt_issue(
                "string_too_short",
                "String should have at least 1 character",
                Value::String(prompt),
            )
        }
    }

    pub fn not_a_string(input: Value) -> Self {
        Self::prompt_issue("string_type", "Input should be a valid string", input)
    }

    pub fn not_an_object(input: Value) -> Self {
        Self {
            kind: "model_attributes_type",
            loc: vec!["body"],
            msg: "Input should be a valid dictionary or object to extract fields from".into(),
            input: Some(input),
            ctx: None,
        }
    }

    /// Body could not be read as JSON at all.
    pub fn invalid_json(reason: String) -> Self {
        Self {
            kind: "json_invalid",
            loc: vec!["body"],
            msg: "JSON decode error".into(),
            input: None,
            ctx: Some(json!({ "error": reason })),
        }
    }
}
