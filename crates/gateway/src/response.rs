use {
    axum::{
        http::{HeaderMap, HeaderValue, StatusCode, header},
        response::{IntoResponse, Response},
    },
    chrono::{SecondsFormat, Utc},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

pub const INTERNAL_ERROR: &str = "Internal server error";

/// Current time as an RFC 3339 UTC timestamp with microseconds.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ── JSON body ────────────────────────────────────────────────────────────────

/// JSON body returned for every non-preflight request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshBody {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: String,
}

impl RefreshBody {
    pub fn refreshed(data: Value, timestamp: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            timestamp,
        }
    }

    pub fn rejected(status: u16, body: String, timestamp: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(format!("API request failed with status {status}")),
            details: Some(body),
            timestamp,
        }
    }

    pub fn internal(details: String, timestamp: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(INTERNAL_ERROR.into()),
            details: Some(details),
            timestamp,
        }
    }
}

// ── HTTP response ────────────────────────────────────────────────────────────

/// Status, headers and body produced by the refresh handler.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HandlerResponse {
    /// Reply to a CORS preflight: 204, no body.
    pub fn preflight() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("3600"),
        );
        Self {
            status: StatusCode::NO_CONTENT,
            headers,
            body: String::new(),
        }
    }

    pub fn json(status: StatusCode, body: &RefreshBody) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        // Serializing a struct of strings and a Value cannot fail.
        let body = serde_json::to_string(body).unwrap_or_default();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Parse the body back (tests and the `refresh` command).
    pub fn parsed(&self) -> serde_json::Result<RefreshBody> {
        serde_json::from_str(&self.body)
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}
