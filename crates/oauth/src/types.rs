use {
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
};

/// Raw reply from the refresh endpoint: status code and body text,
/// captured before any parsing so rejections can be passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    /// Only a plain 200 counts as a successful refresh.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// Fields of interest in a successful refresh body.
///
/// Threads returns `{"access_token": "...", "token_type": "bearer",
/// "expires_in": 5183944}`; anything else is left in the raw JSON.
pub struct RefreshedToken {
    pub access_token: Option<Secret<String>>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

impl RefreshedToken {
    /// Extract the token fields from a parsed body. Missing, empty or
    /// non-string `access_token` values yield `None`.
    pub fn from_body(body: &Value) -> Self {
        Self {
            access_token: body
                .get("access_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(|t| Secret::new(t.to_string())),
            token_type: body
                .get("token_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            expires_in: body.get("expires_in").and_then(Value::as_u64),
        }
    }
}

impl std::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|t| mask_token(t.expose_secret())),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Render a token for logs: first and last ten characters only.
/// Short tokens are fully hidden.
pub fn mask_token(token: &str) -> String {
    const EDGE: usize = 10;
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= EDGE * 2 {
        return format!("[{} chars]", chars.len());
    }
    let head: String = chars[..EDGE].iter().collect();
    let tail: String = chars[chars.len() - EDGE..].iter().collect();
    format!("{head}...{tail}")
}
