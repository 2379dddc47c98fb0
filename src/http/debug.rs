use reqwest::Url;
use reqwest::header::HeaderValue;
use serde_json::Value;

const REDACTED: &str = "***REDACTED***";
const SECRET_NAMES: [&str; 8] = [
    "authorization",
    "api_key",
    "apikey",
    "x-api-key",
    "key",
    "token",
    "access_token",
    "secret",
];

/// Controls the upstream request/response lines emitted at `debug` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDebugConfig {
    pub enabled: bool,
    pub redact_secrets: bool,
    pub max_body_chars: usize,
}

impl HttpDebugConfig {
    pub fn from_flag(enabled: bool) -> Self {
        Self {
            enabled,
            redact_secrets: true,
            max_body_chars: 2_000,
        }
    }

    pub fn disabled() -> Self {
        Self::from_flag(false)
    }
}

pub fn redact_url(url: &Url, redact: bool) -> String {
    if !redact || url.query().is_none() {
        return url.to_string();
    }

    let pairs = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if is_secret(&name) {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect::<Vec<_>>();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

pub fn redact_header_value(name: &str, value: &HeaderValue, redact: bool) -> String {
    if redact && is_secret(name) {
        return REDACTED.to_string();
    }
    value.to_str().unwrap_or("<non-utf8>").to_string()
}

/// Masks secret-looking keys anywhere in a JSON body. Non-JSON passes through.
pub fn redact_body(raw: &str, redact: bool) -> String {
    if !redact {
        return raw.to_string();
    }
    let Ok(mut json) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    mask_secrets(&mut json);
    serde_json::to_string(&json).unwrap_or_else(|_| raw.to_string())
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        None => input.to_string(),
        Some((cut, _)) => {
            let dropped = input[cut..].chars().count();
            format!("{}... <truncated {dropped} chars>", &input[..cut])
        }
    }
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if is_secret(key) {
                    *item = Value::String(REDACTED.to_string());
                } else {
                    mask_secrets(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

fn is_secret(name: &str) -> bool {
    SECRET_NAMES
        .iter()
        .any(|secret| secret.eq_ignore_ascii_case(name))
}
