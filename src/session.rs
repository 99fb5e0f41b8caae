use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

pub const USER_KEY: &str = "user";

/// Key-value storage of the logged in user.
pub trait LocalSession: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "type")]
    pub user_type: String,
    #[serde(default)]
    pub email: String,
}

impl User {
    pub fn employee(email: impl Into<String>) -> Self {
        Self {
            user_type: "Employee".to_string(),
            email: email.into(),
        }
    }
}

/// The `user` entry of `session`, if present and well formed.
pub fn current_user(session: &dyn LocalSession) -> Option<User> {
    let raw = session.get(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(err) => {
            log::warn!("malformed user in session: {err}");
            None
        }
    }
}

/// Session read from the request cookies. Values are base64url encoded so
/// JSON survives the cookie syntax.
#[derive(Debug, Default)]
pub struct CookieSession {
    values: HashMap<String, String>,
}

impl CookieSession {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let values = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .filter_map(|(k, v)| {
                let decoded = URL_SAFE_NO_PAD.decode(v.trim()).ok()?;
                Some((k.trim().to_string(), String::from_utf8(decoded).ok()?))
            })
            .collect();

        Self { values }
    }

    /// `Set-Cookie` value storing `value` under `key`.
    pub fn set_cookie(key: &str, value: &str) -> String {
        format!(
            "{key}={}; Path=/; HttpOnly; SameSite=Lax",
            URL_SAFE_NO_PAD.encode(value)
        )
    }
}

impl LocalSession for CookieSession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
