//! Stateless login sessions: a signed cookie carrying the user's identity.
//!
//! Cookie value is `<base64url(json payload)>.<hex hmac-sha256>`; the payload
//! holds `username`, `role`, `display_name` and a unix `expires_at`.

use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use helpdesk_db::users::models::{PublicUser, Role};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const COOKIE_NAME: &str = "helpdesk_session";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub display_name: String,
    pub expires_at: i64,
}

impl Session {
    pub fn user(&self) -> PublicUser {
        PublicUser {
            username: self.username.clone(),
            role: self.role.clone(),
            display_name: self.display_name.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("hmac key length is unrestricted"),
        }
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Fresh session for `user`, valid for the configured lifetime.
    pub fn issue(&self, user: &PublicUser) -> Session {
        Session {
            username: user.username.clone(),
            role: user.role.clone(),
            display_name: user.display_name.clone(),
            expires_at: (Utc::now() + self.ttl).timestamp(),
        }
    }

    pub fn encode(&self, session: &Session) -> String {
        let json = serde_json::to_vec(session).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(&payload);
        format!("{payload}.{signature}")
    }

    /// Verified, unexpired session from a cookie value.
    pub fn decode(&self, value: &str) -> Option<Session> {
        let (payload, signature) = value.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let session: Session = serde_json::from_slice(&json).ok()?;
        (session.expires_at > Utc::now().timestamp()).then_some(session)
    }

    pub fn set_cookie(&self, session: &Session) -> String {
        format!(
            "{COOKIE_NAME}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.encode(session),
            self.ttl.num_seconds()
        )
    }

    pub fn read_session(&self, headers: &HeaderMap) -> Option<Session> {
        self.decode(&cookie_value(headers, COOKIE_NAME)?)
    }
}

pub fn clear_cookie() -> String {
    format!("{COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user() -> PublicUser {
        PublicUser {
            username: "kim".to_owned(),
            role: Role::Viewer,
            display_name: "Kim".to_owned(),
        }
    }

    #[test]
    fn issued_session_decodes() {
        let keys = SessionKeys::new("secret", 12);
        let session = keys.issue(&user());
        assert_eq!(keys.decode(&keys.encode(&session)), Some(session));
    }

    #[test]
    fn tampered_or_foreign_cookies_are_rejected() {
        let keys = SessionKeys::new("secret", 12);
        let mut session = keys.issue(&user());
        let value = keys.encode(&session);

        assert_eq!(SessionKeys::new("other", 12).decode(&value), None);

        session.role = Role::Admin;
        let forged_payload = keys.encode(&session);
        let (payload, _) = forged_payload.split_once('.').expect("dot");
        let (_, signature) = value.split_once('.').expect("dot");
        assert_eq!(keys.decode(&format!("{payload}.{signature}")), None);
        assert_eq!(keys.decode("garbage"), None);
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let keys = SessionKeys::new("secret", 12);
        let mut session = keys.issue(&user());
        session.expires_at = Utc::now().timestamp() - 1;
        assert_eq!(keys.decode(&keys.encode(&session)), None);
    }

    #[test]
    fn session_is_read_from_cookie_header() {
        let keys = SessionKeys::new("secret", 12);
        let session = keys.issue(&user());
        let mut headers = HeaderMap::new();
        let cookie = format!("theme=dark; {COOKIE_NAME}={}", keys.encode(&session));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&cookie).expect("header"),
        );
        assert_eq!(keys.read_session(&headers), Some(session));
        assert!(keys.set_cookie(&keys.issue(&user())).contains("Max-Age=43200"));
        assert!(clear_cookie().ends_with("Max-Age=0"));
    }
}
