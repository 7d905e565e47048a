//! Anti-forgery guard.
//!
//! Issues per-session token pairs and verifies them on state-changing
//! requests. The cookie carries an opaque session id; the server keeps that
//! session's cookie token. The client echoes a request token, signed over the
//! session id and cookie token, in the configured header.

mod token;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, Method};
use cookie::{Cookie, SameSite};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Why a request failed anti-forgery verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("request token header missing")]
    MissingToken,
    #[error("session cookie missing")]
    MissingSession,
    #[error("session unknown or expired")]
    UnknownSession,
    #[error("request token does not match session")]
    Mismatch,
    #[error("token could not be signed")]
    Signing,
}

/// A freshly issued token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Session id to store in the cookie
    pub session_id: String,
    /// Client-visible token to echo back in the header
    pub request_token: String,
    /// True when a new session was created and the cookie must be set
    pub new_session: bool,
}

struct Session {
    cookie_token: String,
    expires_at: Instant,
    /// Issue sequence number; the lowest is evicted first
    issued: u64,
}

/// Live sessions kept when no explicit bound is configured.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub struct Antiforgery {
    secret: Vec<u8>,
    header_name: String,
    cookie_name: String,
    session_ttl: Duration,
    max_sessions: usize,
    sessions: RwLock<HashMap<String, Session>>,
    issued: AtomicU64,
}

impl Antiforgery {
    pub fn new(
        secret: Vec<u8>,
        header_name: impl Into<String>,
        cookie_name: impl Into<String>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            secret,
            header_name: header_name.into(),
            cookie_name: cookie_name.into(),
            session_ttl,
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: RwLock::new(HashMap::new()),
            issued: AtomicU64::new(0),
        }
    }

    /// Bounds the session map. Creating a session beyond it evicts the
    /// least recently issued one.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.antiforgery_secret.clone(),
            config.antiforgery_header.clone(),
            config.antiforgery_cookie.clone(),
            config.antiforgery_session_ttl,
        )
        .with_max_sessions(config.antiforgery_max_sessions)
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Only these methods are subject to verification.
    pub fn requires_validation(method: &Method) -> bool {
        matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    // == Issue ==
    /// Issues a request token for `session`, creating the session if it is
    /// absent or expired. Reissuing keeps the cookie token, so earlier request
    /// tokens of a live session stay valid.
    pub fn issue_token(&self, session: Option<&str>) -> Result<TokenPair, Rejection> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());

        let existing = session.filter(|id| {
            sessions
                .get(*id)
                .is_some_and(|s| s.expires_at > now)
        });

        let (session_id, new_session) = match existing {
            Some(id) => (id.to_string(), false),
            None => (token::random_hex(16), true),
        };

        if new_session && sessions.len() >= self.max_sessions {
            sessions.retain(|_, s| s.expires_at > now);
            while sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, s)| s.issued)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        sessions.remove(&id);
                        debug!("Anti-forgery session evicted, session limit reached");
                    }
                    None => break,
                }
            }
        }

        let entry = sessions
            .entry(session_id.clone())
            .or_insert_with(|| Session {
                cookie_token: token::random_hex(32),
                expires_at: now,
                issued: 0,
            });
        entry.expires_at = now + self.session_ttl;
        entry.issued = self.issued.fetch_add(1, Ordering::Relaxed);

        let request_token = token::sign(&self.secret, &session_id, &entry.cookie_token)
            .ok_or(Rejection::Signing)?;

        if new_session {
            debug!("Anti-forgery session created");
        }

        Ok(TokenPair {
            session_id,
            request_token,
            new_session,
        })
    }

    // == Verify ==
    /// Verifies the header token against the session named by the cookie.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        let request_token = self
            .request_token(headers)
            .filter(|t| !t.is_empty())
            .ok_or(Rejection::MissingToken)?;
        let session_id = self
            .session_id(headers)
            .ok_or(Rejection::MissingSession)?;

        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        let session = sessions
            .get(&session_id)
            .filter(|s| s.expires_at > Instant::now())
            .ok_or(Rejection::UnknownSession)?;

        if token::verify(&self.secret, &session_id, &session.cookie_token, request_token) {
            Ok(())
        } else {
            Err(Rejection::Mismatch)
        }
    }

    /// The raw value of the configured token header.
    pub fn request_token<'h>(&self, headers: &'h HeaderMap) -> Option<&'h str> {
        headers
            .get(self.header_name.as_str())
            .and_then(|v| v.to_str().ok())
    }

    /// The session id from the request's cookies.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.cookie_name)
            .map(|c| c.value().to_string())
    }

    /// `Set-Cookie` value carrying the session id.
    pub fn session_cookie(&self, session_id: &str) -> String {
        Cookie::build((self.cookie_name.clone(), session_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .build()
            .to_string()
    }

    /// Drops expired sessions. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
