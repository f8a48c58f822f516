// src/utils/session.rs

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::AppError;

/// Authentication flag carried by a session.
///
/// A session that was never initialized is `Unknown`; the first check
/// resolves it to `Anonymous`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthFlag {
    #[default]
    Unknown,
    Authenticated,
    Anonymous,
}

/// Minimal identity attributes kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Per-client session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    logged: AuthFlag,
    id: Option<i64>,
    username: Option<String>,
    email: Option<String>,
}

impl Session {
    /// Marks the session as logged in with the given identity.
    pub fn start(&mut self, identity: &Identity) {
        self.logged = AuthFlag::Authenticated;
        self.id = Some(identity.id);
        self.username = Some(identity.username.clone());
        self.email = Some(identity.email.clone());
    }

    /// Clears the flag and every identity field. Idempotent.
    pub fn end(&mut self) {
        self.logged = AuthFlag::Anonymous;
        self.id = None;
        self.username = None;
        self.email = None;
    }

    /// Returns true iff the session is logged in.
    ///
    /// An uninitialized session is normalized into the ended state first.
    pub fn is_authenticated(&mut self) -> bool {
        if self.logged == AuthFlag::Unknown {
            self.end();
        }
        self.logged == AuthFlag::Authenticated
    }

    #[cfg(test)]
    pub fn flag(&self) -> AuthFlag {
        self.logged
    }

    /// The identity of a logged-in session.
    pub fn identity(&self) -> Option<Identity> {
        if self.logged != AuthFlag::Authenticated {
            return None;
        }
        match (self.id, &self.username, &self.email) {
            (Some(id), Some(username), Some(email)) => Some(Identity {
                id,
                username: username.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}

/// Shared in-memory session storage, keyed by the client's bearer token.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session for `identity` and returns its token.
    pub fn open(&self, identity: &Identity) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut session = Session::default();
        session.start(identity);
        self.inner.write().insert(token.clone(), session);
        token
    }

    /// Resolves the client's session and reports its identity if logged in.
    ///
    /// A missing or unknown token is evaluated as a fresh session and is not stored.
    pub fn check(&self, token: Option<&str>) -> Option<Identity> {
        let mut sessions = self.inner.write();
        let mut fresh = Session::default();
        let stored = match token {
            Some(token) => sessions.get_mut(token),
            None => None,
        };
        let session = match stored {
            Some(stored) => stored,
            None => &mut fresh,
        };

        if session.is_authenticated() {
            session.identity()
        } else {
            None
        }
    }

    /// Ends the session behind `token` and forgets it. Unknown tokens are a no-op.
    pub fn close(&self, token: &str) {
        if let Some(mut session) = self.inner.write().remove(token) {
            session.end();
        }
    }

    /// Restarts an existing session with updated identity attributes.
    pub fn refresh(&self, token: &str, identity: &Identity) {
        if let Some(session) = self.inner.write().get_mut(token) {
            session.start(identity);
        }
    }

    #[cfg(test)]
    pub fn get(&self, token: &str) -> Option<Session> {
        self.inner.read().get(token).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

/// The authenticated caller, injected by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// The caller's session token, injected by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum Middleware: Session Guard.
///
/// Rejects the request with 401 unless the bearer token belongs to a
/// logged-in session. On success the caller's identity and token are
/// inserted into the request extensions.
pub async fn auth_middleware(
    State(sessions): State<SessionStore>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);

    let Some(identity) = sessions.check(token.as_deref()) else {
        tracing::debug!("Rejected unauthenticated request to {}", req.uri().path());
        return Err(AppError::AuthError(
            "You first step is registration friend ;)".to_string(),
        ));
    };

    // `check` only returns an identity for a stored token.
    if let Some(token) = token {
        req.extensions_mut().insert(SessionToken(token));
    }
    req.extensions_mut().insert(CurrentUser(identity));
    Ok(next.run(req).await)
}
