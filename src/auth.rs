//! Identity and ownership.
//!
//! Accounts and tokens are issued by the external auth service. Requests
//! carry `Authorization: Bearer <api_token>`; [`resolve_identity`] turns that
//! into an [`Identity`] request extension, and handlers read it through the
//! [`Viewer`] (anyone) or [`CurrentUser`] (login required) extractors.

use std::convert::Infallible;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{Error, Result};
use crate::models::User;
use crate::urls::Url;
use crate::AppState;

#[derive(Debug, Clone, Default)]
pub struct Identity(Option<User>);

impl Identity {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<Result<&str>> {
    let value = headers.get(header::AUTHORIZATION)?;
    Some(
        value
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(Error::Unauthorized),
    )
}

pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response> {
    let identity = match bearer_token(req.headers()) {
        None => Identity::default(),
        Some(token) => match state.store.user_by_token(token?)? {
            Some(user) => Identity(Some(user)),
            None => {
                tracing::error!("resolve_identity: unknown api token");
                return Err(Error::Unauthorized);
            }
        },
    };
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn identity(parts: &Parts) -> Identity {
    parts.extensions.get::<Identity>().cloned().unwrap_or_default()
}

/// Whoever is asking, possibly anonymous.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn is(&self, user_id: i64) -> bool {
        self.0.as_ref().is_some_and(|user| user.id == user_id)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Viewer(identity(parts).0))
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match identity(parts).0 {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                let login = Url::Login {
                    login_url: state.settings.login_url.clone(),
                    next: parts.uri.path().to_string(),
                };
                tracing::debug!("anonymous request to {}", parts.uri.path());
                Err(login.redirect().into_response())
            }
        }
    }
}

/// Outcome of an ownership check on a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Access {
    Permitted,
    /// Not the author: send them to the read-only view instead.
    Denied(Url),
}

impl Access {
    pub fn author_only(user: &User, author_id: i64, read_only: Url) -> Self {
        if user.id == author_id {
            Access::Permitted
        } else {
            tracing::info!(
                "user {} may not modify a resource of user {}",
                user.username,
                author_id
            );
            Access::Denied(read_only)
        }
    }
}
