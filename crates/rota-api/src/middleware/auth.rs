//! Client principal gate for edge-authenticated requests.
//!
//! Runs the layered identity checks before any handler: header presence,
//! principal decodability, trusted authentication method, and the optional
//! email-domain allowlist. The hosting edge already enforces AAD sign-in;
//! this gate is a second, independent layer on top of it.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use rota_core::ClientPrincipal;
use tracing::warn;

use crate::{handlers::ErrorResponse, server::AppState};

/// The single trusted identity provider tag.
const TRUSTED_PROVIDER: &str = "aad";

/// Header carrying the base64-encoded identity assertion.
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-ms-client-principal";

/// Rejections produced by the principal gate.
///
/// The first failing check decides the outcome; checks are never reordered
/// or aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No principal header on the request.
    MissingPrincipal,
    /// Header present but not decodable into a principal.
    MalformedPrincipal,
    /// Principal authenticated through an untrusted provider.
    UntrustedProvider,
    /// Account outside the allowed email domain.
    DomainNotAllowed,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingPrincipal => {
                (StatusCode::UNAUTHORIZED, "Unauthorized: No client principal found")
            },
            Self::MalformedPrincipal => {
                (StatusCode::UNAUTHORIZED, "Unauthorized: Failed to decode client principal")
            },
            Self::UntrustedProvider => {
                (StatusCode::FORBIDDEN, "Forbidden: AAD authentication required")
            },
            Self::DomainNotAllowed => (StatusCode::FORBIDDEN, "Forbidden: Account not allowed"),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Checks the optional email-domain allowlist.
///
/// Disabled entirely when no domain is configured. Matching is a
/// case-insensitive suffix comparison against `@{domain}`; an empty
/// `user_details` never matches.
fn domain_allowed(principal: &ClientPrincipal, allowed_domain: Option<&str>) -> bool {
    let Some(domain) = allowed_domain else { return true };

    let email = principal.user_details.to_lowercase();
    email.ends_with(&format!("@{}", domain.to_lowercase()))
}

/// Axum middleware running the principal checks in order.
///
/// On success the decoded principal is injected into request extensions for
/// the save handler; on failure the matching rejection response is returned
/// and the handler never runs.
pub async fn principal_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(raw) = req.headers().get(CLIENT_PRINCIPAL_HEADER) else {
        warn!("request rejected: no client principal header");
        return Err(AuthError::MissingPrincipal);
    };

    // A header that exists but is unreadable is a decode failure, not
    // absence.
    let Some(principal) = raw.to_str().ok().and_then(ClientPrincipal::decode) else {
        warn!("request rejected: client principal failed to decode");
        return Err(AuthError::MalformedPrincipal);
    };

    if principal.identity_provider != TRUSTED_PROVIDER {
        warn!(
            identity_provider = %principal.identity_provider,
            "request rejected: untrusted identity provider"
        );
        return Err(AuthError::UntrustedProvider);
    }

    if !domain_allowed(&principal, state.allowed_email_domain.as_deref()) {
        warn!(
            user = %principal.user_details,
            "request rejected: account domain not allowed"
        );
        return Err(AuthError::DomainNotAllowed);
    }

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
