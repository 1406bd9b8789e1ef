//! Request extractors and middleware shared by the routes.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use gatehouse_access::AuditEvent;

/// Body sent with every 401 response.
pub const UNAUTHORIZED_BODY: &str = "Unauthorized";

/// The TCP peer address of the request, when the server recorded one.
///
/// Forwarding headers are not consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIp(ip))
    }
}

/// Audits every 401 response and normalizes its body.
///
/// Headers set by the handler (notably `Set-Cookie`) are kept.
pub async fn audit_unauthorized(ClientIp(ip): ClientIp, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if response.status() != StatusCode::UNAUTHORIZED {
        return response;
    }

    AuditEvent::UnauthorizedError { ip, path: &path }.emit();

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Response::from_parts(parts, Body::from(UNAUTHORIZED_BODY))
}
