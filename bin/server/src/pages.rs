//! Page handlers: the landing page, the dashboard, and the protected resource.

use axum::response::{Html, IntoResponse, Response};
use gatehouse_access::{AuditEvent, IdentityClaims};

use crate::{
    auth::{ClientIp, CookieSession},
    redirect::Found,
};

/// Where anonymous visitors of gated routes are sent.
pub const LOGIN_PATH: &str = "/login";

/// Body of the protected resource.
pub const PROTECTED_TEXT: &str = "This is a protected page for logged-in users only.";

/// Renders the landing page.
pub async fn home() -> Html<String> {
    Html(layout(
        "Welcome",
        r#"<h1>Welcome</h1>
<p>Sign in to see your dashboard.</p>
<p><a href="/login">Log in</a></p>"#,
    ))
}

/// Renders the signed-in user's claims, or sends anonymous visitors to log in.
pub async fn dashboard(session: CookieSession) -> Response {
    match session.user() {
        Some(user) => Html(render_dashboard(user)).into_response(),
        None => Found::to(LOGIN_PATH).into_response(),
    }
}

/// Serves the protected resource to signed-in users.
pub async fn protected(ClientIp(ip): ClientIp, session: CookieSession) -> Response {
    let Some(user) = session.user() else {
        AuditEvent::UnauthorizedAccess {
            ip,
            route: "/protected",
        }
        .emit();
        return Found::to(LOGIN_PATH).into_response();
    };

    AuditEvent::ProtectedAccess {
        user_id: &user.sub,
        email: user.email.as_deref(),
    }
    .emit();

    PROTECTED_TEXT.into_response()
}

fn render_dashboard(user: &IdentityClaims) -> String {
    let mut rows = vec![("Subject", user.sub.clone())];
    if let Some(email) = &user.email {
        let verified = match user.email_verified {
            Some(true) => " (verified)",
            Some(false) => " (unverified)",
            None => "",
        };
        rows.push(("Email", format!("{email}{verified}")));
    }
    if let Some(name) = &user.name {
        rows.push(("Name", name.clone()));
    }
    if let Some(nickname) = &user.nickname {
        rows.push(("Nickname", nickname.clone()));
    }
    if let Some(issuer) = &user.issuer {
        rows.push(("Issuer", issuer.clone()));
    }

    let rows: String = rows
        .iter()
        .map(|(label, value)| format!("<tr><th>{}</th><td>{}</td></tr>\n", label, escape(value)))
        .collect();

    layout(
        "Dashboard",
        &format!(
            r#"<h1>Hello, {}</h1>
<table>
{}</table>
<p><a href="/protected">Protected resource</a> | <a href="/logout">Log out</a></p>"#,
            escape(user.display_name()),
            rows
        ),
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
</head>
<body>
{}
</body>
</html>
"#,
        escape(title),
        body
    )
}

/// Escapes text for inclusion in HTML element content or attributes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
