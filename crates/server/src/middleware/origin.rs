use axum::{
    extract::{Request, State},
    http::{header, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, AppState};

/// CSRF mitigation: mutating verbs must carry an Origin matching the
/// configured application URL. A missing Origin header or an unset allowlist
/// passes outside production and is denied in production.
pub async fn origin_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return next.run(request).await;
    }

    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let allowed = match (state.config.app_url.as_deref(), origin.as_deref()) {
        (Some(allowed), Some(origin)) => {
            // Malformed configuration fails closed in production only.
            origins_match(allowed, origin).unwrap_or(!state.config.is_production())
        }
        _ => !state.config.is_production(),
    };

    if !allowed {
        return AppError::forbidden("INVALID_ORIGIN", "Invalid origin").into_response();
    }

    next.run(request).await
}

/// Scheme-and-host comparison; None when either side fails to parse.
fn origins_match(allowed: &str, origin: &str) -> Option<bool> {
    let allowed: Uri = allowed.parse().ok()?;
    let origin: Uri = origin.parse().ok()?;
    Some(
        allowed.scheme_str().is_some()
            && allowed.scheme_str() == origin.scheme_str()
            && allowed.authority() == origin.authority(),
    )
}

#[cfg(test)]
mod tests {
    use super::origins_match;

    #[test]
    fn matching_scheme_and_host() {
        assert_eq!(
            origins_match("https://app.example.com", "https://app.example.com"),
            Some(true)
        );
        assert_eq!(
            origins_match("https://app.example.com", "https://evil.example.com"),
            Some(false)
        );
        assert_eq!(
            origins_match("https://app.example.com", "http://app.example.com"),
            Some(false)
        );
    }

    #[test]
    fn port_is_part_of_the_origin() {
        assert_eq!(
            origins_match("http://localhost:3000", "http://localhost:3000"),
            Some(true)
        );
        assert_eq!(
            origins_match("http://localhost:3000", "http://localhost:4000"),
            Some(false)
        );
    }

    #[test]
    fn unparsable_values_are_indeterminate() {
        assert_eq!(origins_match("not a url", "https://app.example.com"), None);
    }
}
