use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse, Responder};

use crate::models::AuthCallbackQuery;
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/callback", web::get().to(auth_callback));
}

/// Only same-site paths are accepted as post-login targets; anything else
/// falls back to the configured default.
fn safe_redirect_path(requested: Option<&str>, fallback: &str) -> String {
    match requested {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => fallback.to_string(),
    }
}

fn redirect_to(public_url: &str, path: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header(("Location", format!("{}{}", public_url.trim_end_matches('/'), path)))
        .finish()
}

/// Hosted-auth login callback
///
/// GET /api/v1/auth/callback?code=...&redirectTo=...&ref=...
///
/// Exchanges the auth code, upserts the profile (capturing referral
/// attribution once), sets session cookies and redirects into the studio.
/// This endpoint redirects on failure instead of returning JSON, since the
/// caller is a browser mid-login.
async fn auth_callback(
    state: web::Data<AppState>,
    query: web::Query<AuthCallbackQuery>,
) -> impl Responder {
    let public_url = &state.settings.app.public_url;

    let session = match state.supabase.exchange_auth_code(&query.code).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Auth code exchange failed: {}", e);
            return redirect_to(public_url, "/login?error=auth_failed");
        }
    };

    let user_id = match uuid::Uuid::parse_str(&session.user.id) {
        Ok(id) => id,
        Err(_) => {
            tracing::error!("Auth service returned non-UUID user id: {}", session.user.id);
            return redirect_to(public_url, "/login?error=auth_failed");
        }
    };

    let email = session.user.email.clone().unwrap_or_default();

    // Attribution only sticks when the code actually exists
    let referred_by = match &query.referral {
        Some(code) => match state.postgres.get_referral_code(code).await {
            Ok(Some(row)) if row.owner_user_id != user_id => Some(row.code),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Referral lookup failed during callback: {}", e);
                None
            }
        },
        None => None,
    };

    if let Err(e) = state
        .postgres
        .upsert_profile(user_id, &email, referred_by.as_deref())
        .await
    {
        tracing::error!("Profile upsert failed for {}: {}", user_id, e);
        return redirect_to(public_url, "/login?error=profile_failed");
    }

    let path = safe_redirect_path(
        query.redirect_to.as_deref(),
        &state.settings.app.post_login_path,
    );

    let access_cookie = Cookie::build("sb-access-token", session.access_token.clone())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(session.expires_in))
        .finish();

    let refresh_cookie = Cookie::build("sb-refresh-token", session.refresh_token.clone())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(30))
        .finish();

    HttpResponse::Found()
        .insert_header((
            "Location",
            format!("{}{}", public_url.trim_end_matches('/'), path),
        ))
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect_accepts_same_site_paths() {
        assert_eq!(safe_redirect_path(Some("/studio/samples"), "/studio"), "/studio/samples");
        assert_eq!(safe_redirect_path(Some("/"), "/studio"), "/");
    }

    #[test]
    fn test_safe_redirect_rejects_external_targets() {
        assert_eq!(safe_redirect_path(Some("https://evil.example"), "/studio"), "/studio");
        // protocol-relative URLs are external too
        assert_eq!(safe_redirect_path(Some("//evil.example"), "/studio"), "/studio");
        assert_eq!(safe_redirect_path(Some("studio"), "/studio"), "/studio");
        assert_eq!(safe_redirect_path(None, "/studio"), "/studio");
    }
}
