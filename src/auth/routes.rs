//! Authentication HTTP surface
//!
//! Local email/password login plus the OAuth 2.0 authorization code
//! flow for every configured provider.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use super::gate::{LoginOutcome, RejectReason};
use super::middleware::{CurrentUser, extract_token_from_headers, require_auth};
use super::session::{Session, create_session_token, verify_session_token};
use crate::AppState;
use crate::data::{Provider, User};
use crate::error::AppError;
use crate::metrics::{LOGIN_ATTEMPTS_TOTAL, SESSION_RESTORES_TOTAL};

/// Create authentication router
///
/// Routes:
/// - POST /login - Local email/password login
/// - GET /connect/:provider - Redirect to the provider
/// - GET /connect/:provider/callback - OAuth callback
/// - GET /session - Introspect the current session
/// - GET /users/me - Current user (requires auth)
/// - POST /logout - Clear the session cookie
pub fn auth_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users/me", get(current_user_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
        .route("/connect/:provider", get(connect_redirect))
        .route("/connect/:provider/callback", get(connect_callback))
        .merge(protected)
}

// =============================================================================
// Local Login
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    user: Option<User>,
}

/// POST /login
///
/// # Steps
/// 1. Validate the payload shape
/// 2. Run the local strategy through the shared adapter
/// 3. On success, set the session cookie and return the user
/// 4. On rejection, return 401 with the rejection message
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let outcome = match state
        .authenticator
        .login_local(&request.email, &request.password)
        .await
    {
        Ok(outcome) => outcome,
        Err(error) => {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&["local", "error"])
                .inc();
            return Err(error);
        }
    };

    match outcome {
        LoginOutcome::Success(user) => {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&["local", "success"])
                .inc();
            tracing::info!(user_id = %user.id, strategy = "local", "Login succeeded");
            let jar = jar.add(session_cookie(&state, &user)?);
            Ok((jar, Json(SessionResponse { user: Some(user) })).into_response())
        }
        LoginOutcome::Rejected(reason) => {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&["local", "rejected"])
                .inc();
            tracing::warn!(strategy = "local", reason = %reason, "Login rejected");
            Ok(rejection_response(reason))
        }
    }
}

// =============================================================================
// Provider Connect Flow
// =============================================================================

/// GET /connect/:provider
///
/// Redirects to the provider authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to the provider with client_id, redirect_uri, scope, state
async fn connect_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider = parse_provider(&provider)?;
    let (authorize_url, csrf_token) = state.providers.authorize_url(provider)?;

    let state_cookie = Cookie::build(("oauth_state", csrf_token.secret().clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build();

    tracing::info!(
        provider = provider.as_str(),
        "Redirecting to provider authorization"
    );
    Ok((jar.add(state_cookie), Redirect::to(authorize_url.as_str())))
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: String,
    /// CSRF state token
    state: String,
}

/// GET /connect/:provider/callback
///
/// Handles the OAuth callback from a provider.
///
/// # Steps
/// 1. Verify CSRF state against the cookie
/// 2. Exchange code for access token
/// 3. Fetch user profile from the provider
/// 4. Run the external strategy through the shared adapter
/// 5. Create session and set cookie
/// 6. Redirect to home
async fn connect_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let provider = parse_provider(&provider)?;
    let strategy = provider.as_str();

    let stored_state = jar
        .get("oauth_state")
        .map(|cookie| cookie.value().to_owned())
        .ok_or(AppError::Unauthorized)?;
    if stored_state != query.state {
        tracing::warn!(provider = strategy, "OAuth state mismatch");
        return Err(AppError::Unauthorized);
    }
    let jar = jar.remove(clear_cookie("oauth_state"));

    let result = async {
        let access_token = state.providers.exchange_code(provider, query.code).await?;
        let profile = state
            .providers
            .fetch_profile(provider, &access_token)
            .await?;
        state.authenticator.login_external(&profile).await
    }
    .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(error) => {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&[strategy, "error"])
                .inc();
            return Err(error);
        }
    };

    match outcome {
        LoginOutcome::Success(user) => {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&[strategy, "success"])
                .inc();
            tracing::info!(user_id = %user.id, strategy, "Login succeeded");
            let jar = jar.add(session_cookie(&state, &user)?);
            Ok((jar, Redirect::to("/")).into_response())
        }
        LoginOutcome::Rejected(reason) => {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&[strategy, "rejected"])
                .inc();
            tracing::warn!(strategy, reason = %reason, "Login rejected");
            Ok((jar, rejection_response(reason)).into_response())
        }
    }
}

// =============================================================================
// Session Introspection
// =============================================================================

/// GET /session
///
/// Reports who the session cookie belongs to.
///
/// A request without a token and a valid token whose user row has
/// vanished both answer `{"user": null}`; only a bad signature or an
/// expired token is a 401.
async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let Some(token) = extract_token_from_headers(&headers) else {
        return Ok(Json(SessionResponse { user: None }));
    };

    let session = verify_session_token(&token, &state.config.auth.session_secret)?;
    let user = state.authenticator.restore(&session.user_id).await?;

    let outcome = if user.is_some() { "restored" } else { "stale" };
    SESSION_RESTORES_TOTAL.with_label_values(&[outcome]).inc();

    Ok(Json(SessionResponse { user }))
}

/// GET /users/me
///
/// The authenticated user's own record.
async fn current_user_profile(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Clears session cookies and redirects to home.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(clear_cookie("session"))
        .remove(clear_cookie("oauth_state"));
    tracing::info!("Session cleared");
    (jar, Redirect::to("/"))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_provider(raw: &str) -> Result<Provider, AppError> {
    Provider::parse(raw).ok_or(AppError::NotFound)
}

fn rejection_response(reason: RejectReason) -> Response {
    let body = Json(serde_json::json!({ "error": reason.message() }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

fn session_cookie(state: &AppState, user: &User) -> Result<Cookie<'static>, AppError> {
    let session = Session::new(
        state.authenticator.serialize_user(user),
        state.config.auth.session_max_age,
    );
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    Ok(Cookie::build(("session", token))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build())
}

fn clear_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "".to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
