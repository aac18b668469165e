//! Authentication route handlers.
//!
//! Credentials are checked by the backend; on success the returned user and
//! token go into the session (see [`CurrentUser`]). Sign-up and password
//! reset are two-step flows around an emailed one-time code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use crate::backend::{AuthSession, GoogleSignIn, SignupRequest};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

const SIGNUP_OTP_SENT: &str = "Sign up OTP sent to your email.";
const RESET_OTP_SENT: &str = "Reset OTP sent. Check your email.";
const PASSWORD_RESET: &str = "Password reset! You can now sign in.";

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data. `otp` is present on the verification step.
#[derive(Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub otp: Option<String>,
}

impl SignupForm {
    /// Country code and local number joined, e.g. `+1` and `4165550100`.
    fn full_phone(&self) -> String {
        format!("{}{}", self.country_code.trim(), self.phone.trim())
    }

    fn to_request(&self) -> SignupRequest {
        SignupRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            phone: self.full_phone(),
            otp: self
                .otp
                .as_deref()
                .map(str::trim)
                .filter(|otp| !otp.is_empty())
                .map(String::from),
        }
    }
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Deserialize)]
pub struct ResetForm {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Fields posted by the Google sign-in button callback.
#[derive(Debug, Deserialize)]
pub struct GoogleForm {
    pub name: String,
    pub email: String,
    pub google_id: String,
}

/// Query for the reset page.
#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub email: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signin.html")]
pub struct SignInTemplate {
    pub nav: NavView,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
    /// Renders the Google button when set.
    pub google_client_id: Option<String>,
}

/// Sign-up fields carried from the first step to the second.
#[derive(Clone, Default)]
pub struct SignupView {
    pub name: String,
    pub email: String,
    pub country_code: String,
    pub phone: String,
}

impl From<&SignupForm> for SignupView {
    fn from(form: &SignupForm) -> Self {
        Self {
            name: form.name.clone(),
            email: form.email.clone(),
            country_code: form.country_code.clone(),
            phone: form.phone.clone(),
        }
    }
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub nav: NavView,
    pub form: SignupView,
    /// Whether the OTP has been sent and the code is being asked for.
    pub verifying: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot.html")]
pub struct ForgotTemplate {
    pub nav: NavView,
    pub email: String,
    pub error: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub nav: NavView,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Session helpers
// =============================================================================

/// Store a successful sign-in and pick where to send the user.
async fn start_session(session: &Session, auth: &AuthSession) -> Result<&'static str, String> {
    let user = CurrentUser::save(session, auth).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store sign-in in session");
        "We couldn't sign you in. Please try again.".to_string()
    })?;

    // New identity, new session id.
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to cycle session id after sign-in");
    }

    set_sentry_user(
        user.profile.id.as_ref().map(|id| id.as_str()),
        &user.profile.email,
    );
    tracing::info!(email = %user.profile.email, admin = user.is_admin(), "Signed in");

    Ok(if user.is_admin() { "/admin" } else { "/" })
}

// =============================================================================
// Sign-in Routes
// =============================================================================

/// Display the sign-in page.
#[instrument(skip(state, session))]
pub async fn signin_page(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    SignInTemplate {
        nav: NavView::for_session(&session).await,
        email: String::new(),
        error: None,
        success: None,
        google_client_id: state.config().google_client_id.clone(),
    }
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Response {
    let result = state
        .backend()
        .sign_in(form.email.trim(), &form.password)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Sign-in rejected");
            e.user_message()
        });

    let error = match result {
        Ok(auth) => match start_session(&session, &auth).await {
            Ok(target) => return Redirect::to(target).into_response(),
            Err(message) => message,
        },
        Err(message) => message,
    };

    SignInTemplate {
        nav: NavView::for_session(&session).await,
        email: form.email,
        error: Some(error),
        success: None,
        google_client_id: state.config().google_client_id.clone(),
    }
    .into_response()
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page.
#[instrument(skip(session))]
pub async fn signup_page(session: Session) -> impl IntoResponse {
    SignupTemplate {
        nav: NavView::for_session(&session).await,
        form: SignupView {
            country_code: "+1".to_string(),
            ..SignupView::default()
        },
        verifying: false,
        error: None,
        success: None,
    }
}

/// Handle both sign-up steps.
///
/// Without a code, asks the backend to email one. With a code, verifies it
/// and signs the new user in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Response {
    let request = form.to_request();
    let view = SignupView::from(&form);

    if request.otp.is_none() {
        let (verifying, error, success) = match state.backend().send_otp(&request).await {
            Ok(()) => (true, None, Some(SIGNUP_OTP_SENT.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "Sign-up OTP request failed");
                (false, Some(e.user_message()), None)
            }
        };
        return SignupTemplate {
            nav: NavView::for_session(&session).await,
            form: view,
            verifying,
            error,
            success,
        }
        .into_response();
    }

    let error = match state.backend().verify_otp(&request).await {
        Ok(auth) => match start_session(&session, &auth).await {
            Ok(target) => return Redirect::to(target).into_response(),
            Err(message) => message,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up OTP rejected");
            e.user_message()
        }
    };

    SignupTemplate {
        nav: NavView::for_session(&session).await,
        form: view,
        verifying: true,
        error: Some(error),
        success: None,
    }
    .into_response()
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
#[instrument(skip(session))]
pub async fn forgot_page(session: Session) -> impl IntoResponse {
    ForgotTemplate {
        nav: NavView::for_session(&session).await,
        email: String::new(),
        error: None,
    }
}

/// Email a reset code, then move on to the reset form.
#[instrument(skip(state, session))]
pub async fn forgot(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotForm>,
) -> Response {
    let email = form.email.trim().to_string();
    match state.backend().send_reset_otp(&email).await {
        Ok(()) => ResetTemplate {
            nav: NavView::for_session(&session).await,
            email,
            error: None,
            success: Some(RESET_OTP_SENT.to_string()),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Reset OTP request failed");
            ForgotTemplate {
                nav: NavView::for_session(&session).await,
                email,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

/// Display the reset password page.
#[instrument(skip(session))]
pub async fn reset_page(session: Session, Query(query): Query<ResetQuery>) -> impl IntoResponse {
    ResetTemplate {
        nav: NavView::for_session(&session).await,
        email: query.email.unwrap_or_default(),
        error: None,
        success: None,
    }
}

/// Set a new password with the emailed code.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetForm>,
) -> Response {
    let email = form.email.trim().to_string();
    let result = state
        .backend()
        .reset_password(&email, form.otp.trim(), &form.new_password)
        .await;

    let nav = NavView::for_session(&session).await;
    match result {
        Ok(()) => SignInTemplate {
            nav,
            email,
            error: None,
            success: Some(PASSWORD_RESET.to_string()),
            google_client_id: state.config().google_client_id.clone(),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset rejected");
            ResetTemplate {
                nav,
                email,
                error: Some(e.user_message()),
                success: None,
            }
            .into_response()
        }
    }
}

// =============================================================================
// Google & Logout
// =============================================================================

/// Sign in with the identity from the Google button.
#[instrument(skip(state, session))]
pub async fn google(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<GoogleForm>,
) -> Response {
    let identity = GoogleSignIn {
        name: form.name,
        email: form.email,
        google_id: form.google_id,
    };

    let error = match state.backend().google_sign_in(&identity).await {
        Ok(auth) => match start_session(&session, &auth).await {
            Ok(target) => return Redirect::to(target).into_response(),
            Err(message) => message,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in rejected");
            e.user_message()
        }
    };

    SignInTemplate {
        nav: NavView::for_session(&session).await,
        email: identity.email,
        error: Some(error),
        success: None,
        google_client_id: state.config().google_client_id.clone(),
    }
    .into_response()
}

/// Sign out. The cart stays.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = CurrentUser::clear(&session).await {
        tracing::error!(error = %e, "Failed to clear signed-in user");
    }
    clear_sentry_user();
    Redirect::to("/")
}
