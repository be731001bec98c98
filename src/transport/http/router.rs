use crate::transport::http::handlers::{auth, files, health};
use crate::transport::http::types::{
    AppState, ChainRecordOut, ErrorBody, FileRecordOut, HealthOut, LoginForm, SignupRequest,
    TokenOut, UserOut, VerifyResultOut,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::me_handler,
        files::list_files_handler,
        files::register_file_handler,
        files::verify_file_handler
    ),
    components(schemas(
        SignupRequest,
        LoginForm,
        UserOut,
        TokenOut,
        FileRecordOut,
        ChainRecordOut,
        VerifyResultOut,
        HealthOut,
        ErrorBody
    )),
    modifiers(&BearerSecurity)
)]
#[allow(dead_code)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/auth/register", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/me", get(auth::me_handler))
        .route("/files", get(files::list_files_handler))
        .route("/files/register", post(files::register_file_handler))
        .route("/files/verify", post(files::verify_file_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state)
}
