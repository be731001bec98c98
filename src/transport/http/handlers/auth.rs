use crate::transport::http::handlers::common::current_user;
use crate::transport::http::types::{
    ApiError, AppState, ErrorBody, LoginForm, SignupRequest, TokenOut, UserOut,
};
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Form, Json};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserOut),
        (status = 400, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Invalid body or email", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<AppState>,
    request: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        request.map_err(|e| ApiError::validation(format!("Invalid JSON body: {}", e)))?;

    let mut service = state.service.lock().await;
    let user = service.create_user(&request.email, &request.password)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenOut),
        (status = 401, description = "Incorrect email or password", body = ErrorBody),
        (status = 422, description = "Missing form fields", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenOut>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::validation(format!("Invalid form body: {}", e)))?;

    let mut service = state.service.lock().await;
    let access_token = service.login(&form.username, &form.password)?;
    Ok(Json(TokenOut {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The authenticated account", body = UserOut),
        (status = 401, description = "Missing or rejected token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserOut>, ApiError> {
    Ok(Json(current_user(&state, &headers).await?))
}
