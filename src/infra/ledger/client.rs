// Responsible for all HTTP communication with the Ledger/Identity Service.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::domain::session::BearerToken;
use crate::error::{codes, ClientError, ClientResult};
use crate::infra::config::ClientConfig;
use crate::infra::ledger::types::{
    ApiErrorBody, FileRecord, FileUpload, IdentityResponse, LoginResponse, RegistrationReceipt,
    VerifyResponse,
};
use crate::infra::ledger::LedgerApi;

/// Which kind of call failed; decides how ambiguous statuses are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Signup,
    Login,
    Authenticated,
    /// Register/verify: timeouts and 5xx are chain failures.
    FileOp,
    Health,
}

pub struct HttpLedgerApi {
    base_url: String,
    client: Client,
}

impl HttpLedgerApi {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(format!("file-integrity-registry/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_raw(&self, kind: CallKind, request: RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_failure(kind, &e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ApiErrorBody {
            detail: (!text.trim().is_empty()).then(|| json!(text)),
            code: None,
        });
        debug!(?kind, status = status.as_u16(), code = ?body.code, "ledger service rejected request");
        Err(classify_failure(kind, status, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        kind: CallKind,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.send_raw(kind, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Unknown(format!("malformed service response: {}", e)))
    }
}

#[async_trait]
impl LedgerApi for HttpLedgerApi {
    async fn create_account(&self, email: &str, password: &str) -> ClientResult<()> {
        let request = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": password }));
        self.send_raw(CallKind::Signup, request).await?;
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<BearerToken> {
        let request = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", email), ("password", password)]);
        let body: LoginResponse = self.send_json(CallKind::Login, request).await?;
        BearerToken::new(body.access_token)
            .ok_or_else(|| ClientError::Unknown("service returned an empty access token".into()))
    }

    async fn identity(&self, token: &BearerToken) -> ClientResult<IdentityResponse> {
        let request = self.client.get(self.url("/me")).bearer_auth(token.expose());
        self.send_json(CallKind::Authenticated, request).await
    }

    async fn list_files(&self, token: &BearerToken) -> ClientResult<Vec<FileRecord>> {
        let request = self.client.get(self.url("/files")).bearer_auth(token.expose());
        self.send_json(CallKind::Authenticated, request).await
    }

    async fn register_file(
        &self,
        token: &BearerToken,
        upload: &FileUpload,
        metadata: &str,
    ) -> ClientResult<RegistrationReceipt> {
        let form = Form::new()
            .part(
                "file",
                Part::bytes(upload.bytes.clone()).file_name(upload.filename.clone()),
            )
            .text("metadata", metadata.to_string());
        let request = self
            .client
            .post(self.url("/files/register"))
            .bearer_auth(token.expose())
            .multipart(form);
        self.send_json(CallKind::FileOp, request).await
    }

    async fn verify_file(
        &self,
        token: &BearerToken,
        upload: &FileUpload,
    ) -> ClientResult<VerifyResponse> {
        let form = Form::new().part(
            "file",
            Part::bytes(upload.bytes.clone()).file_name(upload.filename.clone()),
        );
        let request = self
            .client
            .post(self.url("/files/verify"))
            .bearer_auth(token.expose())
            .multipart(form);
        self.send_json(CallKind::FileOp, request).await
    }

    async fn health(&self) -> ClientResult<()> {
        let request = self.client.get(self.url("/health"));
        self.send_raw(CallKind::Health, request).await?;
        Ok(())
    }
}

fn transport_failure(kind: CallKind, err: &reqwest::Error) -> ClientError {
    if err.is_timeout() && kind == CallKind::FileOp {
        return ClientError::Ledger("request to the ledger service timed out".into());
    }
    ClientError::ServiceUnavailable(err.to_string())
}

/// Maps a non-2xx response onto the error taxonomy. The explicit `code` wins; the status
/// is only consulted when the service did not send one.
pub(crate) fn classify_failure(kind: CallKind, status: StatusCode, body: &ApiErrorBody) -> ClientError {
    let detail = body
        .detail_text()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    match body.code.as_deref() {
        Some(codes::VALIDATION_ERROR) => return ClientError::Validation(detail),
        Some(codes::INVALID_CREDENTIALS) => return ClientError::InvalidCredentials(detail),
        Some(codes::DUPLICATE_ACCOUNT) => return ClientError::DuplicateAccount(detail),
        Some(codes::UNAUTHORIZED) if kind == CallKind::Login => {
            return ClientError::InvalidCredentials(detail)
        }
        Some(codes::UNAUTHORIZED) => return ClientError::AuthExpired,
        Some(codes::INSUFFICIENT_CREDITS) => return ClientError::InsufficientCredits,
        Some(codes::LEDGER_ERROR) => return ClientError::Ledger(detail),
        _ => {}
    }

    match (kind, status) {
        (CallKind::Login, StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST) => {
            ClientError::InvalidCredentials(detail)
        }
        (_, StatusCode::UNAUTHORIZED) => ClientError::AuthExpired,
        (_, StatusCode::PAYMENT_REQUIRED) => ClientError::InsufficientCredits,
        (CallKind::Signup, StatusCode::BAD_REQUEST | StatusCode::CONFLICT) => {
            ClientError::DuplicateAccount(detail)
        }
        (_, StatusCode::UNPROCESSABLE_ENTITY) => ClientError::Validation(detail),
        (CallKind::FileOp, s) if s.is_server_error() => ClientError::Ledger(detail),
        (_, StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT) => {
            ClientError::ServiceUnavailable(detail)
        }
        (_, s) => ClientError::Unknown(format!("{}: {}", s.as_u16(), detail)),
    }
}
