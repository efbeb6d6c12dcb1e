//! reqwest implementation of `BankApi`.

use std::time::Duration;

use async_trait::async_trait;
use conta_core::{
    Account, AccountContext, ApiError, BankApi, BoletoDetails, BoletoPayment, LocalTransfer, RejectionReason,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{
    AccountResponse, BoletoPaymentBody, BoletoQuery, BoletoResponse, ErrorBody, LocalTransferBody, PayeeQuery,
};

/// Header carrying the holder id on every request.
pub const HOLDER_HEADER: &str = "correntista_id";

pub struct HttpBankApi {
    http_client: HttpClient,
    base_url: String,
}

impl HttpBankApi {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:3333";

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(http_client, base_url))
    }

    pub fn with_client(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers(ctx: &AccountContext) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let holder = HeaderValue::from_str(&ctx.holder_id.to_string())
            .map_err(|e| ApiError::Transport(format!("bad holder header: {e}")))?;
        headers.insert(HOLDER_HEADER, holder);
        Ok(headers)
    }

    async fn send(&self, request: RequestBuilder, ctx: &AccountContext) -> Result<Reply, ApiError> {
        let response = request
            .headers(Self::headers(ctx)?)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response: {e}")))?;
        Ok(Reply { status, body })
    }

    async fn post<B: Serialize + ?Sized>(&self, ctx: &AccountContext, path: &str, body: &B) -> Result<Reply, ApiError> {
        debug!(holder = %ctx.holder_id, path, "POST");
        self.send(self.http_client.post(self.url(path)).json(body), ctx).await
    }
}

/// Status and body of a finished exchange.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Turn a non-2xx answer into an error; pass successes through.
    pub fn ensure_success(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            return Ok(self);
        }
        warn!(status = self.status.as_u16(), "bank returned an error");
        Err(classify_rejection(self.status, &self.body))
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(format!("failed to parse response: {e}")))
    }

    /// A 404 or an empty body means no boleto carries the code.
    pub fn into_boleto(self) -> Result<Option<BoletoDetails>, ApiError> {
        if self.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let reply = self.ensure_success()?;
        if reply.body.trim().is_empty() {
            return Ok(None);
        }
        reply.decode::<BoletoResponse>()?.into_details()
    }

    pub fn into_payee_registered(self) -> Result<bool, ApiError> {
        self.ensure_success()?.decode()
    }

    pub fn into_account(self) -> Result<Account, ApiError> {
        self.ensure_success()?.decode::<AccountResponse>()?.into_account()
    }
}

/// Map an error answer to the reason shown to the user.
///
/// 401/403 mean the password was refused; a message mentioning the balance
/// means insufficient funds; other client errors carry the server's message.
pub fn classify_rejection(status: StatusCode, body: &str) -> ApiError {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return ApiError::Rejected(RejectionReason::InvalidCredentials);
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.trim().to_string());

    let lowered = message.to_lowercase();
    if lowered.contains("saldo") || lowered.contains("insufficient") {
        return ApiError::Rejected(RejectionReason::InsufficientFunds);
    }
    if status.is_client_error() {
        return ApiError::Rejected(RejectionReason::Other(message));
    }
    ApiError::Status {
        status: status.as_u16(),
        body: message,
    }
}

#[async_trait]
impl BankApi for HttpBankApi {
    async fn lookup_boleto(&self, ctx: &AccountContext, code: &str) -> Result<Option<BoletoDetails>, ApiError> {
        self.post(ctx, "/pagamento/boleto/consultar", &BoletoQuery { code })
            .await?
            .into_boleto()
    }

    async fn pay_boleto(&self, ctx: &AccountContext, payment: &BoletoPayment) -> Result<(), ApiError> {
        let body = BoletoPaymentBody {
            code: &payment.code,
            secret: payment.secret.expose(),
        };
        self.post(ctx, "/pagamento/boleto/pagar", &body).await?.ensure_success()?;
        Ok(())
    }

    async fn check_payee_registered(&self, ctx: &AccountContext, document: &str) -> Result<bool, ApiError> {
        self.post(ctx, "/transferencia/check/cpf_cnpj", &PayeeQuery { document })
            .await?
            .into_payee_registered()
    }

    async fn transfer_local(&self, ctx: &AccountContext, transfer: &LocalTransfer) -> Result<(), ApiError> {
        let body = LocalTransferBody {
            document: &transfer.document,
            amount: transfer.amount,
            secret: transfer.secret.expose(),
        };
        self.post(ctx, "/transferencia/local", &body).await?.ensure_success()?;
        Ok(())
    }

    async fn refresh_account(&self, ctx: &AccountContext) -> Result<Account, ApiError> {
        debug!(holder = %ctx.holder_id, "GET /conta-corrente");
        self.send(self.http_client.get(self.url("/conta-corrente")), ctx)
            .await?
            .into_account()
    }
}
