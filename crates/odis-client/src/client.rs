//! ODIS combiner HTTP client.

use crate::auth::AuthSigner;
use crate::error::OdisError;
use crate::identifier::{finish_derivation, query_message, Blinder, IdentifierResult};
use crate::types::*;
use alloy::primitives::Address;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const QUOTA_PATH: &str = "/quotaStatus";
const SIGN_PATH: &str = "/getBlindedMessageSig";

/// ODIS phone number privacy client.
#[derive(Clone, Debug)]
pub struct OdisClient {
    client: Client,
    service: ServiceContext,
}

impl OdisClient {
    /// Create a new ODIS client.
    pub fn new(service: ServiceContext, timeout: Duration) -> Result<Self, OdisError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, service })
    }

    pub fn service(&self) -> &ServiceContext {
        &self.service
    }

    /// Fetch the remaining lookup quota of an account.
    #[instrument(skip(self, auth), fields(account = %account))]
    pub async fn quota_status(
        &self,
        account: Address,
        auth: &AuthSigner,
    ) -> Result<QuotaStatus, OdisError> {
        let request = QuotaRequest {
            account,
            authentication_method: auth.method(),
            session_id: None,
        };

        let response: QuotaResponse = self.post_signed(QUOTA_PATH, auth, &request).await?;

        if !response.success {
            return Err(OdisError::Unsuccessful(
                response.error.unwrap_or_else(|| "quota status rejected".into()),
            ));
        }
        if let Some(warnings) = response.warnings.as_ref().filter(|w| !w.is_empty()) {
            warn!("Quota status warnings: {:?}", warnings);
        }

        let status = QuotaStatus::from(&response);
        debug!(
            remaining = status.remaining_quota,
            total = status.total_quota,
            "Fetched quota status"
        );
        Ok(status)
    }

    /// Ask the service to sign a blinded query. Consumes one unit of quota.
    ///
    /// Returns the base64-encoded blinded signature.
    #[instrument(skip(self, auth, blinded_query), fields(account = %account))]
    pub async fn blinded_message_signature(
        &self,
        account: Address,
        auth: &AuthSigner,
        blinded_query: String,
    ) -> Result<String, OdisError> {
        let request = SignMessageRequest {
            account,
            blinded_query_phone_number: blinded_query,
            authentication_method: auth.method(),
            session_id: None,
        };

        let response: SignMessageResponse = self.post_signed(SIGN_PATH, auth, &request).await?;

        if !response.success {
            return Err(OdisError::Unsuccessful(
                response.error.unwrap_or_else(|| "signature request rejected".into()),
            ));
        }

        response
            .signature
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OdisError::Unsuccessful("response carried no signature".into()))
    }

    /// Derive the obfuscated identifier for a plaintext identifier.
    #[instrument(
        skip(self, plaintext, auth, blinder),
        fields(prefix = %prefix, account = %account)
    )]
    pub async fn obfuscated_identifier(
        &self,
        plaintext: &str,
        prefix: IdentifierPrefix,
        account: Address,
        auth: &AuthSigner,
        blinder: &dyn Blinder,
    ) -> Result<IdentifierResult, OdisError> {
        let message = query_message(prefix, plaintext);
        let blinded = blinder.blind(message.as_bytes())?;

        let signature = self
            .blinded_message_signature(account, auth, STANDARD.encode(blinded))
            .await?;

        finish_derivation(prefix, plaintext, &signature, blinder)
    }

    /// Sign the serialized body and POST it.
    async fn post_signed<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        auth: &AuthSigner,
        request: &Req,
    ) -> Result<Resp, OdisError> {
        let body = serde_json::to_vec(request)?;
        let authorization = auth.authorize(&body)?;

        let response = self
            .client
            .post(format!("{}{}", self.service.url, path))
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle HTTP response, converting errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, OdisError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            debug!("Response body: {}", preview(&body, 200));
            serde_json::from_str(&body).map_err(OdisError::from)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract error information from failed response.
    async fn extract_error(&self, response: reqwest::Response) -> OdisError {
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => {
                warn!("ODIS rejected request signature");
                OdisError::Unauthorized
            }
            StatusCode::FORBIDDEN => {
                warn!("ODIS quota exhausted");
                OdisError::QuotaExceeded
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("ODIS rate limit exceeded");
                OdisError::RateLimit
            }
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".into());
                OdisError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }
}

/// At most `max_chars` characters of `body`, cut on a character boundary.
fn preview(body: &str, max_chars: usize) -> &str {
    body.char_indices()
        .nth(max_chars)
        .map_or(body, |(i, _)| &body[..i])
}
