//! Twilio REST implementation of the conversations gateway.

use crate::config::TwilioConfig;
use crate::error::{ConfigError, ProviderError};
use crate::gateway::ConversationsGateway;
use crate::types::{
    ApiErrorBody, Conversation, Participant, SentMessage, Webhook, WebhookPage,
    WebhookSubscription,
};
use async_trait::async_trait;
use masked_sms_core::{ConversationSid, ParticipantSid, PhoneNumber, WebhookSid};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use rootcause::Report;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Twilio client for the Conversations and Messages APIs.
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.config.account_sid)
            .field("phone_number", &self.config.phone_number)
            .field("conversations_base_url", &self.config.conversations_base_url)
            .finish_non_exhaustive()
    }
}

impl TwilioClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials or the masking number are missing, or
    /// the HTTP client cannot be built.
    pub fn new(config: TwilioConfig) -> Result<Self, Report<ConfigError>> {
        for (setting, value) in [
            ("account_sid", &config.account_sid),
            ("auth_token", &config.auth_token),
            ("phone_number", &config.phone_number),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing { setting }.into());
            }
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    fn conversations_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.conversations_base_url.trim_end_matches('/'),
            path
        )
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
    }

    /// Sends a request, failing only if no response arrived.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, Report<ProviderError>> {
        let response = request.send().await.map_err(|e| ProviderError::Transport {
            reason: e.to_string(),
        })?;
        debug!(status = %response.status(), url = %response.url(), "Provider responded");
        Ok(response)
    }

    /// Sends a request and turns any non-success status into an error.
    async fn execute_ok(&self, request: RequestBuilder) -> Result<Response, Report<ProviderError>> {
        let response = self.execute(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await.into())
        }
    }

    /// Sends a delete request. A resource that is already gone is `false`.
    async fn execute_removal(&self, request: RequestBuilder) -> Result<bool, Report<ProviderError>> {
        let response = self.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Resource was already removed");
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }
        Ok(true)
    }
}

/// Builds an API error from a failed response, using the provider's error
/// body when it has one.
async fn api_error(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => ProviderError::Api {
            status,
            code: body.code,
            message: body.message.unwrap_or(text),
        },
        Err(_) => ProviderError::Api {
            status,
            code: None,
            message: text,
        },
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &str,
    response: Response,
) -> Result<T, Report<ProviderError>> {
    let bytes = response.bytes().await.map_err(|e| ProviderError::Transport {
        reason: e.to_string(),
    })?;
    let value = serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode {
        operation: operation.to_string(),
        reason: e.to_string(),
    })?;
    Ok(value)
}

fn webhook_form<'a>(subscription: &'a WebhookSubscription) -> Vec<(&'static str, &'a str)> {
    let mut form = vec![
        ("Configuration.Url", subscription.url.as_str()),
        ("Configuration.Method", subscription.method.as_str()),
    ];
    for filter in &subscription.filters {
        form.push(("Configuration.Filters", filter.as_str()));
    }
    form
}

#[async_trait]
impl ConversationsGateway for TwilioClient {
    #[instrument(skip(self))]
    async fn create_conversation(
        &self,
        friendly_name: &str,
    ) -> Result<Conversation, Report<ProviderError>> {
        let request = self
            .request(Method::POST, self.conversations_url("Conversations"))
            .form(&[("FriendlyName", friendly_name)]);
        let response = self.execute_ok(request).await?;
        decode("create_conversation", response).await
    }

    #[instrument(skip(self), fields(conversation = %sid))]
    async fn fetch_conversation(
        &self,
        sid: &ConversationSid,
    ) -> Result<Option<Conversation>, Report<ProviderError>> {
        let request = self.request(
            Method::GET,
            self.conversations_url(&format!("Conversations/{sid}")),
        );
        let response = self.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Conversation no longer exists");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }
        decode("fetch_conversation", response).await.map(Some)
    }

    #[instrument(skip(self), fields(conversation = %sid))]
    async fn remove_conversation(
        &self,
        sid: &ConversationSid,
    ) -> Result<bool, Report<ProviderError>> {
        let request = self.request(
            Method::DELETE,
            self.conversations_url(&format!("Conversations/{sid}")),
        );
        self.execute_removal(request).await
    }

    #[instrument(skip(self), fields(conversation = %sid))]
    async fn list_webhooks(
        &self,
        sid: &ConversationSid,
    ) -> Result<Vec<Webhook>, Report<ProviderError>> {
        let request = self.request(
            Method::GET,
            self.conversations_url(&format!("Conversations/{sid}/Webhooks")),
        );
        let response = self.execute_ok(request).await?;
        let page: WebhookPage = decode("list_webhooks", response).await?;
        Ok(page.webhooks)
    }

    #[instrument(skip(self, subscription), fields(conversation = %sid, url = %subscription.url))]
    async fn create_webhook(
        &self,
        sid: &ConversationSid,
        subscription: &WebhookSubscription,
    ) -> Result<Webhook, Report<ProviderError>> {
        let mut form = webhook_form(subscription);
        form.insert(0, ("Target", "webhook"));
        let request = self
            .request(
                Method::POST,
                self.conversations_url(&format!("Conversations/{sid}/Webhooks")),
            )
            .form(&form);
        let response = self.execute_ok(request).await?;
        decode("create_webhook", response).await
    }

    #[instrument(skip(self, subscription), fields(conversation = %sid, webhook = %webhook, url = %subscription.url))]
    async fn update_webhook(
        &self,
        sid: &ConversationSid,
        webhook: &WebhookSid,
        subscription: &WebhookSubscription,
    ) -> Result<Webhook, Report<ProviderError>> {
        let request = self
            .request(
                Method::POST,
                self.conversations_url(&format!("Conversations/{sid}/Webhooks/{webhook}")),
            )
            .form(&webhook_form(subscription));
        let response = self.execute_ok(request).await?;
        decode("update_webhook", response).await
    }

    #[instrument(skip(self), fields(conversation = %sid, number = %number))]
    async fn add_participant(
        &self,
        sid: &ConversationSid,
        number: &PhoneNumber,
    ) -> Result<Participant, Report<ProviderError>> {
        let request = self
            .request(
                Method::POST,
                self.conversations_url(&format!("Conversations/{sid}/Participants")),
            )
            .form(&[
                ("MessagingBinding.Address", number.as_str()),
                ("MessagingBinding.ProxyAddress", self.config.phone_number.as_str()),
            ]);
        let response = self.execute_ok(request).await?;
        decode("add_participant", response).await
    }

    #[instrument(skip(self), fields(conversation = %sid, participant = %participant))]
    async fn remove_participant(
        &self,
        sid: &ConversationSid,
        participant: &ParticipantSid,
    ) -> Result<bool, Report<ProviderError>> {
        let request = self.request(
            Method::DELETE,
            self.conversations_url(&format!("Conversations/{sid}/Participants/{participant}")),
        );
        self.execute_removal(request).await
    }

    #[instrument(skip(self, body), fields(to = %to))]
    async fn send_message(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SentMessage, Report<ProviderError>> {
        let request = self.request(Method::POST, self.messages_url()).form(&[
            ("To", to.as_str()),
            ("From", self.config.phone_number.as_str()),
            ("Body", body),
        ]);
        let response = self.execute_ok(request).await?;
        decode("send_message", response).await
    }
}
