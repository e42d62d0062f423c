//! HTTP routes: the admin pages and the provider webhook.

use crate::error::{AppError, FormError};
use crate::state::AppState;
use crate::views;
use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{Html, Redirect},
    routing::{get, post},
};
use chrono::Utc;
use masked_sms_conversation::ConversationError;
use masked_sms_core::PhoneNumber;
use rootcause::Report;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add-phone", get(phone_form).post(add_phone))
        .route("/webhooks/conversation", post(conversation_event))
        .route("/webhooks/conversation/", post(conversation_event))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Returns the first value of a possibly comma-separated header.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Host the client addressed, honouring a reverse proxy.
fn request_host(headers: &HeaderMap) -> Option<&str> {
    first_header_value(headers, "x-forwarded-host")
        .or_else(|| first_header_value(headers, header::HOST.as_str()))
}

/// Base URL the provider should post webhook events to.
fn callback_base_url(headers: &HeaderMap) -> Option<String> {
    let host = request_host(headers)?;
    let scheme = first_header_value(headers, "x-forwarded-proto").unwrap_or("http");
    Some(format!("{scheme}://{host}/webhooks"))
}

/// True when the host cannot be reached from the internet.
fn is_local_host(headers: &HeaderMap) -> bool {
    let Some(host) = request_host(headers) else {
        return false;
    };
    let name = host
        .rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map_or(host, |(name, _)| name);
    name.contains("local") || name == "127.0.0.1" || name == "[::1]"
}

async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let bindings = state
        .service
        .list_bindings()
        .await
        .map_err(|e| AppError::Bindings {
            details: e.to_string(),
        })?;
    let page = views::index(&bindings, Utc::now(), is_local_host(&headers));
    Ok(Html(page.into_string()))
}

async fn phone_form() -> Html<String> {
    Html(views::phone_form().into_string())
}

/// Fields posted by the phone form.
#[derive(Debug, Deserialize)]
pub struct AddPhoneForm {
    #[serde(rename = "phoneNumber")]
    phone_number: String,
    #[serde(rename = "expirationTime")]
    expiration_time: String,
}

/// A validated request to bind a number.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AddPhoneRequest {
    number: PhoneNumber,
    expiration_minutes: u32,
    callback_base_url: String,
}

impl AddPhoneRequest {
    fn parse(
        form: Result<Form<AddPhoneForm>, FormRejection>,
        headers: &HeaderMap,
    ) -> Result<Self, FormError> {
        let Form(form) = form.map_err(|e| FormError::Malformed {
            details: e.body_text(),
        })?;
        let number = PhoneNumber::parse(&form.phone_number).map_err(|e| {
            FormError::InvalidNumber {
                input: e.input,
                reason: e.reason.to_string(),
            }
        })?;
        let expiration_minutes = form
            .expiration_time
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|minutes| *minutes > 0)
            .ok_or_else(|| FormError::InvalidExpiration {
                input: form.expiration_time.clone(),
            })?;
        let callback_base_url = callback_base_url(headers).ok_or(FormError::MissingHost)?;

        Ok(Self {
            number,
            expiration_minutes,
            callback_base_url,
        })
    }
}

async fn add_phone(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<AddPhoneForm>, FormRejection>,
) -> Redirect {
    match AddPhoneRequest::parse(form, &headers) {
        Ok(request) => {
            if let Err(e) = bind_and_welcome(&state, &request).await {
                warn!(number = %request.number, error = %e, "Failed to add phone number");
            }
        }
        Err(e) => warn!(error = %e, "Rejected phone form"),
    }
    Redirect::to("/")
}

async fn bind_and_welcome(
    state: &AppState,
    request: &AddPhoneRequest,
) -> Result<(), Report<ConversationError>> {
    let conversation = state
        .service
        .get_or_create_conversation(&request.callback_base_url)
        .await?;
    let outcome = state
        .service
        .bind_number(&conversation, &request.number, request.expiration_minutes)
        .await?;

    if outcome.is_new_session() {
        state
            .service
            .notify(outcome.binding(), &state.welcome_message)
            .await?;
        info!(number = %request.number, "Phone number added");
    } else {
        info!(number = %request.number, "Nothing added: number is already active");
    }
    Ok(())
}

/// Fields of a message-added webhook this service reads.
#[derive(Debug, Deserialize)]
pub struct ConversationEvent {
    #[serde(rename = "Author")]
    author: Option<String>,
}

/// Records activity for the message author. Always answers 200 so the
/// provider does not retry.
async fn conversation_event(
    State(state): State<Arc<AppState>>,
    event: Result<Form<ConversationEvent>, FormRejection>,
) -> StatusCode {
    let author = match event {
        Ok(Form(ConversationEvent {
            author: Some(author),
        })) => author,
        Ok(_) => {
            debug!("Webhook event without an author");
            return StatusCode::OK;
        }
        Err(e) => {
            warn!(error = %e, "Malformed webhook event");
            return StatusCode::OK;
        }
    };

    let number = PhoneNumber::parse(&author)
        .map(|number| number.as_str().to_string())
        .unwrap_or(author);

    match state.service.record_activity(&number, Utc::now()).await {
        Ok(Some(_)) => debug!(number = %number, "Recorded activity"),
        Ok(None) => debug!(number = %number, "Activity from an unknown number"),
        Err(e) => warn!(number = %number, error = %e, "Failed to record activity"),
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use masked_sms_conversation::{ConversationService, DEFAULT_FRIENDLY_NAME};
    use masked_sms_core::{ConversationSid, ParticipantSid, PhoneBinding};
    use masked_sms_provider::{CallKind, RecordingGateway};
    use masked_sms_store::{BindingStore, JsonStore};
    use tower::ServiceExt;

    const WELCOME: &str = "Conversation session began. Write some message.";

    fn app() -> (Router, Arc<JsonStore>, Arc<RecordingGateway>) {
        let store = Arc::new(JsonStore::in_memory());
        let gateway = Arc::new(RecordingGateway::new());
        let service = Arc::new(ConversationService::new(
            store.clone(),
            gateway.clone(),
            DEFAULT_FRIENDLY_NAME,
        ));
        (router(AppState::new(service, WELCOME)), store, gateway)
    }

    fn form_post(uri: &str, host: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::HOST, host)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn callback_url_prefers_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "internal:3000".parse().unwrap());
        assert_eq!(
            callback_base_url(&headers).as_deref(),
            Some("http://internal:3000/webhooks")
        );

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        headers.insert("x-forwarded-host", "abc.ngrok.io, proxy".parse().unwrap());
        assert_eq!(
            callback_base_url(&headers).as_deref(),
            Some("https://abc.ngrok.io/webhooks")
        );
    }

    #[test]
    fn local_hosts_are_detected() {
        let local = |host: &str| {
            let mut headers = HeaderMap::new();
            headers.insert(header::HOST, host.parse().unwrap());
            is_local_host(&headers)
        };
        assert!(local("localhost:3000"));
        assert!(local("127.0.0.1:3000"));
        assert!(!local("abc.ngrok.io"));
        assert!(!is_local_host(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn index_lists_nothing_initially() {
        let (app, _, _) = app();

        let response = app
            .oneshot(
                Request::get("/")
                    .header(header::HOST, "example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("No phone numbers"));
        assert!(!page.contains("local address"));
    }

    #[tokio::test]
    async fn index_warns_on_local_host() {
        let (app, _, _) = app();

        let response = app
            .oneshot(
                Request::get("/")
                    .header(header::HOST, "localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(body_text(response).await.contains("local address"));
    }

    #[tokio::test]
    async fn form_page_renders() {
        let (app, _, _) = app();

        let response = app
            .oneshot(Request::get("/add-phone").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("expirationTime"));
    }

    #[tokio::test]
    async fn adding_a_number_binds_and_welcomes() {
        let (app, store, gateway) = app();

        let response = app
            .oneshot(form_post(
                "/add-phone",
                "example.com",
                "phoneNumber=%2B15550001&expirationTime=5",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let bindings = store.list_bindings().await.unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].number.as_str(), "+15550001");
        assert_eq!(bindings[0].expiration_minutes, 5);
        assert_eq!(
            gateway.sent_messages().await,
            vec![(bindings[0].number.clone(), WELCOME.to_string())]
        );
        let conversation = store.active_conversation().await.unwrap().unwrap();
        let webhooks = gateway.webhooks(&conversation.id).await;
        assert_eq!(
            webhooks[0].configuration.url.as_deref(),
            Some("http://example.com/webhooks/conversation/")
        );
    }

    #[tokio::test]
    async fn forwarded_scheme_reaches_webhook_url() {
        let (app, store, gateway) = app();
        let mut request = form_post(
            "/add-phone",
            "internal:3000",
            "phoneNumber=%2B15550001&expirationTime=5",
        );
        request
            .headers_mut()
            .insert("x-forwarded-proto", "https".parse().unwrap());
        request
            .headers_mut()
            .insert("x-forwarded-host", "abc.ngrok.io".parse().unwrap());

        app.oneshot(request).await.unwrap();

        let conversation = store.active_conversation().await.unwrap().unwrap();
        let webhooks = gateway.webhooks(&conversation.id).await;
        assert_eq!(
            webhooks[0].configuration.url.as_deref(),
            Some("https://abc.ngrok.io/webhooks/conversation/")
        );
    }

    #[tokio::test]
    async fn adding_the_same_number_twice_welcomes_once() {
        let (app, store, gateway) = app();
        let body = "phoneNumber=%2B15550001&expirationTime=5";

        app.clone()
            .oneshot(form_post("/add-phone", "example.com", body))
            .await
            .unwrap();
        let response = app
            .oneshot(form_post("/add-phone", "example.com", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(store.list_bindings().await.unwrap().len(), 1);
        assert_eq!(gateway.sent_messages().await.len(), 1);
        assert_eq!(gateway.count(CallKind::AddParticipant).await, 1);
    }

    #[tokio::test]
    async fn invalid_input_redirects_without_remote_calls() {
        let (app, store, gateway) = app();

        for body in [
            "phoneNumber=555-1234&expirationTime=5",
            "phoneNumber=%2B15550001&expirationTime=0",
            "phoneNumber=%2B15550001&expirationTime=soon",
            "phoneNumber=%2B15550001",
        ] {
            let response = app
                .clone()
                .oneshot(form_post("/add-phone", "example.com", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "body: {body}");
        }

        assert!(gateway.calls().await.is_empty());
        assert!(store.list_bindings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_still_redirects() {
        let (app, store, gateway) = app();
        gateway.fail(CallKind::AddParticipant).await;

        let response = app
            .oneshot(form_post(
                "/add-phone",
                "example.com",
                "phoneNumber=%2B15550001&expirationTime=5",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(store.list_bindings().await.unwrap().is_empty());
        assert!(gateway.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn webhook_stamps_author_activity() {
        let (app, store, _) = app();
        let started = Utc::now() - chrono::Duration::minutes(4);
        store
            .save_binding(&PhoneBinding::new(
                ParticipantSid::new("MB1"),
                ConversationSid::new("CH1"),
                PhoneNumber::parse("+15550001").unwrap(),
                5,
                started,
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(form_post(
                "/webhooks/conversation/",
                "example.com",
                "EventType=onMessageAdded&Author=%2B15550001&Body=hi",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.is_empty());
        let binding = store
            .find_binding_by_number("+15550001")
            .await
            .unwrap()
            .unwrap();
        assert!(binding.last_activity_at > started);
    }

    #[tokio::test]
    async fn webhook_answers_ok_for_anything() {
        let (app, _, _) = app();

        let unknown = app
            .clone()
            .oneshot(form_post(
                "/webhooks/conversation",
                "example.com",
                "Author=%2B15559999",
            ))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::OK);

        let malformed = app
            .oneshot(
                Request::post("/webhooks/conversation/")
                    .body(Body::from("not a form"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::OK);
        assert!(body_text(malformed).await.is_empty());
    }
}
