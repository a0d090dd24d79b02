//! REST collaborator
//!
//! The chat screen talks to the backend over a small authenticated REST
//! surface for identity lookup, history, read state and image upload. The
//! `ChatApi` trait is the seam; `HttpChatApi` is the reqwest implementation.

use crate::model::{MessageKind, UserProfile};
use crate::protocol::{
    ConversationDetail, ConversationId, CreateConversationRequest, MessagesResponse, WireMessage,
};
use crate::settings::ChatSettings;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Image attachment ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name
    pub file_name: String,
    /// MIME type, always `image/*`
    pub mime_type: String,
    /// File contents
    pub bytes: Bytes,
    /// Caption, or the image placeholder
    pub caption: String,
    /// Id of the replied-to message
    pub reply_to: Option<String>,
}

/// REST operations the chat core depends on
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /users/{id}`
    async fn get_user(&self, user_id: &str) -> Result<UserProfile>;

    /// `POST /chat/conversations`; creates the direct conversation if needed
    async fn create_conversation(&self, participant_id: &str) -> Result<String>;

    /// `GET /chat/conversations/{id}`
    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail>;

    /// `PUT /chat/conversations/{id}/read`
    async fn mark_read(&self, conversation_id: &str) -> Result<()>;

    /// `GET /chat/conversations/{id}/messages`
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<WireMessage>>;

    /// `POST /chat/conversations/{id}/messages` as multipart
    ///
    /// Returns the created message when the response body carries one.
    async fn upload_image(
        &self,
        conversation_id: &str,
        upload: ImageUpload,
    ) -> Result<Option<WireMessage>>;
}

/// Run `fut` unless `token` is cancelled first
///
/// Cancellation yields `Error::Aborted`, which callers never surface.
pub async fn abortable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Aborted),
        result = fut => result,
    }
}

/// reqwest-backed `ChatApi`
#[derive(Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    credential: String,
}

impl HttpChatApi {
    /// Create a client for `settings.api_base_url` authenticated with `credential`
    pub fn new(settings: &ChatSettings, credential: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            credential: credential.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.credential)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authed(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            debug!("Request failed with status {}", status);
            Err(Error::Http {
                status: status.as_u16(),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        self.get_json(&format!("/users/{}", user_id)).await
    }

    async fn create_conversation(&self, participant_id: &str) -> Result<String> {
        let body = CreateConversationRequest {
            participant_id: participant_id.to_string(),
        };
        let response = self
            .send(self.client.post(self.url("/chat/conversations")).json(&body))
            .await?;
        let created: ConversationId = response.json().await?;
        Ok(created.id)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail> {
        self.get_json(&format!("/chat/conversations/{}", conversation_id))
            .await
    }

    async fn mark_read(&self, conversation_id: &str) -> Result<()> {
        self.send(
            self.client
                .put(self.url(&format!("/chat/conversations/{}/read", conversation_id))),
        )
        .await?;
        Ok(())
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<WireMessage>> {
        let history: MessagesResponse = self
            .get_json(&format!("/chat/conversations/{}/messages", conversation_id))
            .await?;
        Ok(history.messages)
    }

    async fn upload_image(
        &self,
        conversation_id: &str,
        upload: ImageUpload,
    ) -> Result<Option<WireMessage>> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("content", upload.caption)
            .text("type", MessageKind::Image.as_str());
        if let Some(reply_to) = upload.reply_to {
            form = form.text("replyTo", reply_to);
        }

        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/chat/conversations/{}/messages", conversation_id)))
                    .multipart(form),
            )
            .await?;

        let body: serde_json::Value = response.json().await?;
        Ok(parse_upload_response(body))
    }
}

/// Accept either `{message: {...}}` or a bare message body
pub(crate) fn parse_upload_response(body: serde_json::Value) -> Option<WireMessage> {
    let candidate = match body.get("message") {
        Some(inner) => inner.clone(),
        None => body,
    };
    match serde_json::from_value(candidate) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Upload response carried no message: {}", e);
            None
        }
    }
}
