use anyhow::{anyhow, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::ChatMessage;

#[derive(Serialize)]
struct SlidesRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    #[serde(rename = "includeImages", skip_serializing_if = "Option::is_none")]
    include_images: Option<bool>,
}

#[derive(Deserialize)]
struct SlidesResponse {
    #[serde(rename = "presentationUrl")]
    presentation_url: String,
}

#[derive(Serialize)]
struct DocumentRequest<'a> {
    text: &'a str,
    download: bool,
}

#[derive(Serialize)]
struct InvestorsRequest<'a> {
    idea: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(rename = "businessIdea")]
    business_idea: &'a str,
    #[serde(rename = "chatHistory")]
    chat_history: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct HelloResponse {
    message: String,
}

/// Client for the pitch-generation backend. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Liveness probe, outside the workflow.
    pub async fn hello(&self) -> Result<String> {
        let response = self.client.get(self.url("/hello")).send().await?;
        let response = check_status(response).await?;
        let hello: HelloResponse = response.json().await?;
        Ok(hello.message)
    }

    /// Generate a slide deck. Success yields the presentation URL.
    pub async fn create_slides(
        &self,
        text: &str,
        author: Option<&str>,
        include_images: Option<bool>,
    ) -> Result<String> {
        let request = SlidesRequest {
            text,
            author,
            include_images,
        };
        debug!(endpoint = "/create_slides", "requesting slide deck");

        let response = self
            .client
            .post(self.url("/create_slides"))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let slides: SlidesResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("response missing presentationUrl: {e}"))?;
        Ok(slides.presentation_url)
    }

    /// Generate or re-fetch a binary artifact (roadmap pdf, video ad mp4).
    /// View and download hit the identical endpoint; the `download` flag only
    /// selects the response disposition server-side, never the content.
    pub async fn fetch_document(&self, endpoint: &str, text: &str, download: bool) -> Result<Vec<u8>> {
        let request = DocumentRequest { text, download };
        debug!(endpoint, download, "requesting binary artifact");

        let response = self
            .client
            .post(self.url(endpoint))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Find investors for an idea. The response shape is unconstrained JSON.
    pub async fn find_investors(&self, idea: &str) -> Result<serde_json::Value> {
        let request = InvestorsRequest { idea };
        debug!(endpoint = "/find-investors", "requesting investor network");

        let response = self
            .client
            .post(self.url("/find-investors"))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let value: serde_json::Value = response.json().await?;
        Ok(value)
    }

    /// One chat turn: the new message, the shared prompt, and the history
    /// recorded strictly before this turn.
    pub async fn chat(
        &self,
        message: &str,
        business_idea: &str,
        chat_history: &[ChatMessage],
    ) -> Result<String> {
        let request = ChatRequest {
            message,
            business_idea,
            chat_history,
        };
        debug!(endpoint = "/chat", turns = chat_history.len(), "sending chat turn");

        let response = self
            .client
            .post(self.url("/chat"))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("response missing response field: {e}"))?;
        Ok(chat.response)
    }
}

/// Any non-2xx status is a failure regardless of body. The body is read
/// best-effort for an `{error}` field to use as user-facing text.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, "backend request failed");
    Err(extract_error(status, &body))
}

fn extract_error(status: StatusCode, body: &str) -> anyhow::Error {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.is_empty() => anyhow!(parsed.error),
        _ => anyhow!("request failed with status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = BackendClient::new("http://localhost:5000/");
        assert_eq!(client.url("/create_slides"), "http://localhost:5000/create_slides");
    }

    #[test]
    fn slides_request_shape() {
        let req = SlidesRequest {
            text: "Build a pet-sitting app",
            author: Some("Ada"),
            include_images: Some(true),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["text"], "Build a pet-sitting app");
        assert_eq!(json["author"], "Ada");
        assert_eq!(json["includeImages"], true);
    }

    #[test]
    fn slides_request_omits_optional_fields() {
        let req = SlidesRequest {
            text: "idea",
            author: None,
            include_images: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("author").is_none());
        assert!(json.get("includeImages").is_none());
    }

    #[test]
    fn document_request_carries_the_download_flag() {
        let view = serde_json::to_value(DocumentRequest { text: "idea", download: false }).unwrap();
        let save = serde_json::to_value(DocumentRequest { text: "idea", download: true }).unwrap();
        assert_eq!(view["text"], save["text"]);
        assert_eq!(view["download"], false);
        assert_eq!(save["download"], true);
    }

    #[test]
    fn investors_request_shape() {
        let json = serde_json::to_value(InvestorsRequest { idea: "pet-sitting app" }).unwrap();
        assert_eq!(json["idea"], "pet-sitting app");
    }

    #[test]
    fn chat_request_shape() {
        let history = vec![
            ChatMessage { role: ChatRole::User, content: "Hi".into() },
            ChatMessage { role: ChatRole::Assistant, content: "Hello".into() },
        ];
        let req = ChatRequest {
            message: "What next?",
            business_idea: "pet-sitting app",
            chat_history: &history,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["message"], "What next?");
        assert_eq!(json["businessIdea"], "pet-sitting app");
        assert_eq!(json["chatHistory"][0]["role"], "user");
        assert_eq!(json["chatHistory"][1]["content"], "Hello");
    }

    #[test]
    fn extract_error_prefers_the_body_field() {
        let err = extract_error(StatusCode::BAD_REQUEST, r#"{"error":"Text is required"}"#);
        assert_eq!(err.to_string(), "Text is required");
    }

    #[test]
    fn extract_error_falls_back_to_the_status() {
        let err = extract_error(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(err.to_string().contains("500"));

        let err = extract_error(StatusCode::BAD_GATEWAY, r#"{"error":""}"#);
        assert!(err.to_string().contains("502"));
    }
}
