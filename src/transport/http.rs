use async_trait::async_trait;
use futures::StreamExt;
use log::{ error, info, warn };
use reqwest::{ Client as HttpClient, StatusCode, header::{ HeaderMap, HeaderValue, ACCEPT } };
use std::sync::RwLock;
use url::Url;

use super::{ ByteStream, ChatTransport };
use crate::error::TransportError;
use crate::models::chat::HistoryEntry;
use crate::models::event::ChatRequest;

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub chat: Url,
    pub history: Url,
    pub document: Url,
}

impl Endpoints {
    pub fn new(
        base_url: &str,
        chat_route: &str,
        history_route: &str,
        document_route: &str
    ) -> Result<Self, TransportError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            chat: base.join(chat_route)?,
            history: base.join(history_route)?,
            document: base.join(document_route)?,
        })
    }
}

/// reqwest-backed transport. Cookies set by the backend (thread id, agent id)
/// are kept in the client's jar and sent back on every request.
pub struct HttpTransport {
    http: RwLock<HttpClient>,
    endpoints: Endpoints,
}

impl HttpTransport {
    pub fn new(endpoints: Endpoints) -> Result<Self, TransportError> {
        Ok(Self {
            http: RwLock::new(Self::build_http()?),
            endpoints,
        })
    }

    fn build_http() -> Result<HttpClient, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream, application/json"));
        HttpClient::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(TransportError::from)
    }

    fn client(&self) -> HttpClient {
        match self.http.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_chat(&self, message: &str) -> Result<ByteStream, TransportError> {
        let req = ChatRequest { message: message.to_string() };
        let resp = self
            .client()
            .post(self.endpoints.chat.clone())
            .json(&req)
            .send().await?;

        let status = resp.status();
        info!("Response status: {}", status);
        if !status.is_success() {
            error!("Response not OK: {}", status);
            return Err(TransportError::HttpStatus { status: status.as_u16() });
        }
        if status == StatusCode::NO_CONTENT || resp.content_length() == Some(0) {
            return Err(TransportError::StreamUnsupported);
        }

        let stream = resp.bytes_stream().map(|chunk| chunk.map_err(TransportError::from));
        Ok(Box::pin(stream))
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        let entries = self
            .client()
            .get(self.endpoints.history.clone())
            .send().await?
            .error_for_status()?
            .json::<Vec<HistoryEntry>>().await?;
        Ok(entries)
    }

    async fn fetch_document(&self, file_name: &str) -> Result<String, TransportError> {
        let resp = self
            .client()
            .get(self.endpoints.document.clone())
            .query(&[("file_name", file_name)])
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Document '{}' not available: {}", file_name, status);
            return Err(TransportError::HttpStatus { status: status.as_u16() });
        }
        Ok(resp.text().await?)
    }

    fn reset_session(&self) {
        match Self::build_http() {
            Ok(fresh) => {
                match self.http.write() {
                    Ok(mut guard) => {
                        *guard = fresh;
                    }
                    Err(poisoned) => {
                        *poisoned.into_inner() = fresh;
                    }
                }
                info!("Cleared session cookies.");
            }
            Err(e) => error!("Failed to rebuild HTTP client: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_routes_onto_base() {
        let endpoints = Endpoints::new(
            "http://localhost:50505/",
            "/chat",
            "/chat/history",
            "/fetch-document"
        ).unwrap();
        assert_eq!(endpoints.chat.as_str(), "http://localhost:50505/chat");
        assert_eq!(endpoints.history.as_str(), "http://localhost:50505/chat/history");
        assert_eq!(endpoints.document.as_str(), "http://localhost:50505/fetch-document");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = Endpoints::new("not a url", "/chat", "/chat/history", "/fetch-document");
        assert!(matches!(err, Err(TransportError::Endpoint(_))));
    }
}
