use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::EventStore;
use crate::error::{AppResult, Error};
use crate::models::{Event, EventDraft, EventInput};

/// Event store backed by the schedule HTTP API
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl RemoteStore {
    /// Create a store for an API base URL such as `http://127.0.0.1:5000/api`
    pub fn new(api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn schedules_url(&self) -> String {
        format!("{}/schedules", self.api_url)
    }

    fn schedule_url(&self, id: i64) -> String {
        format!("{}/schedules/{}", self.api_url, id)
    }

    /// Ask the server to send a test notification
    pub async fn test_reminder(&self) -> AppResult<String> {
        let base = self.api_url.trim_end_matches("/api");
        let response = self
            .client
            .get(format!("{}/test_reminder", base))
            .send()
            .await?;
        let status = response.status();
        let body: ErrorBody = response.json().await?;
        let message = body.message.unwrap_or_default();
        if status.is_success() {
            Ok(message)
        } else {
            Err(Error::Remote(message))
        }
    }
}

/// Turn a non-success response into the matching crate error
async fn error_from_response(response: Response, id: Option<i64>) -> Error {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body
            .error
            .or(body.message)
            .unwrap_or_else(|| status.to_string()),
        Err(_) => status.to_string(),
    };

    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => Error::NotFound(id),
        (StatusCode::BAD_REQUEST, _) => Error::Validation(message),
        _ => Error::Remote(format!("{}: {}", status, message)),
    }
}

#[async_trait]
impl EventStore for RemoteStore {
    async fn create(&self, draft: &EventDraft) -> AppResult<Event> {
        let body = EventInput::from(&Event::from_draft(0, draft));
        let response = self
            .client
            .post(self.schedules_url())
            .json(&body)
            .send()
            .await?;
        if response.status() != StatusCode::CREATED {
            return Err(error_from_response(response, None).await);
        }
        Ok(response.json().await?)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Event>> {
        let response = self.client.get(self.schedule_url(id)).send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(error_from_response(response, Some(id)).await),
        }
    }

    async fn update(&self, id: i64, draft: &EventDraft) -> AppResult<Event> {
        let body = EventInput::from(&Event::from_draft(id, draft));
        let response = self
            .client
            .put(self.schedule_url(id))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, Some(id)).await);
        }
        Ok(response.json().await?)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let response = self.client.delete(self.schedule_url(id)).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, Some(id)).await);
        }
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Event>> {
        let response = self.client.get(self.schedules_url()).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }
        let events: Vec<Event> = response.json().await?;
        debug!("Fetched {} schedules from {}", events.len(), self.api_url);
        Ok(events)
    }
}
