use super::{COLLABORATOR_TIMEOUT, error_message};
use crate::config::FacebookSettings;
use async_trait::async_trait;
use pagepilot_agent::{NewPost, PagePublisher, PublishedPost, ToolError};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::info;

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v19.0";

const SERVICE: &str = "facebook";

/// Publishes page posts through the Graph API feed edge.
#[derive(Clone)]
pub struct GraphPagePublisher {
    http: reqwest::Client,
    base_url: String,
    page_id: String,
    access_token: String,
}

impl fmt::Debug for GraphPagePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphPagePublisher")
            .field("base_url", &self.base_url)
            .field("page_id", &self.page_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct FeedResponse {
    id: String,
}

impl GraphPagePublisher {
    pub fn new(settings: &FacebookSettings, base_url: Option<String>) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(COLLABORATOR_TIMEOUT)
            .build()
            .map_err(|error| ToolError::collaborator(SERVICE, error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
            page_id: settings.page_id.clone(),
            access_token: settings.access_token.clone(),
        })
    }
}

#[async_trait]
impl PagePublisher for GraphPagePublisher {
    async fn publish(&self, post: NewPost) -> Result<PublishedPost, ToolError> {
        let page_id = post.page_id.unwrap_or_else(|| self.page_id.clone());
        if !page_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ToolError::Validation(format!("invalid page id '{page_id}'")));
        }
        let mut body = json!({ "message": post.message });
        if let Some(link) = post.link {
            body["link"] = json!(link);
        }

        let response = self
            .http
            .post(format!("{}/{}/feed", self.base_url, page_id))
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|error| ToolError::collaborator(SERVICE, error.without_url().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::collaborator(
                SERVICE,
                error_message(&body, &format!("HTTP {}", status.as_u16())),
            ));
        }
        let feed: FeedResponse = response
            .json()
            .await
            .map_err(|error| ToolError::collaborator(SERVICE, error.without_url().to_string()))?;
        info!(page_id = %page_id, post_id = %feed.id, "published page post");
        Ok(PublishedPost {
            post_id: feed.id,
            page_id,
        })
    }
}
