use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;
use crate::gateways::IssueGateway;
use crate::models::{ItemDetail, ItemReference};

/// Fields requested when fetching an issue
const ISSUE_FIELDS: &str = "summary,description,comment";

/// Connection settings for a Jira Cloud site
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Site URL, e.g. `https://example.atlassian.net`
    pub server: String,
    /// Account email used for basic auth
    pub email: String,
    /// API token paired with the email
    pub token: String,
}

impl JiraConfig {
    /// Create config from JIRA_SERVER, JIRA_EMAIL and JIRA_TOKEN
    pub fn from_env() -> Result<Self> {
        let server = std::env::var("JIRA_SERVER")
            .context("JIRA_SERVER environment variable not set")?;
        let email =
            std::env::var("JIRA_EMAIL").context("JIRA_EMAIL environment variable not set")?;
        let token =
            std::env::var("JIRA_TOKEN").context("JIRA_TOKEN environment variable not set")?;

        Ok(Self::new(server, email, token))
    }

    pub fn new(server: impl Into<String>, email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            email: email.into(),
            token: token.into(),
        }
    }
}

/// Jira REST API v2 client
pub struct JiraClient {
    client: Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn issue_url(&self, reference: &ItemReference) -> String {
        format!("{}/rest/api/2/issue/{}", self.config.server, reference)
    }

    /// Map error statuses, passing successful responses through
    async fn check(reference: &ItemReference, response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(reference.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IssueGateway for JiraClient {
    async fn fetch_detail(&self, reference: &ItemReference) -> Result<ItemDetail, GatewayError> {
        debug!("Fetching {} from {}", reference, self.config.server);

        let response = self
            .client
            .get(self.issue_url(reference))
            .query(&[("fields", ISSUE_FIELDS)])
            .basic_auth(&self.config.email, Some(&self.config.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("Jira API: {e}")))?;

        let issue: IssueResponse = Self::check(reference, response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("Jira issue {reference}: {e}")))?;

        Ok(issue.fields.into())
    }

    async fn append_comment(
        &self,
        reference: &ItemReference,
        text: &str,
    ) -> Result<(), GatewayError> {
        debug!("Adding comment to {}", reference);

        let response = self
            .client
            .post(format!("{}/comment", self.issue_url(reference)))
            .basic_auth(&self.config.email, Some(&self.config.token))
            .json(&NewComment { body: text })
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("Jira API: {e}")))?;

        Self::check(reference, response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    comment: Option<CommentPage>,
}

#[derive(Debug, Deserialize)]
struct CommentPage {
    #[serde(default)]
    comments: Vec<JiraComment>,
}

#[derive(Debug, Deserialize)]
struct JiraComment {
    #[serde(default)]
    body: String,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

impl From<IssueFields> for ItemDetail {
    fn from(fields: IssueFields) -> Self {
        Self {
            summary: fields.summary,
            description: fields.description.unwrap_or_default(),
            comments: fields
                .comment
                .map(|page| page.comments.into_iter().map(|c| c.body).collect())
                .unwrap_or_default(),
        }
    }
}
