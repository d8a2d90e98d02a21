//! Issue-tracker collaborator: the [`IssueTracker`] seam and its GitHub
//! REST v3 implementation.

use crate::config::TrackerCredentials;
use crate::error::{AipmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "github";
const USER_AGENT: &str = concat!("aipm/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub html_url: String,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

pub trait IssueTracker {
    fn create_issue(&self, issue: &NewIssue) -> Result<Issue>;

    fn get_issue(&self, number: u64) -> Result<Issue>;

    fn create_comment(&self, number: u64, body: &str) -> Result<()>;

    fn edit_issue(&self, number: u64, edit: &IssueEdit) -> Result<Issue>;

    fn close_issue(&self, number: u64) -> Result<Issue> {
        self.edit_issue(
            number,
            &IssueEdit {
                state: Some(IssueState::Closed),
                ..Default::default()
            },
        )
    }
}

// ---------------------------------------------------------------------------
// GitHubTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GitHubTracker {
    http: reqwest::blocking::Client,
    creds: TrackerCredentials,
}

impl GitHubTracker {
    pub fn new(creds: TrackerCredentials) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AipmError::external(SERVICE, e))?;
        Ok(Self { http, creds })
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.creds.owner, self.creds.repo)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.creds.api_url, self.creds.owner, self.creds.repo, path
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::blocking::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .bearer_auth(&self.creds.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn send<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T> {
        tracing::debug!(what, repo = %self.repository(), "github request");
        let response = request
            .send()
            .map_err(|e| AipmError::external(SERVICE, format!("{what}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for(what, response));
        }
        response
            .json()
            .map_err(|e| AipmError::external(SERVICE, format!("{what}: invalid response: {e}")))
    }

    fn error_for(what: &str, response: reqwest::blocking::Response) -> AipmError {
        let status = response.status().as_u16();
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        let message = match status {
            401 => "unauthorized (check the tracker token)".to_string(),
            403 if rate_limited => "rate limit exceeded".to_string(),
            404 => "not found".to_string(),
            _ => response
                .json::<ApiError>()
                .map(|e| e.message)
                .unwrap_or_else(|_| "request failed".to_string()),
        };
        AipmError::external(SERVICE, format!("{what}: HTTP {status}: {message}"))
    }
}

impl IssueTracker for GitHubTracker {
    fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let created: Issue = self.send(
            "create issue",
            self.request(reqwest::Method::POST, "issues").json(issue),
        )?;
        tracing::info!(number = created.number, title = %created.title, "issue created");
        Ok(created)
    }

    fn get_issue(&self, number: u64) -> Result<Issue> {
        self.send(
            &format!("get issue #{number}"),
            self.request(reqwest::Method::GET, &format!("issues/{number}")),
        )
    }

    fn create_comment(&self, number: u64, body: &str) -> Result<()> {
        let _: serde_json::Value = self.send(
            &format!("comment on #{number}"),
            self.request(reqwest::Method::POST, &format!("issues/{number}/comments"))
                .json(&CommentBody { body }),
        )?;
        tracing::info!(number, "comment posted");
        Ok(())
    }

    fn edit_issue(&self, number: u64, edit: &IssueEdit) -> Result<Issue> {
        self.send(
            &format!("edit issue #{number}"),
            self.request(reqwest::Method::PATCH, &format!("issues/{number}"))
                .json(edit),
        )
    }
}
