//! Pull-style fetcher for GitHub Discussions via the GraphQL API. Each
//! discussion is converted into one pre-threaded batch: `skip_disentangle`
//! is the caller's responsibility (every message carries
//! `SourceType::Github`, which `AgentState::new` already treats as
//! public/pre-threaded).

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use threadloom_core::{RawMessage, SourceType};

use crate::error::{Error, Result};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: usize = 50;

const CATEGORIES_QUERY: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    discussionCategories(first: 25) {
      nodes { id name }
    }
  }
}
"#;

const DISCUSSIONS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $first: Int!, $after: String, $categoryId: ID) {
  repository(owner: $owner, name: $repo) {
    discussions(first: $first, after: $after, categoryId: $categoryId, orderBy: {field: UPDATED_AT, direction: DESC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        id number title body url createdAt updatedAt
        author { login }
        answer { id body author { login } createdAt }
        category { id name }
        comments(first: 50) {
          nodes { id body author { login } createdAt }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Discussion {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<Comment>,
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub id: String,
    pub body: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// GraphQL client for one repository's Discussions.
pub struct GitHubDiscussionsFetcher {
    client: Client,
    token: String,
    base_url: String,
}

impl GitHubDiscussionsFetcher {
    pub fn new(token: impl Into<String>) -> Self {
        GitHubDiscussionsFetcher {
            client: Client::builder().timeout(DEFAULT_TIMEOUT).build().unwrap_or_default(),
            token: token.into(),
            base_url: GITHUB_GRAPHQL_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;

        let envelope: GraphQlEnvelope = resp.json().await?;
        if let Some(errors) = envelope.errors {
            let joined = errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
            return Err(Error::GraphQl(joined));
        }
        envelope.data.ok_or_else(|| Error::MalformedResponse("missing data field".into()))
    }

    /// Resolves a discussion category's display name to its node id,
    /// scanning the repository's first 25 categories.
    pub async fn resolve_category(&self, owner: &str, repo: &str, name: &str) -> Result<Option<String>> {
        let data = self
            .graphql(CATEGORIES_QUERY, json!({ "owner": owner, "repo": repo }))
            .await?;
        let nodes = data
            .pointer("/repository/discussionCategories/nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(nodes.into_iter().find_map(|node| {
            let matches = node.get("name").and_then(Value::as_str) == Some(name);
            matches.then(|| node.get("id").and_then(Value::as_str).map(str::to_string)).flatten()
        }))
    }

    /// Fetches up to `limit` discussions, paginating in pages of 50,
    /// optionally restricted to one category.
    pub async fn fetch_discussions(
        &self,
        owner: &str,
        repo: &str,
        category_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Discussion>> {
        let mut discussions = Vec::new();
        let mut cursor: Option<String> = None;
        let mut remaining = limit;

        while remaining > 0 {
            let page_size = remaining.min(PAGE_SIZE);
            let mut variables = json!({
                "owner": owner,
                "repo": repo,
                "first": page_size as i64,
            });
            if let Some(category_id) = category_id {
                variables["categoryId"] = json!(category_id);
            }
            if let Some(cursor) = &cursor {
                variables["after"] = json!(cursor);
            }

            let data = self.graphql(DISCUSSIONS_QUERY, variables).await?;
            let connection = data
                .pointer("/repository/discussions")
                .ok_or_else(|| Error::MalformedResponse("missing repository.discussions".into()))?;
            let nodes: Vec<Value> = connection
                .get("nodes")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if nodes.is_empty() {
                break;
            }

            let fetched_this_page = nodes.len();
            for node in nodes {
                if node.get("body").and_then(Value::as_str).unwrap_or("").is_empty() {
                    continue;
                }
                if let Ok(discussion) = serde_json::from_value::<RawDiscussion>(node).map(Discussion::from) {
                    discussions.push(discussion);
                }
            }

            remaining = remaining.saturating_sub(fetched_this_page);

            let has_next = connection
                .pointer("/pageInfo/hasNextPage")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if has_next && remaining > 0 {
                cursor = connection
                    .pointer("/pageInfo/endCursor")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            } else {
                break;
            }
        }

        tracing::info!(owner, repo, count = discussions.len(), "github_discussions_fetched");
        Ok(discussions)
    }
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawDiscussion {
    id: String,
    title: String,
    body: String,
    url: String,
    author: Option<RawAuthor>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    comments: RawComments,
    answer: Option<RawAnswer>,
}

#[derive(Debug, Deserialize)]
struct RawComments {
    nodes: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    body: String,
    author: Option<RawAuthor>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    id: String,
    body: String,
    author: Option<RawAuthor>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl From<RawDiscussion> for Discussion {
    fn from(raw: RawDiscussion) -> Self {
        Discussion {
            id: raw.id,
            title: raw.title,
            body: raw.body,
            url: raw.url,
            author: raw.author.map(|a| a.login),
            created_at: raw.created_at,
            comments: raw
                .comments
                .nodes
                .into_iter()
                .filter(|c| !c.body.is_empty())
                .map(|c| Comment {
                    id: c.id,
                    body: c.body,
                    author: c.author.map(|a| a.login),
                    created_at: c.created_at,
                })
                .collect(),
            answer: raw.answer.map(|a| Answer {
                id: a.id,
                body: a.body,
                author: a.author.map(|au| au.login),
                created_at: a.created_at,
            }),
        }
    }
}

/// Ghost author placeholder for a deleted/anonymized GitHub account.
const GHOST_AUTHOR: &str = "ghost";

/// Converts one discussion into a pre-threaded message batch: the
/// original post first, then each comment, then the accepted answer
/// (prefixed, and only appended if it wasn't already a comment).
pub fn discussion_to_messages(discussion: &Discussion) -> Vec<RawMessage> {
    let mut messages = Vec::with_capacity(discussion.comments.len() + 2);

    messages.push(RawMessage {
        message_id: discussion.id.clone(),
        author_handle: threadloom_identity::hash(discussion.author.as_deref().unwrap_or(GHOST_AUTHOR)),
        content: format!("# {}\n\n{}", discussion.title, discussion.body),
        timestamp: discussion.created_at,
        reply_to: None,
        mentions: vec![],
        has_code: RawMessage::detect_has_code(&discussion.body),
        source_type: SourceType::Github,
    });

    for comment in &discussion.comments {
        messages.push(RawMessage {
            message_id: comment.id.clone(),
            author_handle: threadloom_identity::hash(comment.author.as_deref().unwrap_or(GHOST_AUTHOR)),
            content: comment.body.clone(),
            timestamp: comment.created_at,
            reply_to: Some(discussion.id.clone()),
            mentions: vec![],
            has_code: RawMessage::detect_has_code(&comment.body),
            source_type: SourceType::Github,
        });
    }

    if let Some(answer) = &discussion.answer {
        if !discussion.comments.iter().any(|c| c.id == answer.id) {
            let content = format!("[ACCEPTED ANSWER]\n\n{}", answer.body);
            messages.push(RawMessage {
                message_id: answer.id.clone(),
                author_handle: threadloom_identity::hash(answer.author.as_deref().unwrap_or(GHOST_AUTHOR)),
                content: content.clone(),
                timestamp: answer.created_at,
                reply_to: Some(discussion.id.clone()),
                mentions: vec![],
                has_code: RawMessage::detect_has_code(&content),
                source_type: SourceType::Github,
            });
        }
    }

    messages
}
