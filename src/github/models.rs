use serde::Deserialize;

use crate::error::WebhookError;

const BRANCH_PREFIX: &str = "refs/heads/";

/// The subset of GitHub's push payload this service reads. Every field is
/// optional here so absent fields surface as `MalformedPayload` rather than
/// a serde error.
#[derive(Deserialize, Debug, Default)]
pub struct PushEventPayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub after: Option<String>,
    pub repository: Option<Repository>,
    pub head_commit: Option<HeadCommit>,
}

#[derive(Deserialize, Debug)]
pub struct Repository {
    pub full_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct HeadCommit {
    pub id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub repository: String,
    pub branch: String,
    pub sha: String,
}

impl PushEvent {
    pub fn from_payload(payload: &PushEventPayload) -> Result<Self, WebhookError> {
        let git_ref = payload
            .git_ref
            .as_deref()
            .ok_or_else(|| WebhookError::MalformedPayload("missing ref".into()))?;

        let branch = git_ref
            .strip_prefix(BRANCH_PREFIX)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                WebhookError::MalformedPayload(format!("invalid ref format: {git_ref}"))
            })?;

        let sha = payload
            .head_commit
            .as_ref()
            .and_then(|c| c.id.as_deref())
            .or(payload.after.as_deref())
            .filter(|s| !s.is_empty() && !s.chars().all(|c| c == '0'))
            .ok_or_else(|| WebhookError::MalformedPayload("missing head commit id".into()))?;
        if !is_commit_sha(sha) {
            return Err(WebhookError::MalformedPayload(format!(
                "head commit id is not a commit sha: {sha}"
            )));
        }

        let repository = payload
            .repository
            .as_ref()
            .and_then(|r| r.full_name.as_deref())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                WebhookError::MalformedPayload("missing repository.full_name".into())
            })?;

        Ok(PushEvent {
            repository: repository.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        })
    }
}

/// Lowercase hex, abbreviated (git's 4-character minimum) up to SHA-256 length.
/// Anything else could be read by git as a ref name or an option.
fn is_commit_sha(s: &str) -> bool {
    (4..=64).contains(&s.len()) && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl PushEventPayload {
    /// True when the head commit only touched Helm chart files.
    pub fn is_charts_only(&self) -> bool {
        match &self.head_commit {
            Some(commit) if !commit.modified.is_empty() => {
                commit.modified.iter().all(|f| f.starts_with("charts/"))
            }
            _ => false,
        }
    }
}
