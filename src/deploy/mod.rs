//! Clone, build, tag and push for a single push event.
//!
//! The pipeline only talks to the outside world through the three
//! capability traits below. `git` and `docker` provide the real
//! implementations; tests use the recording fake in `fakes`.

pub mod command;
pub mod docker;
pub mod git;
pub mod pipeline;
pub mod tags;

#[cfg(test)]
pub mod fakes;

use std::path::Path;

use async_trait::async_trait;

use crate::deploy::tags::ImageRef;
use crate::error::DeployError;

#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Materialises `repository` at `sha` inside `dest`.
    async fn fetch(&self, repository: &str, sha: &str, dest: &Path) -> Result<(), DeployError>;
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, context_dir: &Path, image: &ImageRef) -> Result<(), DeployError>;

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), DeployError>;
}

#[async_trait]
pub trait RegistryPusher: Send + Sync {
    /// Authenticates against the registry. Called once before the first push.
    async fn login(&self) -> Result<(), DeployError>;

    async fn push(&self, image: &ImageRef) -> Result<(), DeployError>;
}

/// Outcome of one `deploy` call.
///
/// A skipped push is `success == true` with no tags. On failure
/// `image_tags` holds the tags that reached the registry before the
/// failing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    pub image_tags: Vec<String>,
    pub error_message: Option<String>,
}

impl BuildResult {
    pub fn skipped() -> Self {
        BuildResult {
            success: true,
            image_tags: Vec::new(),
            error_message: None,
        }
    }

    pub fn done(image_tags: Vec<String>) -> Self {
        BuildResult {
            success: true,
            image_tags,
            error_message: None,
        }
    }

    pub fn failed(error: DeployError, pushed: Vec<String>) -> Self {
        BuildResult {
            success: false,
            image_tags: pushed,
            error_message: Some(error.to_string()),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.success && self.image_tags.is_empty()
    }
}

/// Where a single `deploy` invocation currently is. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Classified,
    Skipped,
    Cloning,
    Building,
    Tagging,
    Pushing,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Classified => "classified",
            Stage::Skipped => "skipped",
            Stage::Cloning => "cloning",
            Stage::Building => "building",
            Stage::Tagging => "tagging",
            Stage::Pushing => "pushing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Skipped | Stage::Done | Stage::Failed)
    }
}
