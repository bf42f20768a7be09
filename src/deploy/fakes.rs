//! Recording stand-in for git and docker, for tests only.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::deploy::tags::ImageRef;
use crate::deploy::{ImageBuilder, RegistryPusher, RepositoryFetcher};
use crate::error::DeployError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch { repository: String, sha: String, dest: PathBuf },
    Build { image: String },
    Tag { source: String, target: String },
    Login,
    Push { image: String },
}

#[derive(Debug, Clone)]
pub enum FailAt {
    Fetch(String),
    Build(String),
    Push { tag: String, message: String },
}

#[derive(Debug, Default)]
pub struct RecordingToolchain {
    calls: Mutex<Vec<Call>>,
    fail_at: Option<FailAt>,
    create_checkout: bool,
}

impl RecordingToolchain {
    pub fn failing(fail_at: FailAt) -> Self {
        RecordingToolchain {
            fail_at: Some(fail_at),
            ..Default::default()
        }
    }

    /// Makes `fetch` create the destination directory like a real clone.
    pub fn creating_checkout(mut self) -> Self {
        self.create_checkout = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Push { image } => Some(image),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RepositoryFetcher for RecordingToolchain {
    async fn fetch(&self, repository: &str, sha: &str, dest: &Path) -> Result<(), DeployError> {
        self.record(Call::Fetch {
            repository: repository.to_string(),
            sha: sha.to_string(),
            dest: dest.to_path_buf(),
        });
        if let Some(FailAt::Fetch(message)) = &self.fail_at {
            return Err(DeployError::Clone(message.clone()));
        }
        if self.create_checkout {
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            std::fs::write(dest.join("Dockerfile"), "FROM scratch\n").unwrap();
        }
        Ok(())
    }
}

#[async_trait]
impl ImageBuilder for RecordingToolchain {
    async fn build(&self, _context_dir: &Path, image: &ImageRef) -> Result<(), DeployError> {
        self.record(Call::Build {
            image: image.to_string(),
        });
        if let Some(FailAt::Build(output)) = &self.fail_at {
            return Err(DeployError::Build(output.clone()));
        }
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), DeployError> {
        self.record(Call::Tag {
            source: source.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl RegistryPusher for RecordingToolchain {
    async fn login(&self) -> Result<(), DeployError> {
        self.record(Call::Login);
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> Result<(), DeployError> {
        if let Some(FailAt::Push { tag, message }) = &self.fail_at {
            if &image.tag == tag {
                return Err(DeployError::Push(format!("{image}: {message}")));
            }
        }
        self.record(Call::Push {
            image: image.to_string(),
        });
        Ok(())
    }
}
