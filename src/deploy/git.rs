use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::Credentials;
use crate::deploy::command::run_captured;
use crate::deploy::RepositoryFetcher;
use crate::error::DeployError;
use crate::utils::{authenticated_clone_url, mask_secret};

/// Clones over HTTPS with the configured account embedded in the URL.
pub struct GitFetcher {
    git_bin: String,
    credentials: Credentials,
}

impl GitFetcher {
    pub fn new(git_bin: impl Into<String>, credentials: Credentials) -> Self {
        GitFetcher {
            git_bin: git_bin.into(),
            credentials,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<(), DeployError> {
        let token = &self.credentials.token;
        let result = run_captured(&self.git_bin, args, None, None)
            .await
            .map_err(|e| DeployError::Clone(format!("could not run {}: {e}", self.git_bin)))?;

        if !result.success {
            return Err(DeployError::Clone(mask_secret(&result.describe(), token)));
        }
        Ok(())
    }
}

#[async_trait]
impl RepositoryFetcher for GitFetcher {
    async fn fetch(&self, repository: &str, sha: &str, dest: &Path) -> Result<(), DeployError> {
        let url = authenticated_clone_url(
            repository,
            &self.credentials.user,
            &self.credentials.token,
        );
        let dest_str = dest.to_string_lossy();

        info!("📥 Cloning {} into {}", repository, dest_str);
        self.git(&["clone", "--quiet", &url, &dest_str]).await?;

        info!("🔐 Checking out {}", sha);
        self.git(&["-C", &dest_str, "checkout", "--quiet", "--detach", sha])
            .await
    }
}
