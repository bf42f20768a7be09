use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::Credentials;
use crate::deploy::command::{run_captured, Captured};
use crate::deploy::tags::ImageRef;
use crate::deploy::{ImageBuilder, RegistryPusher};
use crate::error::DeployError;
use crate::utils::mask_secret;

/// Drives the `docker` CLI (or anything argument-compatible, e.g. podman).
pub struct DockerCli {
    docker_bin: String,
    registry: String,
    credentials: Credentials,
}

impl DockerCli {
    pub fn new(
        docker_bin: impl Into<String>,
        registry: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        DockerCli {
            docker_bin: docker_bin.into(),
            registry: registry.into(),
            credentials,
        }
    }

    async fn docker(&self, args: &[&str], stdin: Option<&str>) -> Result<Captured, String> {
        let result = run_captured(&self.docker_bin, args, None, stdin)
            .await
            .map_err(|e| format!("could not run {}: {e}", self.docker_bin))?;
        if result.success {
            Ok(result)
        } else {
            Err(mask_secret(&result.describe(), &self.credentials.token))
        }
    }
}

#[async_trait]
impl ImageBuilder for DockerCli {
    async fn build(&self, context_dir: &Path, image: &ImageRef) -> Result<(), DeployError> {
        let tag = image.to_string();
        let context = context_dir.to_string_lossy();
        info!("🐳 Building {} from {}", tag, context);
        self.docker(&["build", "-t", &tag, &context], None)
            .await
            .map_err(DeployError::Build)?;
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), DeployError> {
        let (source, target) = (source.to_string(), target.to_string());
        self.docker(&["tag", &source, &target], None)
            .await
            .map_err(DeployError::Tag)?;
        Ok(())
    }
}

#[async_trait]
impl RegistryPusher for DockerCli {
    async fn login(&self) -> Result<(), DeployError> {
        info!("Logging in to {} as {}", self.registry, self.credentials.user);
        self.docker(
            &[
                "login",
                &self.registry,
                "-u",
                &self.credentials.user,
                "--password-stdin",
            ],
            Some(&self.credentials.token),
        )
        .await
        .map_err(|e| DeployError::Push(format!("login to {} rejected: {e}", self.registry)))?;
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> Result<(), DeployError> {
        let tag = image.to_string();
        info!("📦 Pushing {}", tag);
        self.docker(&["push", &tag], None)
            .await
            .map_err(|e| DeployError::Push(format!("{tag}: {e}")))?;
        Ok(())
    }
}
