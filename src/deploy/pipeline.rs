use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::deploy::tags::{tags_for_branch, ImageRef};
use crate::deploy::{BuildResult, ImageBuilder, RegistryPusher, RepositoryFetcher, Stage};
use crate::error::DeployError;

pub struct Pipeline {
    fetcher: Arc<dyn RepositoryFetcher>,
    builder: Arc<dyn ImageBuilder>,
    pusher: Arc<dyn RegistryPusher>,
    registry: String,
    work_dir: PathBuf,
    // one build per process at a time
    build_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn RepositoryFetcher>,
        builder: Arc<dyn ImageBuilder>,
        pusher: Arc<dyn RegistryPusher>,
    ) -> Self {
        Pipeline {
            fetcher,
            builder,
            pusher,
            registry: config.registry.clone(),
            work_dir: config.work_dir.clone(),
            build_lock: Mutex::new(()),
        }
    }

    /// Runs clone → build → tag → push for a push to `branch` at `sha`.
    ///
    /// Branches without a tag set return a skipped result without touching
    /// the toolchain. Any stage failure aborts the remaining stages.
    #[tracing::instrument(skip(self))]
    pub async fn deploy(&self, branch: &str, sha: &str, repository: &str) -> BuildResult {
        let mut stage = Stage::Received;
        let Some(tags) = tags_for_branch(branch, sha) else {
            advance(&mut stage, Stage::Skipped);
            info!("⏭️ Skipping build for branch {}", branch);
            return BuildResult::skipped();
        };
        advance(&mut stage, Stage::Classified);

        let _guard = self.build_lock.lock().await;

        let checkout = self.checkout_dir(repository);
        let mut pushed = Vec::new();
        let outcome = self
            .run_stages(&mut stage, repository, sha, &tags, &checkout, &mut pushed)
            .await;
        remove_checkout(&checkout).await;

        match outcome {
            Ok(()) => {
                advance(&mut stage, Stage::Done);
                info!("✅ Pushed {} tag(s) for {}", tags.len(), repository);
                BuildResult::done(tags)
            }
            Err(e) => {
                error!(failed_during = stage.as_str(), "❌ Deploy failed: {}", e);
                advance(&mut stage, Stage::Failed);
                BuildResult::failed(e, pushed)
            }
        }
    }

    async fn run_stages(
        &self,
        stage: &mut Stage,
        repository: &str,
        sha: &str,
        tags: &[String],
        checkout: &Path,
        pushed: &mut Vec<String>,
    ) -> Result<(), DeployError> {
        advance(stage, Stage::Cloning);
        if let Some(parent) = checkout.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DeployError::Clone(format!("could not create {}: {e}", parent.display()))
            })?;
        }
        self.fetcher.fetch(repository, sha, checkout).await?;

        let images: Vec<ImageRef> = tags
            .iter()
            .map(|tag| ImageRef::new(&self.registry, repository, tag))
            .collect();
        let (primary, aliases) = images
            .split_first()
            .ok_or_else(|| DeployError::Build("no tags to build".to_string()))?;

        advance(stage, Stage::Building);
        self.builder.build(checkout, primary).await?;

        advance(stage, Stage::Tagging);
        for alias in aliases {
            self.builder.tag(primary, alias).await?;
        }

        advance(stage, Stage::Pushing);
        self.pusher.login().await?;
        for image in &images {
            self.pusher.push(image).await?;
            pushed.push(image.tag.clone());
        }
        Ok(())
    }

    fn checkout_dir(&self, repository: &str) -> PathBuf {
        let name = repository.rsplit('/').next().unwrap_or(repository);
        self.work_dir.join(format!("{}-{}", name, Uuid::new_v4()))
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug_assert!(!stage.is_terminal(), "left terminal stage {:?}", stage);
    info!(from = stage.as_str(), to = next.as_str(), "stage");
    *stage = next;
}

async fn remove_checkout(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove checkout {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::deploy::fakes::{Call, FailAt, RecordingToolchain};

    fn config(work_dir: &Path) -> Config {
        Config {
            credentials: Credentials {
                user: "bot".into(),
                token: "t".into(),
            },
            registry: "ghcr.io".into(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            work_dir: work_dir.to_path_buf(),
            git_bin: "git".into(),
            docker_bin: "docker".into(),
        }
    }

    fn pipeline(toolchain: &Arc<RecordingToolchain>, work_dir: &Path) -> Pipeline {
        Pipeline::new(
            &config(work_dir),
            toolchain.clone(),
            toolchain.clone(),
            toolchain.clone(),
        )
    }

    #[tokio::test]
    async fn main_builds_once_and_pushes_three_tags() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::default());

        let result = pipeline(&toolchain, dir.path())
            .deploy("main", "abc123", "octo/app")
            .await;

        assert!(result.success);
        assert_eq!(result.image_tags, vec!["latest", "dev", "abc123"]);
        assert_eq!(result.error_message, None);

        let calls = toolchain.calls();
        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::Build { .. })).count(),
            1
        );
        assert_eq!(
            toolchain.pushed(),
            vec![
                "ghcr.io/octo/app:latest",
                "ghcr.io/octo/app:dev",
                "ghcr.io/octo/app:abc123",
            ]
        );
        assert!(matches!(&calls[0], Call::Fetch { sha, .. } if sha == "abc123"));
    }

    #[tokio::test]
    async fn production_pushes_prod_and_sha() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::default());

        let result = pipeline(&toolchain, dir.path())
            .deploy("production", "f00d", "octo/app")
            .await;

        assert!(result.success);
        assert_eq!(result.image_tags, vec!["prod", "f00d"]);
        assert_eq!(
            toolchain.pushed(),
            vec!["ghcr.io/octo/app:prod", "ghcr.io/octo/app:f00d"]
        );
    }

    #[tokio::test]
    async fn other_branches_touch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::default());

        let result = pipeline(&toolchain, dir.path())
            .deploy("feature-x", "def456", "octo/app")
            .await;

        assert_eq!(result, BuildResult::skipped());
        assert!(toolchain.calls().is_empty());
    }

    #[tokio::test]
    async fn build_failure_stops_before_push() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::failing(FailAt::Build(
            "Step 3/7 : RUN make\nmake: *** [all] Error 2".into(),
        )));

        let result = pipeline(&toolchain, dir.path())
            .deploy("main", "abc123", "octo/app")
            .await;

        assert!(!result.success);
        assert!(result.image_tags.is_empty());
        let message = result.error_message.unwrap();
        assert!(message.contains("make: *** [all] Error 2"));
        assert!(toolchain.pushed().is_empty());
        assert!(!toolchain
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Login | Call::Tag { .. })));
    }

    #[tokio::test]
    async fn clone_authentication_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::failing(FailAt::Fetch(
            "remote: Invalid username or token. fatal: Authentication failed".into(),
        )));

        let result = pipeline(&toolchain, dir.path())
            .deploy("main", "abc123", "octo/app")
            .await;

        assert!(!result.success);
        let message = result.error_message.unwrap();
        assert!(message.starts_with("clone failed"));
        assert!(message.contains("Authentication failed"));
        assert_eq!(toolchain.calls().len(), 1);
    }

    #[tokio::test]
    async fn partial_push_reports_tags_already_pushed() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::failing(FailAt::Push {
            tag: "dev".into(),
            message: "denied: permission_denied".into(),
        }));

        let result = pipeline(&toolchain, dir.path())
            .deploy("main", "abc123", "octo/app")
            .await;

        assert!(!result.success);
        assert_eq!(result.image_tags, vec!["latest"]);
        assert!(result.error_message.unwrap().contains("permission_denied"));
        // the sha tag is never attempted after the dev push fails
        assert_eq!(toolchain.pushed(), vec!["ghcr.io/octo/app:latest"]);
    }

    #[tokio::test]
    async fn repeated_deploys_produce_the_same_tags() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::default());
        let pipeline = pipeline(&toolchain, dir.path());

        let first = pipeline.deploy("main", "abc123", "octo/app").await;
        let second = pipeline.deploy("main", "abc123", "octo/app").await;

        assert_eq!(first, second);
        assert_eq!(first.image_tags, vec!["latest", "dev", "abc123"]);
    }

    #[tokio::test]
    async fn checkout_is_removed_afterwards() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Arc::new(RecordingToolchain::default().creating_checkout());

        let result = pipeline(&toolchain, dir.path())
            .deploy("main", "abc123", "octo/app")
            .await;

        assert!(result.success);
        let Some(Call::Fetch { dest, .. }) = toolchain.calls().into_iter().next() else {
            panic!("expected a fetch first");
        };
        assert!(dest.starts_with(dir.path()));
        assert!(!dest.exists());
    }
}
