use std::sync::Arc;

use crate::config::Config;
use crate::deploy::docker::DockerCli;
use crate::deploy::git::GitFetcher;
use crate::deploy::pipeline::Pipeline;

pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn build_app_state(config: &Config) -> AppState {
    let fetcher = Arc::new(GitFetcher::new(&config.git_bin, config.credentials.clone()));
    let docker = Arc::new(DockerCli::new(
        &config.docker_bin,
        &config.registry,
        config.credentials.clone(),
    ));

    AppState {
        pipeline: Pipeline::new(config, fetcher, docker.clone(), docker),
    }
}
