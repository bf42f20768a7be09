use std::fmt;

/// Tags to publish for a push to `branch`, or `None` when the branch does not
/// deploy. Branch names are matched exactly.
pub fn tags_for_branch(branch: &str, sha: &str) -> Option<Vec<String>> {
    match branch {
        "main" => Some(vec!["latest".to_string(), "dev".to_string(), sha.to_string()]),
        "production" => Some(vec!["prod".to_string(), sha.to_string()]),
        _ => None,
    }
}

/// `<registry>/<namespace>:<tag>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: String,
    pub namespace: String,
    pub tag: String,
}

impl ImageRef {
    /// Registries reject upper-case repository names, GitHub does not.
    pub fn new(registry: &str, repository: &str, tag: &str) -> Self {
        ImageRef {
            registry: registry.trim_end_matches('/').to_string(),
            namespace: repository.to_lowercase(),
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.namespace, self.tag)
    }
}
