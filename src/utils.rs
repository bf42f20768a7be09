/// Replaces every occurrence of `secret` in `text` so toolchain output can be
/// logged and returned to the webhook sender.
pub fn mask_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "***")
}

/// `https://github.com/owner/repo.git` with the account embedded for `git clone`.
pub fn authenticated_clone_url(repo: &str, user: &str, token: &str) -> String {
    format!("https://{}:{}@github.com/{}.git", user, token, repo)
}
