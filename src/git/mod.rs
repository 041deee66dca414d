//! Git repository access using libgit2.

pub mod history;

use std::path::Path;

use git2::Repository;

/// Facts about a local repository recorded alongside its source graph.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryInfo {
    /// Hash of the commit HEAD points at
    pub head: String,
    /// https URL of the first remote, when it has one
    pub url: Option<String>,
}

pub fn repository_info(path: &Path) -> Result<RepositoryInfo, git2::Error> {
    let repo = Repository::open(path)?;
    let head = repo.head()?.peel_to_commit()?.id().to_string();

    let remotes = repo.remotes()?;
    let url = remotes
        .iter()
        .flatten()
        .next()
        .and_then(|name| repo.find_remote(name).ok())
        .and_then(|remote| remote.url().and_then(normalize_remote_url));

    Ok(RepositoryInfo { head, url })
}

/// Turns a remote URL into a browsable https URL.
///
/// `git@github.com:org/repo.git` and `https://github.com/org/repo.git` both
/// become `https://github.com/org/repo`. Local paths and unparseable URLs
/// yield `None`.
pub fn normalize_remote_url(remote: &str) -> Option<String> {
    let remote = remote.trim();

    let candidate = match remote.strip_prefix("git@") {
        Some(scp) => {
            let (host, path) = scp.split_once(':')?;
            format!("https://{}/{}", host, path)
        }
        None => remote.to_string(),
    };

    let parsed = url::Url::parse(&candidate).ok()?;
    let mut url = match parsed.scheme() {
        "https" | "http" => parsed,
        // ssh/git cannot be switched to a special scheme in place
        "ssh" | "git" => {
            let host = parsed.host_str()?;
            url::Url::parse(&format!("https://{}{}", host, parsed.path())).ok()?
        }
        _ => return None,
    };
    url.set_username("").ok()?;
    url.set_password(None).ok()?;
    url.set_port(None).ok()?;

    let trimmed = url
        .path()
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .to_string();
    url.set_path(&trimmed);

    Some(url.to_string().trim_end_matches('/').to_string())
}
