// Git helpers: find the clone URL of a checkout and split it into host,
// organisation and repository name.

use once_cell::sync::Lazy;
use regex::Regex;
use stager_common::constants::git;
use stager_sdk::IOUtil;
use std::path::Path;
use url::Url;

/// `[remote "name"]` section header of a git config file.
static REMOTE_SECTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\[\s*remote\s+"([^"]*)"\s*\]\s*$"#).expect("Invalid remote section regex")
});

/// scp-like address, `[user@]host:path`.
static SCP_LIKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^@/\s]+@)?([^:/\s]+):/?(.+)$").expect("Invalid scp-like url regex")
});

/// The parts of a hosted git repository address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepositoryInfo {
    pub host: String,
    pub organisation: String,
    pub name: String,
}

impl GitRepositoryInfo {
    /// `organisation/name`, the project identifier used in release records.
    pub fn project(&self) -> String {
        format!("{}/{}", self.organisation, self.name)
    }
}

/// Returns the url of the `origin` remote in git config text, falling back to
/// the first remote that declares a url.
pub fn extract_git_url(config_text: &str) -> Option<String> {
    let mut current_remote: Option<String> = None;
    let mut first_url: Option<String> = None;

    for line in config_text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            current_remote = REMOTE_SECTION_REGEX
                .captures(trimmed)
                .map(|caps| caps[1].to_string());
            continue;
        }

        let Some(remote) = current_remote.as_deref() else {
            continue;
        };
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        if key.trim() != "url" {
            continue;
        }

        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        if remote == git::ORIGIN {
            return Some(value);
        }
        if first_url.is_none() {
            first_url = Some(value);
        }
    }

    first_url
}

/// Split a clone URL into host, organisation and repository name.
///
/// Accepts `https://host/org/repo(.git)`, `ssh://user@host[:port]/org/repo`
/// and scp-like `user@host:org/repo(.git)`. Nested groups become part of the
/// organisation (`host/group/sub/repo` has organisation `group/sub`).
pub fn parse_git_repository_info(url: &str) -> Option<GitRepositoryInfo> {
    let url = url.trim();
    let (host, path) = match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some() => {
            let host = parsed.host_str()?.to_string();
            (host, parsed.path().to_string())
        }
        _ => {
            let caps = SCP_LIKE_REGEX.captures(url)?;
            (caps[1].to_string(), caps[2].to_string())
        }
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (organisation, name) = path.rsplit_once('/')?;
    let organisation = organisation.trim_matches('/');
    if organisation.is_empty() || name.is_empty() {
        return None;
    }

    Some(GitRepositoryInfo {
        host,
        organisation: organisation.to_string(),
        name: name.to_string(),
    })
}

/// Clone URL of the checkout at `directory`, read from `.git/config`.
pub fn find_git_clone_url(directory: &Path) -> anyhow::Result<Option<String>> {
    let config_file = directory.join(git::DIRECTORY).join(git::CONFIG_FILE);
    Ok(IOUtil::read_optional(&config_file)?.and_then(|text| extract_git_url(&text)))
}
