//! Remote URL parsing
//!
//! Recognizes `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo`
//! and scp-style `git@host:owner/repo(.git)` forms.

use super::{IssueError, IssueResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    GitHub,
    GitLab,
}

/// A hosted repository: which tracker and which project on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub host: Host,
    /// Host name, e.g. `github.com` or a self-hosted GitLab
    pub domain: String,
    /// `owner/repo` for GitHub, `group[/subgroup]/project` for GitLab
    pub full_name: String,
}

impl RemoteRepo {
    /// REST API root for this host.
    pub fn api_base(&self) -> String {
        match self.host {
            Host::GitHub if self.domain == "github.com" => "https://api.github.com".to_string(),
            Host::GitHub => format!("https://{}/api/v3", self.domain),
            Host::GitLab => format!("https://{}/api/v4", self.domain),
        }
    }
}

pub fn parse_remote_url(url: &str) -> IssueResult<RemoteRepo> {
    let url = url.trim();
    let malformed = || IssueError::MalformedUrl(url.to_string());

    let rest = if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://"))
    {
        rest.to_string()
    } else if let Some((user_host, path)) = url.split_once(':') {
        // scp-style: git@host:owner/repo
        if !user_host.contains('@') || path.starts_with("//") {
            return Err(malformed());
        }
        format!("{}/{}", user_host, path)
    } else {
        return Err(malformed());
    };

    let (authority, path) = rest.split_once('/').ok_or_else(malformed)?;
    let domain = authority
        .rsplit('@')
        .next()
        .unwrap_or(authority)
        .split(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let full_name = path
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .trim_matches('/')
        .to_string();
    let segments = full_name.split('/').filter(|s| !s.is_empty()).count();
    if domain.is_empty() || segments < 2 {
        return Err(malformed());
    }

    let host = if domain.contains("github") {
        Host::GitHub
    } else if domain.contains("gitlab") {
        Host::GitLab
    } else {
        return Err(IssueError::UnsupportedHost(domain));
    };

    if host == Host::GitHub && segments != 2 {
        return Err(malformed());
    }

    Ok(RemoteRepo {
        host,
        domain,
        full_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_github() {
        let remote = parse_remote_url("https://github.com/adriagalin/ansible.motd").unwrap();
        assert_eq!(remote.host, Host::GitHub);
        assert_eq!(remote.full_name, "adriagalin/ansible.motd");
        assert_eq!(remote.api_base(), "https://api.github.com");
    }

    #[test]
    fn test_scp_style_with_git_suffix() {
        let remote = parse_remote_url("git@github.com:owner/repo.git").unwrap();
        assert_eq!(remote.full_name, "owner/repo");
        assert_eq!(remote.domain, "github.com");
    }

    #[test]
    fn test_gitlab_subgroups() {
        let remote = parse_remote_url("https://gitlab.com/group/sub/project.git").unwrap();
        assert_eq!(remote.host, Host::GitLab);
        assert_eq!(remote.full_name, "group/sub/project");
        assert_eq!(remote.api_base(), "https://gitlab.com/api/v4");
    }

    #[test]
    fn test_ssh_scheme() {
        let remote = parse_remote_url("ssh://git@gitlab.example.org:2222/team/infra").unwrap();
        assert_eq!(remote.domain, "gitlab.example.org");
        assert_eq!(remote.full_name, "team/infra");
    }

    #[test]
    fn test_unsupported_host() {
        let err = parse_remote_url("https://bitbucket.org/owner/repo").unwrap_err();
        assert!(matches!(err, IssueError::UnsupportedHost(_)));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            parse_remote_url("not a url").unwrap_err(),
            IssueError::MalformedUrl(_)
        ));
        assert!(matches!(
            parse_remote_url("https://github.com/only-owner").unwrap_err(),
            IssueError::MalformedUrl(_)
        ));
    }
}
