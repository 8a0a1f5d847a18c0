//! Remote repository reference parsing
//!
//! Turns the strings people paste into a terminal (`git@github.com:acme/widgets.git`,
//! `ssh://git@host:2222/acme/widgets`, `https://github.com/acme/widgets`,
//! `github.com/acme/widgets`) into a [`RepoRef`] with a transport, a host,
//! an organization and a repository name.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::error::SyncError;

/// Transport a remote reference is reached over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    Ssh,
    Https,
    Http,
    Git,
    /// Local paths and bare `host/org/repo` references
    File,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Ssh => "ssh",
            Protocol::Https => "https",
            Protocol::Http => "http",
            Protocol::Git => "git",
            Protocol::File => "file",
        };
        f.write_str(name)
    }
}

/// A parsed remote reference. All of `source`, `organization` and `name`
/// are non-empty for any value returned by [`RepoRef::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub protocol: Protocol,
    /// Host the repository lives on, without user or port
    pub source: String,
    /// Owner namespace; nested groups are joined with `/`
    pub organization: String,
    /// Repository short name without the `.git` suffix
    pub name: String,
}

fn scp_like() -> &'static Regex {
    static SCP: OnceLock<Regex> = OnceLock::new();
    SCP.get_or_init(|| {
        Regex::new(r"^(?:[^@/:\s]+@)?(?P<host>[^@/:\s]+):(?P<path>[^\s]+)$")
            .expect("scp-like remote pattern is valid")
    })
}

impl RepoRef {
    /// Parse a raw remote reference
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let input = raw.trim();
        let invalid = |reason: &str| SyncError::InvalidRepoReference {
            input: raw.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("empty reference"));
        }

        if input.contains("://") {
            return Self::parse_url(input).map_err(|reason| invalid(&reason));
        }

        if let Some(captures) = scp_like().captures(input) {
            return Self::from_parts(Protocol::Ssh, &captures["host"], &captures["path"])
                .map_err(|reason| invalid(&reason));
        }

        // Bare `host/org/repo` or a local path
        let trimmed = input.trim_start_matches('/');
        let (host, path) = trimmed
            .split_once('/')
            .ok_or_else(|| invalid("missing organization segment"))?;
        Self::from_parts(Protocol::File, host, path).map_err(|reason| invalid(&reason))
    }

    fn parse_url(input: &str) -> Result<Self, String> {
        let url = Url::parse(input).map_err(|e| e.to_string())?;

        let protocol = match url.scheme() {
            "ssh" | "git+ssh" | "ssh+git" => Protocol::Ssh,
            "https" => Protocol::Https,
            "http" => Protocol::Http,
            "git" => Protocol::Git,
            "file" => Protocol::File,
            other => return Err(format!("unsupported scheme `{}`", other)),
        };

        match url.host_str() {
            Some(host) if !host.is_empty() => Self::from_parts(protocol, host, url.path()),
            // file:///srv/git/org/repo.git: the first path segment stands in for the host
            _ if protocol == Protocol::File => {
                let path = url.path().trim_start_matches('/');
                let (host, rest) = path
                    .split_once('/')
                    .ok_or_else(|| "missing organization segment".to_string())?;
                Self::from_parts(protocol, host, rest)
            }
            _ => Err("missing host".to_string()),
        }
    }

    fn from_parts(protocol: Protocol, host: &str, path: &str) -> Result<Self, String> {
        let host = host.trim().to_lowercase();
        if host.is_empty() {
            return Err("missing host".to_string());
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.iter().any(|s| *s == "." || *s == "..") {
            return Err("relative path segments are not allowed".to_string());
        }

        let (last, owners) = match segments.split_last() {
            Some((last, owners)) if !owners.is_empty() => (*last, owners),
            _ => return Err("missing organization segment".to_string()),
        };

        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() {
            return Err("missing repository name".to_string());
        }

        Ok(Self {
            protocol,
            source: host,
            organization: owners.join("/"),
            name: name.to_string(),
        })
    }

    /// `/{source}/{organization}/{name}`, used as a display label
    pub fn relative_label(&self) -> String {
        format!("/{}/{}/{}", self.source, self.organization, self.name)
    }

    /// `organization/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parsed(raw: &str) -> RepoRef {
        RepoRef::parse(raw).unwrap_or_else(|e| panic!("{} should parse: {}", raw, e))
    }

    #[test]
    fn test_scp_like_reference() {
        let repo = parsed("git@github.com:acme/widgets.git");
        assert_eq!(repo.protocol, Protocol::Ssh);
        assert_eq!(repo.source, "github.com");
        assert_eq!(repo.organization, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.relative_label(), "/github.com/acme/widgets");
        assert_eq!(repo.full_name(), "acme/widgets");
    }

    #[test]
    fn test_scp_like_without_user_or_suffix() {
        let repo = parsed("gitlab.com:/group/sub/tool");
        assert_eq!(repo.protocol, Protocol::Ssh);
        assert_eq!(repo.source, "gitlab.com");
        assert_eq!(repo.organization, "group/sub");
        assert_eq!(repo.name, "tool");
    }

    #[test]
    fn test_ssh_url_with_port() {
        let repo = parsed("ssh://git@git.example.org:2222/acme/widgets.git");
        assert_eq!(repo.protocol, Protocol::Ssh);
        assert_eq!(repo.source, "git.example.org");
        assert_eq!(repo.full_name(), "acme/widgets");

        assert_eq!(parsed("git+ssh://git@github.com/acme/widgets").protocol, Protocol::Ssh);
    }

    #[test]
    fn test_https_reference() {
        let repo = parsed("https://GitHub.com/acme/widgets/");
        assert_eq!(repo.protocol, Protocol::Https);
        assert_eq!(repo.source, "github.com");
        assert_eq!(repo.name, "widgets");
    }

    #[test]
    fn test_bare_and_file_references() {
        let repo = parsed("github.com/acme/widgets");
        assert_eq!(repo.protocol, Protocol::File);
        assert_eq!(repo.relative_label(), "/github.com/acme/widgets");

        let repo = parsed("file:///srv/git/widgets.git");
        assert_eq!(repo.protocol, Protocol::File);
        assert_eq!(repo.source, "srv");
        assert_eq!(repo.organization, "git");
        assert_eq!(repo.name, "widgets");
    }

    #[test]
    fn test_invalid_references() {
        for raw in [
            "",
            "   ",
            "git@github.com:widgets.git",
            "https://github.com/widgets",
            "https://github.com/acme/.git",
            "ftp://github.com/acme/widgets",
            "git@github.com:acme/../widgets",
            "widgets",
        ] {
            assert_matches!(
                RepoRef::parse(raw),
                Err(SyncError::InvalidRepoReference { .. }),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_error_keeps_offending_input() {
        match RepoRef::parse("git@github.com:widgets") {
            Err(SyncError::InvalidRepoReference { input, reason }) => {
                assert_eq!(input, "git@github.com:widgets");
                assert_eq!(reason, "missing organization segment");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
