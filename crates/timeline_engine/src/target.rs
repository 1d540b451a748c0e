use thiserror::Error;
use url::Url;

use crate::types::Platform;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("identifier is empty")]
    Empty,
    #[error("invalid username: {0}")]
    BadUsername(String),
    #[error("invalid profile url: {0}")]
    BadUrl(String),
    #[error("url host {host:?} is not a {expected} host")]
    WrongHost { host: String, expected: &'static str },
}

/// URL substrings that mean the session landed on a login or interstitial
/// page instead of the requested profile.
const LOGIN_MARKERS: &[&str] = &["login", "authwall"];

pub fn is_login_url(url: &str) -> bool {
    LOGIN_MARKERS.iter().any(|marker| url.contains(marker))
}

pub fn root_url(platform: Platform) -> &'static str {
    match platform {
        Platform::Twitter => "https://x.com",
        Platform::LinkedIn => "https://www.linkedin.com",
        Platform::Instagram => "https://www.instagram.com",
        Platform::Facebook => "https://www.facebook.com",
    }
}

/// A validated fetch destination. Construction is the only place identifier
/// syntax is checked; everything downstream can trust the URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub platform: Platform,
    pub profile_url: String,
    /// LinkedIn profiles keep their posts on a separate activity page.
    pub posts_url: Option<String>,
    /// Set when the identifier was a bare username rather than a URL.
    pub username: Option<String>,
}

impl FetchTarget {
    pub fn resolve(platform: Platform, identifier: &str) -> Result<Self, TargetError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(TargetError::Empty);
        }
        match platform {
            Platform::Twitter => resolve_twitter(identifier),
            Platform::LinkedIn => resolve_linkedin(identifier),
            Platform::Instagram => resolve_instagram(identifier),
            Platform::Facebook => resolve_facebook(identifier),
        }
    }

    pub fn root_url(&self) -> &'static str {
        root_url(self.platform)
    }
}

fn resolve_twitter(identifier: &str) -> Result<FetchTarget, TargetError> {
    let user = identifier.strip_prefix('@').unwrap_or(identifier);
    let valid = !user.is_empty()
        && user.len() <= 15
        && user.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(TargetError::BadUsername(user.to_string()));
    }
    Ok(FetchTarget {
        platform: Platform::Twitter,
        profile_url: format!("https://x.com/{user}"),
        posts_url: None,
        username: Some(user.to_string()),
    })
}

fn resolve_instagram(identifier: &str) -> Result<FetchTarget, TargetError> {
    let user = identifier.to_ascii_lowercase();
    let valid = user.len() <= 30
        && user
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_');
    if !valid {
        return Err(TargetError::BadUsername(identifier.to_string()));
    }
    Ok(FetchTarget {
        platform: Platform::Instagram,
        profile_url: format!("https://www.instagram.com/{user}/"),
        posts_url: None,
        username: Some(user),
    })
}

fn resolve_linkedin(identifier: &str) -> Result<FetchTarget, TargetError> {
    let url = parse_http_url(identifier)?;
    expect_host(&url, "linkedin.com")?;
    let profile_url = identifier.trim_end_matches('/').to_string();
    let posts_url = format!("{profile_url}/posts/");
    Ok(FetchTarget {
        platform: Platform::LinkedIn,
        profile_url,
        posts_url: Some(posts_url),
        username: None,
    })
}

fn resolve_facebook(identifier: &str) -> Result<FetchTarget, TargetError> {
    if identifier.starts_with("http://") || identifier.starts_with("https://") {
        let url = parse_http_url(identifier)?;
        expect_host(&url, "facebook.com")?;
        return Ok(FetchTarget {
            platform: Platform::Facebook,
            profile_url: identifier.to_string(),
            posts_url: None,
            username: None,
        });
    }
    let valid = identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.');
    if !valid {
        return Err(TargetError::BadUsername(identifier.to_string()));
    }
    Ok(FetchTarget {
        platform: Platform::Facebook,
        profile_url: format!("https://www.facebook.com/{identifier}"),
        posts_url: None,
        username: Some(identifier.to_string()),
    })
}

fn parse_http_url(raw: &str) -> Result<Url, TargetError> {
    let url = Url::parse(raw).map_err(|err| TargetError::BadUrl(err.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TargetError::BadUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn expect_host(url: &Url, domain: &'static str) -> Result<(), TargetError> {
    let host = url.host_str().unwrap_or_default();
    if host == domain || host.ends_with(&format!(".{domain}")) {
        Ok(())
    } else {
        Err(TargetError::WrongHost {
            host: host.to_string(),
            expected: domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twitter_strips_at_sign_and_builds_url() {
        let target = FetchTarget::resolve(Platform::Twitter, "@nasa").unwrap();
        assert_eq!(target.profile_url, "https://x.com/nasa");
    }

    #[test]
    fn twitter_rejects_overlong_and_bad_chars() {
        assert!(FetchTarget::resolve(Platform::Twitter, "way_too_long_username").is_err());
        assert!(FetchTarget::resolve(Platform::Twitter, "na sa").is_err());
    }

    #[test]
    fn instagram_lowercases_username() {
        let target = FetchTarget::resolve(Platform::Instagram, "Nat.Geo").unwrap();
        assert_eq!(target.profile_url, "https://www.instagram.com/nat.geo/");
    }

    #[test]
    fn linkedin_requires_linkedin_host() {
        let err = FetchTarget::resolve(Platform::LinkedIn, "https://example.com/in/foo");
        assert!(matches!(err, Err(TargetError::WrongHost { .. })));
    }

    #[test]
    fn linkedin_derives_posts_page() {
        let target =
            FetchTarget::resolve(Platform::LinkedIn, "https://www.linkedin.com/company/nasa/")
                .unwrap();
        assert_eq!(
            target.posts_url.as_deref(),
            Some("https://www.linkedin.com/company/nasa/posts/")
        );
    }

    #[test]
    fn facebook_accepts_bare_page_name() {
        let target = FetchTarget::resolve(Platform::Facebook, "nasa.gov").unwrap();
        assert_eq!(target.profile_url, "https://www.facebook.com/nasa.gov");
    }

    #[test]
    fn login_markers_detect_authwall() {
        assert!(is_login_url("https://www.linkedin.com/authwall?trk=x"));
        assert!(is_login_url("https://x.com/login?next=/nasa"));
        assert!(!is_login_url("https://x.com/nasa"));
    }
}
