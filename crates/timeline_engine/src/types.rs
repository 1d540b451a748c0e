use std::fmt;

use serde::{Deserialize, Serialize};

pub type FetchId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    LinkedIn,
    Instagram,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::LinkedIn => "linkedin",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One harvested timeline entry. `text` is never empty after trimming and
/// `timestamp` is either an ISO-8601 instant or the literal `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    pub timestamp: String,
    pub platform: Platform,
}

pub const DEFAULT_MAX_POSTS: usize = 20;
pub const MAX_POSTS_CEILING: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub platform: Platform,
    pub identifier: String,
    pub max_posts: usize,
}

impl FetchRequest {
    /// Builds a request, clamping `max_posts` into `1..=100`.
    pub fn new(platform: Platform, identifier: impl Into<String>, max_posts: usize) -> Self {
        Self {
            platform,
            identifier: identifier.into(),
            max_posts: max_posts.clamp(1, MAX_POSTS_CEILING),
        }
    }
}

/// Outcome of one fetch. `reason` is `None` for a nominally complete fetch;
/// soft failures set it and leave `posts` empty. A fetch that paginated but
/// collected fewer than `max_posts` is still complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub platform: Platform,
    pub posts: Vec<Post>,
    pub reason: Option<AbortReason>,
}

impl FetchReport {
    pub fn complete(platform: Platform, posts: Vec<Post>) -> Self {
        Self {
            platform,
            posts,
            reason: None,
        }
    }

    pub fn aborted(platform: Platform, reason: AbortReason) -> Self {
        Self {
            platform,
            posts: Vec::new(),
            reason: Some(reason),
        }
    }
}

/// Expected, non-exceptional ways a fetch ends without posts. Reported
/// inside `FetchReport`, never returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    MissingCredentials { detail: String },
    AuthenticationFailed { url: String },
    ContentNotFound { attempts: u32 },
    NoPostsFound,
    InvalidTarget { detail: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::MissingCredentials { detail } => {
                write!(f, "missing credentials: {detail}")
            }
            AbortReason::AuthenticationFailed { url } => {
                write!(f, "authentication failed, landed on {url}")
            }
            AbortReason::ContentNotFound { attempts } => {
                write!(f, "no timeline content after {attempts} attempts")
            }
            AbortReason::NoPostsFound => write!(f, "no posts found"),
            AbortReason::InvalidTarget { detail } => write!(f, "invalid target: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    BrowserLaunch,
    Browser,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::BrowserLaunch => write!(f, "browser launch failed"),
            FailureKind::Browser => write!(f, "browser session error"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    LoadingCookies,
    Authenticating,
    Navigating,
    WaitingForContent,
    Paginating,
    Harvesting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProgress {
    pub fetch_id: FetchId,
    pub stage: FetchStage,
    pub posts: usize,
    pub rounds: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(FetchProgress),
    FetchCompleted {
        fetch_id: FetchId,
        result: Result<FetchReport, FetchError>,
    },
}
