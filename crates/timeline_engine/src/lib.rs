//! Timeline engine: authenticated session setup, scroll pagination, and
//! post extraction for social profile pages.
mod browser;
mod cookies;
mod dedupe;
mod engine;
mod extract;
mod fetch;
mod paginate;
mod snapshot;
mod target;
mod types;

pub use browser::{
    authenticate, discover_websocket, AntiDetectionProfile, AuthResult, BrowserSession,
    BrowserSettings, CdpPage, PageError, TimelinePage,
};
pub use cookies::{
    cookie_file_name, critical_cookie_name, find_critical, CookieError, CookieRecord, CookieStore,
    SameSite,
};
pub use dedupe::PostCollector;
pub use engine::EngineHandle;
pub use extract::{
    collect_permalinks, extract_caption_page, harvest_page, StrategySet, TextStrategy,
    TimestampStrategy, NO_CAPTION_PLACEHOLDER, UNKNOWN_TIMESTAMP,
};
pub use fetch::{
    fetch_facebook_posts, fetch_instagram_posts, fetch_linkedin_posts, fetch_twitter_posts,
    ChannelProgressSink, FetcherConfig, NoopProgressSink, ProgressSink, TimelineFetcher,
};
pub use paginate::{grow_until_stable, EndReason, PaginationOutcome, PaginationPolicy};
pub use snapshot::{snapshot_filename, SnapshotError, SnapshotWriter};
pub use target::{is_login_url, root_url, FetchTarget, TargetError};
pub use types::{
    AbortReason, EngineEvent, FailureKind, FetchError, FetchId, FetchProgress, FetchReport,
    FetchRequest, FetchStage, Platform, Post, DEFAULT_MAX_POSTS, MAX_POSTS_CEILING,
};
