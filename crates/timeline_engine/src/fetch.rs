use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::browser::{
    authenticate, AntiDetectionProfile, AuthResult, BrowserSession, BrowserSettings, PageError,
    TimelinePage,
};
use crate::cookies::{
    cookie_file_name, critical_cookie_name, find_critical, CookieError, CookieRecord, CookieStore,
};
use crate::dedupe::PostCollector;
use crate::extract::{
    collect_permalinks, extract_caption_page, harvest_page, StrategySet, INSTAGRAM_DISMISS_SCRIPT,
};
use crate::paginate::{grow_until_stable, PaginationPolicy};
use crate::snapshot::SnapshotWriter;
use crate::target::{is_login_url, FetchTarget};
use crate::types::{
    AbortReason, EngineEvent, FailureKind, FetchError, FetchId, FetchProgress, FetchReport,
    FetchRequest, FetchStage, Platform,
};

/// Reloads before giving up on a timeline that never rendered.
const PRESENCE_ATTEMPTS: u32 = 3;

/// Selector that marks an individual Instagram post page as rendered.
const INSTAGRAM_POST_SELECTOR: &str = "article";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory holding the per-platform cookie export files.
    pub cookie_dir: PathBuf,
    /// Where page HTML is saved when a fetch ends without content.
    pub snapshot_dir: PathBuf,
    pub browser: BrowserSettings,
    pub profile: AntiDetectionProfile,
    /// Pause after navigations and reloads so dynamic timelines render.
    pub settle_delay: Duration,
    /// Base pause between presence retries, scaled by the attempt number.
    pub retry_backoff: Duration,
    /// Replaces the per-platform pagination table when set.
    pub pagination_override: Option<PaginationPolicy>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cookie_dir: PathBuf::from("."),
            snapshot_dir: PathBuf::from("debug_snapshots"),
            browser: BrowserSettings::default(),
            profile: AntiDetectionProfile::default(),
            settle_delay: Duration::from_secs(3),
            retry_backoff: Duration::from_secs(5),
            pagination_override: None,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

fn emit_progress(
    sink: &dyn ProgressSink,
    fetch_id: FetchId,
    stage: FetchStage,
    posts: usize,
    rounds: usize,
) {
    sink.emit(EngineEvent::Progress(FetchProgress {
        fetch_id,
        stage,
        posts,
        rounds,
    }));
}

fn page_failure(err: PageError) -> FetchError {
    FetchError::new(FailureKind::Browser, err.to_string())
}

/// Runs complete timeline fetches: cookies in, `FetchReport` out. Soft
/// failures (bad identifier, missing cookies, rejected session, empty
/// timeline) come back as aborted reports; `Err` is reserved for the
/// browser or the filesystem giving out.
pub struct TimelineFetcher {
    config: FetcherConfig,
    cookie_store: CookieStore,
    snapshots: SnapshotWriter,
}

impl TimelineFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        let cookie_store = CookieStore::new(config.cookie_dir.clone());
        let snapshots = SnapshotWriter::new(config.snapshot_dir.clone());
        Self {
            config,
            cookie_store,
            snapshots,
        }
    }

    /// Full fetch against a freshly opened browser session. The session is
    /// closed on every exit path.
    pub async fn fetch(
        &self,
        fetch_id: FetchId,
        request: &FetchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<FetchReport, FetchError> {
        emit_progress(sink, fetch_id, FetchStage::LoadingCookies, 0, 0);

        let target = match FetchTarget::resolve(request.platform, &request.identifier) {
            Ok(target) => target,
            Err(err) => {
                engine_warn!("rejected identifier {:?}: {}", request.identifier, err);
                return Ok(FetchReport::aborted(
                    request.platform,
                    AbortReason::InvalidTarget {
                        detail: err.to_string(),
                    },
                ));
            }
        };

        let cookies = match self.cookie_store.load(request.platform) {
            Ok(cookies) => cookies,
            Err(err @ (CookieError::NotFound { .. } | CookieError::Malformed { .. })) => {
                let detail = format!("{err}; regenerate {}", cookie_file_name(request.platform));
                return Ok(FetchReport::aborted(
                    request.platform,
                    AbortReason::MissingCredentials { detail },
                ));
            }
            Err(CookieError::Io { path, source }) => {
                return Err(FetchError::new(
                    FailureKind::Io,
                    format!("{}: {source}", path.display()),
                ));
            }
        };

        if find_critical(&cookies, request.platform).is_none() {
            let detail = format!(
                "critical cookie missing: {} not in {}",
                critical_cookie_name(request.platform),
                cookie_file_name(request.platform)
            );
            return Ok(FetchReport::aborted(
                request.platform,
                AbortReason::MissingCredentials { detail },
            ));
        }

        let session = BrowserSession::open(&self.config.browser, &self.config.profile).await?;
        let result = self
            .fetch_with_page(fetch_id, session.page(), &target, request, &cookies, sink)
            .await;
        session.close().await;
        result
    }

    /// The fetch flow against any `TimelinePage`. Split out from `fetch` so
    /// the whole sequence can run against a fake page.
    pub async fn fetch_with_page<P>(
        &self,
        fetch_id: FetchId,
        page: &P,
        target: &FetchTarget,
        request: &FetchRequest,
        cookies: &[CookieRecord],
        sink: &dyn ProgressSink,
    ) -> Result<FetchReport, FetchError>
    where
        P: TimelinePage + ?Sized,
    {
        let platform = target.platform;

        emit_progress(sink, fetch_id, FetchStage::Authenticating, 0, 0);
        let auth = authenticate(page, target, cookies, self.config.settle_delay)
            .await
            .map_err(page_failure)?;
        if let AuthResult::Unauthenticated { url } = auth {
            engine_warn!("session rejected, landed on {}", url);
            return Ok(FetchReport::aborted(
                platform,
                AbortReason::AuthenticationFailed { url },
            ));
        }

        emit_progress(sink, fetch_id, FetchStage::Navigating, 0, 0);
        page.navigate(&target.profile_url)
            .await
            .map_err(page_failure)?;
        tokio::time::sleep(self.config.settle_delay).await;

        // A stale critical cookie only shows up here: the root accepted the
        // session but the profile bounces to the login page.
        let url = page.current_url().await.map_err(page_failure)?;
        if is_login_url(&url) {
            engine_warn!("profile navigation bounced to {}", url);
            return Ok(FetchReport::aborted(
                platform,
                AbortReason::AuthenticationFailed { url },
            ));
        }

        if let Some(posts_url) = &target.posts_url {
            page.navigate(posts_url).await.map_err(page_failure)?;
            tokio::time::sleep(self.config.settle_delay).await;
        }

        if platform == Platform::Instagram {
            if let Err(err) = page.run_script(INSTAGRAM_DISMISS_SCRIPT).await {
                engine_debug!("dismiss script skipped: {}", err);
            }
        }

        let set = StrategySet::for_platform(platform);
        emit_progress(sink, fetch_id, FetchStage::WaitingForContent, 0, 0);
        if !self.wait_for_presence(page, set).await? {
            self.snapshot_for_postmortem(page, target).await;
            return Ok(FetchReport::aborted(
                platform,
                AbortReason::ContentNotFound {
                    attempts: PRESENCE_ATTEMPTS,
                },
            ));
        }

        let policy = self
            .config
            .pagination_override
            .clone()
            .unwrap_or_else(|| PaginationPolicy::for_platform(platform));

        emit_progress(sink, fetch_id, FetchStage::Paginating, 0, 0);
        let collector = if platform == Platform::Instagram {
            self.collect_instagram(fetch_id, page, target, request, &policy, sink)
                .await?
        } else {
            self.collect_scrolling(fetch_id, page, platform, request, set, &policy, sink)
                .await?
        };

        if collector.is_empty() {
            self.snapshot_for_postmortem(page, target).await;
            return Ok(FetchReport::aborted(platform, AbortReason::NoPostsFound));
        }

        emit_progress(sink, fetch_id, FetchStage::Done, collector.len(), 0);
        Ok(FetchReport::complete(platform, collector.into_posts()))
    }

    async fn wait_for_presence<P>(
        &self,
        page: &P,
        set: &StrategySet,
    ) -> Result<bool, FetchError>
    where
        P: TimelinePage + ?Sized,
    {
        for attempt in 1..=PRESENCE_ATTEMPTS {
            let found = page
                .wait_for_any(set.presence_selectors, self.config.browser.presence_timeout)
                .await
                .map_err(page_failure)?;
            if found {
                return Ok(true);
            }
            engine_warn!(
                "timeline content not present (attempt {}/{})",
                attempt,
                PRESENCE_ATTEMPTS
            );
            if attempt < PRESENCE_ATTEMPTS {
                tokio::time::sleep(self.config.retry_backoff * attempt).await;
                page.reload().await.map_err(page_failure)?;
                tokio::time::sleep(self.config.settle_delay).await;
            }
        }
        Ok(false)
    }

    /// Scroll-and-harvest flow shared by Twitter, LinkedIn, and Facebook.
    async fn collect_scrolling<P>(
        &self,
        fetch_id: FetchId,
        page: &P,
        platform: Platform,
        request: &FetchRequest,
        set: &StrategySet,
        policy: &PaginationPolicy,
        sink: &dyn ProgressSink,
    ) -> Result<PostCollector, FetchError>
    where
        P: TimelinePage + ?Sized,
    {
        let mut collector = PostCollector::new(request.max_posts);
        let mut round = 0usize;
        let outcome = grow_until_stable(page, policy, request.max_posts, set.expand_script, |html| {
            round += 1;
            let mut fresh = 0usize;
            for post in harvest_page(html, platform) {
                if collector.accept(post) {
                    fresh += 1;
                }
            }
            emit_progress(sink, fetch_id, FetchStage::Harvesting, collector.len(), round);
            fresh
        })
        .await
        .map_err(page_failure)?;
        engine_info!(
            "pagination ended after {} rounds ({:?}) with {} posts",
            outcome.rounds,
            outcome.end,
            collector.len()
        );
        Ok(collector)
    }

    /// Instagram runs in two phases: scroll the profile grid collecting post
    /// permalinks, then visit each permalink for its caption.
    async fn collect_instagram<P>(
        &self,
        fetch_id: FetchId,
        page: &P,
        target: &FetchTarget,
        request: &FetchRequest,
        policy: &PaginationPolicy,
        sink: &dyn ProgressSink,
    ) -> Result<PostCollector, FetchError>
    where
        P: TimelinePage + ?Sized,
    {
        let mut seen = HashSet::new();
        let mut links: Vec<String> = Vec::new();
        let mut round = 0usize;
        let outcome = grow_until_stable(page, policy, request.max_posts, None, |html| {
            round += 1;
            let mut fresh = 0usize;
            // Already-known links sit at the front of the document, so the
            // scan bound must cover them plus the links still wanted.
            for link in collect_permalinks(html, seen.len() + request.max_posts) {
                if links.len() >= request.max_posts {
                    break;
                }
                if seen.insert(link.clone()) {
                    links.push(link);
                    fresh += 1;
                }
            }
            emit_progress(sink, fetch_id, FetchStage::Harvesting, links.len(), round);
            fresh
        })
        .await
        .map_err(page_failure)?;
        engine_info!(
            "grid walk found {} permalinks in {} rounds ({:?})",
            links.len(),
            outcome.rounds,
            outcome.end
        );

        let username = target.username.as_deref().unwrap_or_default();
        let mut collector = PostCollector::new(request.max_posts);
        for link in &links {
            if collector.is_full() {
                break;
            }
            page.navigate(link).await.map_err(page_failure)?;
            tokio::time::sleep(self.config.settle_delay).await;
            let present = page
                .wait_for_any(
                    &[INSTAGRAM_POST_SELECTOR],
                    self.config.browser.presence_timeout,
                )
                .await
                .map_err(page_failure)?;
            if !present {
                engine_warn!("post page never rendered: {}", link);
            }
            let html = page.html().await.map_err(page_failure)?;
            collector.accept(extract_caption_page(&html, username));
            emit_progress(sink, fetch_id, FetchStage::Harvesting, collector.len(), round);
        }
        Ok(collector)
    }

    async fn snapshot_for_postmortem<P>(&self, page: &P, target: &FetchTarget)
    where
        P: TimelinePage + ?Sized,
    {
        match page.html().await {
            Ok(html) => {
                match self
                    .snapshots
                    .write(target.platform, &target.profile_url, &html)
                {
                    Ok(path) => engine_info!("page snapshot saved to {:?}", path),
                    Err(err) => engine_warn!("page snapshot failed: {}", err),
                }
            }
            Err(err) => engine_warn!("page snapshot skipped: {}", err),
        }
    }
}

async fn fetch_with_defaults(
    platform: Platform,
    identifier: &str,
    max_posts: usize,
) -> Result<FetchReport, FetchError> {
    let fetcher = TimelineFetcher::new(FetcherConfig::default());
    let request = FetchRequest::new(platform, identifier, max_posts);
    fetcher.fetch(0, &request, &NoopProgressSink).await
}

/// Fetches recent tweets for a username, with default settings and cookies
/// read from the current directory.
pub async fn fetch_twitter_posts(
    identifier: &str,
    max_posts: usize,
) -> Result<FetchReport, FetchError> {
    fetch_with_defaults(Platform::Twitter, identifier, max_posts).await
}

/// Fetches recent posts from a LinkedIn profile or company page URL.
pub async fn fetch_linkedin_posts(
    identifier: &str,
    max_posts: usize,
) -> Result<FetchReport, FetchError> {
    fetch_with_defaults(Platform::LinkedIn, identifier, max_posts).await
}

/// Fetches recent captions for an Instagram username.
pub async fn fetch_instagram_posts(
    identifier: &str,
    max_posts: usize,
) -> Result<FetchReport, FetchError> {
    fetch_with_defaults(Platform::Instagram, identifier, max_posts).await
}

/// Fetches recent posts from a Facebook page name or URL.
pub async fn fetch_facebook_posts(
    identifier: &str,
    max_posts: usize,
) -> Result<FetchReport, FetchError> {
    fetch_with_defaults(Platform::Facebook, identifier, max_posts).await
}
