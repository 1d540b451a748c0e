use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use timeline_engine::{
    grow_until_stable, CookieRecord, EndReason, PageError, PaginationPolicy, TimelinePage,
};

/// Serves a fixed sequence of page states; the last state repeats forever.
struct ScriptedPage {
    extents: Vec<u64>,
    extent_calls: AtomicUsize,
    html_calls: AtomicUsize,
    scrolls: AtomicUsize,
    scripts: Mutex<Vec<String>>,
}

impl ScriptedPage {
    fn with_extents(extents: Vec<u64>) -> Self {
        Self {
            extents,
            extent_calls: AtomicUsize::new(0),
            html_calls: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
            scripts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TimelinePage for ScriptedPage {
    async fn navigate(&self, _url: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok("https://x.com/nasa".to_string())
    }

    async fn inject_cookie(&self, _cookie: &CookieRecord) -> Result<(), PageError> {
        Ok(())
    }

    async fn wait_for_any(
        &self,
        _selectors: &[&str],
        _timeout: Duration,
    ) -> Result<bool, PageError> {
        Ok(true)
    }

    async fn content_extent(&self) -> Result<u64, PageError> {
        let call = self.extent_calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.extents.len() - 1);
        Ok(self.extents[index])
    }

    async fn scroll_to_bottom(&self) -> Result<(), PageError> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<(), PageError> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(())
    }

    async fn html(&self) -> Result<String, PageError> {
        self.html_calls.fetch_add(1, Ordering::SeqCst);
        Ok("<html></html>".to_string())
    }
}

fn instant_policy(stall_threshold: u32, attempt_ceiling: u32) -> PaginationPolicy {
    PaginationPolicy {
        stall_threshold,
        attempt_ceiling,
        delay_min: Duration::ZERO,
        delay_max: Duration::ZERO,
    }
}

#[tokio::test]
async fn stalls_after_threshold_when_nothing_changes() {
    let page = ScriptedPage::with_extents(vec![1000]);
    let policy = instant_policy(3, 20);

    let outcome = grow_until_stable(&page, &policy, 10, None, |_html| 0)
        .await
        .expect("pagination ok");

    assert_eq!(outcome.end, EndReason::Stalled);
    assert_eq!(outcome.rounds, 3);
    assert_eq!(page.html_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn growing_extent_without_new_posts_hits_the_ceiling() {
    // The page keeps getting taller but never yields a new unique post; the
    // absolute round ceiling must still end the loop.
    let extents: Vec<u64> = (0..40).map(|step| 1000 + step * 100).collect();
    let page = ScriptedPage::with_extents(extents);
    let policy = instant_policy(3, 8);

    let outcome = grow_until_stable(&page, &policy, 10, None, |_html| 0)
        .await
        .expect("pagination ok");

    assert_eq!(outcome.end, EndReason::CeilingReached);
    assert_eq!(outcome.rounds, 8);
}

#[tokio::test]
async fn target_reached_wins_over_waiting_out_the_stall_counter() {
    let page = ScriptedPage::with_extents(vec![1000, 2000, 2000, 2000]);
    let policy = instant_policy(3, 20);

    let mut round = 0;
    let outcome = grow_until_stable(&page, &policy, 5, None, |_html| {
        round += 1;
        // Three posts on the first pass, the remaining two on the second.
        match round {
            1 => 3,
            2 => 2,
            _ => 0,
        }
    })
    .await
    .expect("pagination ok");

    assert_eq!(outcome.end, EndReason::TargetReached);
    assert_eq!(outcome.rounds, 2);
    // Only the first round scrolled; the target check fires before the next
    // scroll-and-wait step.
    assert_eq!(page.scrolls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn new_posts_reset_the_stall_counter() {
    let page = ScriptedPage::with_extents(vec![1000]);
    let policy = instant_policy(3, 20);

    let mut round = 0;
    let outcome = grow_until_stable(&page, &policy, 10, None, |_html| {
        round += 1;
        // A fresh post on round 3 interrupts the stall run.
        if round == 3 {
            1
        } else {
            0
        }
    })
    .await
    .expect("pagination ok");

    // Two stalled rounds, a reset on round 3, then three more stalled
    // rounds to reach the threshold again.
    assert_eq!(outcome.end, EndReason::Stalled);
    assert_eq!(outcome.rounds, 6);
}

#[tokio::test]
async fn expand_script_runs_before_every_harvest() {
    let page = ScriptedPage::with_extents(vec![1000]);
    let policy = instant_policy(3, 20);

    grow_until_stable(&page, &policy, 10, Some("expand();"), |_html| 0)
        .await
        .expect("pagination ok");

    let scripts = page.scripts.lock().unwrap();
    assert_eq!(scripts.len(), 3);
    assert!(scripts.iter().all(|script| script == "expand();"));
}
