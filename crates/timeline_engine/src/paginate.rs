use std::time::Duration;

use engine_logging::engine_debug;
use rand::Rng;

use crate::browser::{PageError, TimelinePage};
use crate::types::Platform;

/// Per-platform scroll loop tuning. Delays are jittered uniformly between
/// the bounds so request cadence does not look mechanical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub stall_threshold: u32,
    pub attempt_ceiling: u32,
    pub delay_min: Duration,
    pub delay_max: Duration,
}

impl PaginationPolicy {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Twitter => Self {
                stall_threshold: 3,
                attempt_ceiling: 20,
                delay_min: Duration::from_secs(2),
                delay_max: Duration::from_secs(4),
            },
            Platform::LinkedIn => Self {
                stall_threshold: 3,
                attempt_ceiling: 20,
                delay_min: Duration::from_secs(3),
                delay_max: Duration::from_secs(5),
            },
            Platform::Instagram => Self {
                stall_threshold: 3,
                attempt_ceiling: 15,
                delay_min: Duration::from_secs(2),
                delay_max: Duration::from_secs(4),
            },
            Platform::Facebook => Self {
                stall_threshold: 3,
                attempt_ceiling: 25,
                delay_min: Duration::from_secs(3),
                delay_max: Duration::from_secs(6),
            },
        }
    }

    fn jittered_delay(&self) -> Duration {
        let min = self.delay_min.as_millis() as u64;
        let max = self.delay_max.as_millis() as u64;
        if max <= min {
            return self.delay_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    TargetReached,
    Stalled,
    CeilingReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub rounds: u32,
    pub end: EndReason,
}

/// Scroll-harvest loop. Each round runs the optional `pre_round_script`
/// (truncated-body expansion), snapshots the page HTML, hands it to
/// `harvest` (which returns how many NEW items it accepted), then scrolls
/// and re-measures the content extent. The stall counter resets whenever
/// new items arrive or the extent grows; the loop ends on target, stall
/// threshold, or the absolute round ceiling, whichever comes first.
/// Reaching the target wins over waiting out the stall counter.
pub async fn grow_until_stable<P, F>(
    page: &P,
    policy: &PaginationPolicy,
    target: usize,
    pre_round_script: Option<&str>,
    mut harvest: F,
) -> Result<PaginationOutcome, PageError>
where
    P: TimelinePage + ?Sized,
    F: FnMut(&str) -> usize,
{
    let mut rounds = 0u32;
    let mut stall = 0u32;
    let mut collected = 0usize;
    let mut last_extent = page.content_extent().await?;

    loop {
        if let Some(script) = pre_round_script {
            // Expansion is best effort; a failed click never ends the fetch.
            if let Err(err) = page.run_script(script).await {
                engine_debug!("expand script skipped: {}", err);
            }
        }
        let html = page.html().await?;
        let fresh = harvest(&html);
        collected += fresh;
        rounds += 1;

        if collected >= target {
            return Ok(PaginationOutcome {
                rounds,
                end: EndReason::TargetReached,
            });
        }

        page.scroll_to_bottom().await?;
        tokio::time::sleep(policy.jittered_delay()).await;

        let extent = page.content_extent().await?;
        if fresh > 0 || extent > last_extent {
            stall = 0;
        } else {
            stall += 1;
        }
        last_extent = extent;

        if stall >= policy.stall_threshold {
            return Ok(PaginationOutcome {
                rounds,
                end: EndReason::Stalled,
            });
        }
        if rounds >= policy.attempt_ceiling {
            return Ok(PaginationOutcome {
                rounds,
                end: EndReason::CeilingReached,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tables_match_expected_bounds() {
        let facebook = PaginationPolicy::for_platform(Platform::Facebook);
        assert_eq!(facebook.attempt_ceiling, 25);
        assert_eq!(facebook.delay_max, Duration::from_secs(6));
        let instagram = PaginationPolicy::for_platform(Platform::Instagram);
        assert_eq!(instagram.attempt_ceiling, 15);
        assert_eq!(instagram.stall_threshold, 3);
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let policy = PaginationPolicy::for_platform(Platform::Twitter);
        for _ in 0..50 {
            let delay = policy.jittered_delay();
            assert!(delay >= policy.delay_min);
            assert!(delay <= policy.delay_max);
        }
    }
}
