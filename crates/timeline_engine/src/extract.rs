use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::{Platform, Post};

/// Emitted for media-only posts so downstream consumers always see text.
pub const NO_CAPTION_PLACEHOLDER: &str = "[Image/Video post - No caption available]";
/// Emitted when no timestamp strategy produced a value.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// Anchors that identify individual Instagram posts on a profile grid.
pub const INSTAGRAM_PERMALINK_SELECTOR: &str = r#"a[href*="/p/"], a[href*="/reel/"]"#;

/// Clicks Instagram's "Not Now" dialog buttons away before the grid walk.
pub const INSTAGRAM_DISMISS_SCRIPT: &str = r#"
document.querySelectorAll('button').forEach(function (el) {
    if (el.innerText && el.innerText.trim().toLowerCase() === 'not now') { el.click(); }
});
"#;

const LINKEDIN_EXPAND_SCRIPT: &str = r#"
document.querySelectorAll('button.feed-shared-inline-show-more-text__see-more-less-toggle, button[aria-label*="see more"]')
    .forEach(function (el) { el.click(); });
"#;

const FACEBOOK_EXPAND_SCRIPT: &str = r#"
document.querySelectorAll('div[role="button"], div.see_more_link, [aria-label*="See more"], [aria-label*="See More"]')
    .forEach(function (el) {
        if (el.innerText && el.innerText.toLowerCase().includes('see more')) { el.click(); }
    });
"#;

/// One way of pulling post text out of a container. Strategies are tried in
/// order; the first one that produces text past the platform's length gate
/// wins. A miss is a plain `None`, never an error.
#[derive(Debug, Clone, Copy)]
pub enum TextStrategy {
    /// The container's own rendered text.
    OwnText,
    /// First selector match whose trimmed text is longer than `min_len`.
    Selector {
        css: &'static str,
        min_len: usize,
    },
    /// Distinct texts of every selector match, joined with spaces. LinkedIn
    /// splits one post body across several spans.
    SelectorJoin(&'static str),
    /// First heading that is not just the profile name.
    Heading,
    /// Meaningful lines of the container text with UI noise dropped, first
    /// `take` lines joined.
    FilteredLines {
        min_line_len: usize,
        take: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum TimestampStrategy {
    /// Attribute of the first selector match, e.g. `time[datetime]`.
    Attr {
        css: &'static str,
        attr: &'static str,
    },
    /// Display text of the first selector match.
    Text(&'static str),
}

/// Everything the engine knows about one platform's markup: where posts
/// live, how to read their text and timestamps, and which script expands
/// truncated bodies.
pub struct StrategySet {
    pub presence_selectors: &'static [&'static str],
    pub container_selectors: &'static [&'static str],
    pub text_strategies: &'static [TextStrategy],
    pub timestamp_strategies: &'static [TimestampStrategy],
    pub min_text_len: usize,
    pub noise_words: &'static [&'static str],
    pub expand_script: Option<&'static str>,
}

impl StrategySet {
    pub fn for_platform(platform: Platform) -> &'static StrategySet {
        match platform {
            Platform::Twitter => &TWITTER,
            Platform::LinkedIn => &LINKEDIN,
            Platform::Instagram => &INSTAGRAM,
            Platform::Facebook => &FACEBOOK,
        }
    }
}

static TWITTER: StrategySet = StrategySet {
    presence_selectors: &[r#"article[data-testid="tweet"]"#],
    container_selectors: &[r#"article[data-testid="tweet"]"#],
    text_strategies: &[TextStrategy::Selector {
        css: r#"div[data-testid="tweetText"]"#,
        min_len: 0,
    }],
    timestamp_strategies: &[TimestampStrategy::Attr {
        css: "time",
        attr: "datetime",
    }],
    min_text_len: 0,
    noise_words: &[],
    expand_script: None,
};

static LINKEDIN: StrategySet = StrategySet {
    presence_selectors: &[
        "div.feed-shared-update-v2",
        r#"div[data-urn*="activity"]"#,
        "div.feed-shared-update-v2__description-wrapper",
        r#"div[class*="feed-shared-update"]"#,
    ],
    container_selectors: &["div.feed-shared-update-v2", r#"div[data-urn*="activity"]"#],
    text_strategies: &[
        TextStrategy::SelectorJoin(r#"div.feed-shared-update-v2__description span[dir="ltr"]"#),
        TextStrategy::SelectorJoin(r#"div.feed-shared-text span[dir="ltr"]"#),
        TextStrategy::SelectorJoin("div.update-components-text span"),
        TextStrategy::SelectorJoin("span.break-words"),
    ],
    timestamp_strategies: &[
        TimestampStrategy::Attr {
            css: "time",
            attr: "datetime",
        },
        TimestampStrategy::Text("time"),
        TimestampStrategy::Text("span.feed-shared-actor__sub-description"),
    ],
    min_text_len: 20,
    noise_words: &[],
    expand_script: Some(LINKEDIN_EXPAND_SCRIPT),
};

static INSTAGRAM: StrategySet = StrategySet {
    presence_selectors: &[INSTAGRAM_PERMALINK_SELECTOR],
    container_selectors: &["article"],
    text_strategies: &[
        TextStrategy::Heading,
        TextStrategy::Selector {
            css: "span._ap3a._aaco._aacu._aacx._aad7._aade",
            min_len: 10,
        },
        TextStrategy::Selector {
            css: "span.x1lliihq",
            min_len: 10,
        },
        TextStrategy::Selector {
            css: r#"span[style*="line-height"]"#,
            min_len: 10,
        },
        TextStrategy::Selector {
            css: "div.x1lliihq span",
            min_len: 10,
        },
        TextStrategy::FilteredLines {
            min_line_len: 15,
            take: 2,
        },
    ],
    timestamp_strategies: &[
        TimestampStrategy::Attr {
            css: "time[datetime]",
            attr: "datetime",
        },
        TimestampStrategy::Attr {
            css: "time",
            attr: "title",
        },
        TimestampStrategy::Text("time"),
    ],
    min_text_len: 0,
    noise_words: &[
        "like",
        "likes",
        "comment",
        "comments",
        "share",
        "save",
        "follow",
        "following",
        "followers",
    ],
    expand_script: None,
};

static FACEBOOK: StrategySet = StrategySet {
    presence_selectors: &[
        r#"div[data-ad-preview="message"]"#,
        "div.userContent",
        r#"div[data-ad-comet-preview="message"]"#,
        r#"div[dir="auto"][style*="text-align"]"#,
    ],
    container_selectors: &[
        r#"div[data-ad-preview="message"]"#,
        "div.userContent",
        r#"div[data-ad-comet-preview="message"]"#,
        r#"div[dir="auto"][style*="text-align"]"#,
    ],
    text_strategies: &[TextStrategy::OwnText],
    timestamp_strategies: &[
        TimestampStrategy::Attr {
            css: "abbr",
            attr: "data-utime",
        },
        TimestampStrategy::Attr {
            css: "abbr",
            attr: "title",
        },
        TimestampStrategy::Text("abbr"),
        TimestampStrategy::Text(r#"span[id*="date"]"#),
        TimestampStrategy::Text(r#"a[href*="posts"]"#),
    ],
    min_text_len: 20,
    noise_words: &[],
    expand_script: Some(FACEBOOK_EXPAND_SCRIPT),
};

/// Walks the first container selector that matches anything and turns each
/// container into a `Post`, in document order. Containers whose every text
/// strategy misses become placeholder posts rather than being dropped.
pub fn harvest_page(html: &str, platform: Platform) -> Vec<Post> {
    let set = StrategySet::for_platform(platform);
    let document = Html::parse_document(html);
    let containers = first_matching_containers(&document, set.container_selectors);
    containers
        .into_iter()
        .map(|container| extract_post(container, set, platform, None))
        .collect()
}

/// Extracts the caption and timestamp from a single Instagram post page.
/// `username` filters out headings and spans that only repeat the profile
/// name.
pub fn extract_caption_page(html: &str, username: &str) -> Post {
    let document = Html::parse_document(html);
    extract_post(
        document.root_element(),
        &INSTAGRAM,
        Platform::Instagram,
        Some(username),
    )
}

/// Collects Instagram post permalinks from a profile grid, resolved to
/// absolute URLs, deduplicated, in document order, capped at `max`.
pub fn collect_permalinks(html: &str, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    let Some(selector) = sel(INSTAGRAM_PERMALINK_SELECTOR) else {
        return links;
    };
    let base = Url::parse("https://www.instagram.com").ok();
    for anchor in document.select(&selector) {
        if links.len() >= max {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains("/p/") && !href.contains("/reel/") {
            continue;
        }
        let absolute = match Url::parse(href) {
            Ok(url) => url.to_string(),
            Err(_) => match base.as_ref().and_then(|b| b.join(href).ok()) {
                Some(url) => url.to_string(),
                None => continue,
            },
        };
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    links
}

fn extract_post(
    container: ElementRef,
    set: &StrategySet,
    platform: Platform,
    exclude: Option<&str>,
) -> Post {
    let text = run_text_strategies(container, set, exclude)
        .unwrap_or_else(|| NO_CAPTION_PLACEHOLDER.to_string());
    let timestamp = run_timestamp_strategies(container, set.timestamp_strategies);
    Post {
        text,
        timestamp,
        platform,
    }
}

fn run_text_strategies(
    container: ElementRef,
    set: &StrategySet,
    exclude: Option<&str>,
) -> Option<String> {
    for strategy in set.text_strategies {
        let candidate = match strategy {
            TextStrategy::OwnText => {
                let text = element_text(container);
                (!text.is_empty()).then_some(text)
            }
            TextStrategy::Selector { css, min_len } => {
                first_selector_text(container, css, *min_len, exclude)
            }
            TextStrategy::SelectorJoin(css) => selector_join(container, css),
            TextStrategy::Heading => heading_text(container, exclude),
            TextStrategy::FilteredLines { min_line_len, take } => {
                filtered_lines(container, *min_line_len, *take, set.noise_words, exclude)
            }
        };
        if let Some(text) = candidate {
            if text.len() > set.min_text_len {
                return Some(text);
            }
        }
    }
    None
}

fn run_timestamp_strategies(
    container: ElementRef,
    strategies: &[TimestampStrategy],
) -> String {
    for strategy in strategies {
        let candidate = match strategy {
            TimestampStrategy::Attr { css, attr } => sel(css).and_then(|selector| {
                container
                    .select(&selector)
                    .find_map(|el| el.value().attr(attr))
                    .map(|value| value.trim().to_string())
            }),
            TimestampStrategy::Text(css) => sel(css).and_then(|selector| {
                container
                    .select(&selector)
                    .map(element_text)
                    .find(|text| !text.is_empty())
            }),
        };
        if let Some(value) = candidate {
            if !value.is_empty() {
                return value;
            }
        }
    }
    UNKNOWN_TIMESTAMP.to_string()
}

fn first_matching_containers<'a>(
    document: &'a Html,
    selectors: &[&'static str],
) -> Vec<ElementRef<'a>> {
    for css in selectors {
        if let Some(selector) = sel(css) {
            let matches: Vec<ElementRef<'a>> = document.select(&selector).collect();
            if !matches.is_empty() {
                return matches;
            }
        }
    }
    Vec::new()
}

fn first_selector_text(
    container: ElementRef,
    css: &str,
    min_len: usize,
    exclude: Option<&str>,
) -> Option<String> {
    let selector = sel(css)?;
    container.select(&selector).map(element_text).find(|text| {
        text.len() > min_len && exclude.map_or(true, |name| !text.eq_ignore_ascii_case(name))
    })
}

fn selector_join(container: ElementRef, css: &str) -> Option<String> {
    let selector = sel(css)?;
    let mut joined = String::new();
    for element in container.select(&selector) {
        let text = element_text(element);
        if text.is_empty() || joined.contains(&text) {
            continue;
        }
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(&text);
    }
    (!joined.is_empty()).then_some(joined)
}

fn heading_text(container: ElementRef, exclude: Option<&str>) -> Option<String> {
    let selector = sel("h1")?;
    let name = exclude.unwrap_or_default();
    for heading in container.select(&selector) {
        let mut text = element_text(heading);
        if text.is_empty() || text.eq_ignore_ascii_case(name) || text.len() <= name.len() + 2 {
            continue;
        }
        // Captions sometimes begin with the profile name; strip it.
        if !name.is_empty() && text.to_lowercase().starts_with(&name.to_lowercase()) {
            text = text[name.len()..].trim().to_string();
        }
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

fn filtered_lines(
    container: ElementRef,
    min_line_len: usize,
    take: usize,
    noise_words: &[&str],
    exclude: Option<&str>,
) -> Option<String> {
    let mut lines = Vec::new();
    for chunk in container.text() {
        let line = chunk.trim();
        if line.len() <= min_line_len {
            continue;
        }
        let lowered = line.to_lowercase();
        if noise_words.iter().any(|word| lowered.contains(word)) {
            continue;
        }
        if exclude.is_some_and(|name| line.eq_ignore_ascii_case(name)) {
            continue;
        }
        lines.push(line);
        if lines.len() == take {
            break;
        }
    }
    (!lines.is_empty()).then(|| lines.join(" "))
}

/// Whitespace-collapsed text content of an element.
fn element_text(element: ElementRef) -> String {
    let mut out = String::new();
    let mut last_was_space = true;
    for chunk in element.text() {
        for ch in chunk.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            } else {
                out.push(ch);
                last_was_space = false;
            }
        }
    }
    out.trim().to_string()
}

fn sel(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}
