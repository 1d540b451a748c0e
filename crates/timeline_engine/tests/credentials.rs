use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use timeline_engine::{
    AbortReason, CookieError, CookieStore, FetchRequest, FetcherConfig, NoopProgressSink,
    Platform, SameSite, TimelineFetcher,
};

fn fetcher_with_cookie_dir(dir: &TempDir) -> TimelineFetcher {
    let mut config = FetcherConfig::default();
    config.cookie_dir = dir.path().to_path_buf();
    TimelineFetcher::new(config)
}

#[tokio::test]
async fn missing_cookie_file_aborts_without_any_navigation() {
    let dir = TempDir::new().unwrap();
    let fetcher = fetcher_with_cookie_dir(&dir);
    let request = FetchRequest::new(Platform::Twitter, "nasa", 10);

    let report = fetcher
        .fetch(1, &request, &NoopProgressSink)
        .await
        .expect("soft failure");

    assert!(report.posts.is_empty());
    match report.reason {
        Some(AbortReason::MissingCredentials { detail }) => {
            assert!(detail.contains("regenerate cookies.json"), "detail: {detail}");
        }
        other => panic!("expected MissingCredentials, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_cookie_file_is_a_credentials_problem_not_a_crash() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("facebook_cookies.json"), "{not json").unwrap();
    let fetcher = fetcher_with_cookie_dir(&dir);
    let request = FetchRequest::new(Platform::Facebook, "nasa.gov", 10);

    let report = fetcher
        .fetch(1, &request, &NoopProgressSink)
        .await
        .expect("soft failure");

    assert!(matches!(
        report.reason,
        Some(AbortReason::MissingCredentials { .. })
    ));
}

#[tokio::test]
async fn linkedin_set_without_critical_cookie_names_the_gap() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("linkedin_cookies.json"),
        r#"[{"name":"lang","value":"en","domain":".linkedin.com","path":"/"}]"#,
    )
    .unwrap();
    let fetcher = fetcher_with_cookie_dir(&dir);
    let request = FetchRequest::new(
        Platform::LinkedIn,
        "https://www.linkedin.com/in/somebody/",
        10,
    );

    let report = fetcher
        .fetch(1, &request, &NoopProgressSink)
        .await
        .expect("soft failure");

    assert!(report.posts.is_empty());
    let reason = report.reason.expect("abort reason");
    assert!(
        reason.to_string().contains("critical cookie missing"),
        "reason: {reason}"
    );
}

#[tokio::test]
async fn invalid_identifier_aborts_before_touching_cookies() {
    // No cookie directory contents at all; target validation fires first.
    let dir = TempDir::new().unwrap();
    let fetcher = fetcher_with_cookie_dir(&dir);
    let request = FetchRequest::new(Platform::Twitter, "not a user name", 10);

    let report = fetcher
        .fetch(1, &request, &NoopProgressSink)
        .await
        .expect("soft failure");

    assert!(matches!(
        report.reason,
        Some(AbortReason::InvalidTarget { .. })
    ));
}

#[test]
fn store_load_normalizes_exported_records() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("instagram_cookies.json"),
        r#"[
            {"name":"sessionid","value":"abc","domain":".instagram.com","path":"/",
             "sameSite":"unspecified","expirationDate":1799999999.73},
            {"name":"csrftoken","value":"def","domain":".instagram.com","sameSite":"Strict"}
        ]"#,
    )
    .unwrap();

    let store = CookieStore::new(dir.path());
    let records = store.load(Platform::Instagram).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "sessionid");
    assert_eq!(records[0].same_site, SameSite::None);
    assert_eq!(records[0].expiry, Some(1_799_999_999));
    assert_eq!(records[1].same_site, SameSite::Strict);
    assert_eq!(records[1].path, "/");
    assert_eq!(records[1].expiry, None);
}

#[test]
fn store_distinguishes_not_found_from_malformed() {
    let dir = TempDir::new().unwrap();
    let store = CookieStore::new(dir.path());
    assert!(matches!(
        store.load(Platform::Twitter),
        Err(CookieError::NotFound { .. })
    ));

    fs::write(dir.path().join("cookies.json"), "[1, 2, 3]").unwrap();
    assert!(matches!(
        store.load(Platform::Twitter),
        Err(CookieError::Malformed { .. })
    ));
}

#[test]
fn request_clamps_max_posts_into_bounds() {
    let low = FetchRequest::new(Platform::Twitter, "nasa", 0);
    let high = FetchRequest::new(Platform::Twitter, "nasa", 5000);
    assert_eq!(low.max_posts, 1);
    assert_eq!(high.max_posts, 100);
}
