//! Content fetcher behavior against a scripted browser

mod common;

use std::time::Duration;

use common::{capture_logs, fast_options_in, options_in, Page, ScriptedLauncher, Step};
use jobhunter::{AttemptError, ContentFetcher, FetchError};
use tokio::time::Instant;

const URL: &str = "https://example.com/jobs/42";

#[tokio::test]
async fn test_invalid_urls_never_launch_browser() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new(vec![Step::Load(Page::body("unused"))]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    for url in ["example.com/jobs", "https://", "not a url", ""] {
        let err = fetcher.fetch(url).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)), "{url}: {err}");
    }

    assert_eq!(counters.launches(), 0);
    assert_eq!(counters.navigations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_page_uses_full_budget() {
    let dir = tempfile::tempdir().unwrap();

    for retries in 1..=4u32 {
        let launcher = ScriptedLauncher::new(vec![Step::Fail("net::ERR_CONNECTION_RESET")]);
        let counters = launcher.counters();
        let options = options_in(dir.path()).retries(retries);
        let fetcher = ContentFetcher::new(launcher, options);

        let start = Instant::now();
        let err = fetcher.fetch(URL).await.unwrap_err();
        let elapsed = start.elapsed();

        match err {
            FetchError::Navigation { attempts, cause, .. } => {
                assert_eq!(attempts, retries);
                assert!(matches!(cause, AttemptError::Browser(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counters.navigations(), retries as usize);
        // Immediate failures: only the backoff delays consume time
        assert_eq!(elapsed, Duration::from_secs(2) * (retries - 1));
        assert_eq!(counters.launches(), 1);
        assert_eq!(counters.closes(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_still_attempts_once() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new(vec![Step::Fail("boom")]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, options_in(dir.path()).retries(0));

    let err = fetcher.fetch(URL).await.unwrap_err();
    assert!(matches!(err, FetchError::Navigation { attempts: 1, .. }));
    assert_eq!(counters.navigations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_last_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new(vec![
        Step::Fail("first"),
        Step::Fail("second"),
        Step::Load(Page::body("irrelevant").region("main", "Staff Engineer\nRemote")),
    ]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, options_in(dir.path()));

    let start = Instant::now();
    let content = fetcher.fetch(URL).await.unwrap();

    assert_eq!(content.as_str(), "Staff Engineer\nRemote");
    assert_eq!(counters.navigations(), 3);
    // Two backoffs plus one settle delay
    assert_eq!(start.elapsed(), Duration::from_secs(2 + 2 + 3));
    assert_eq!(counters.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_are_retried_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new(vec![Step::Hang]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, options_in(dir.path()));

    let start = Instant::now();
    let err = fetcher.fetch(URL).await.unwrap_err();

    match &err {
        FetchError::Navigation { attempts, cause, .. } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(cause, AttemptError::Timeout(d) if *d == Duration::from_secs(30)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("navigation timed out after 30s"));
    assert_eq!(start.elapsed(), Duration::from_secs(3 * 30 + 2 * 2));
    assert_eq!(counters.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_pages_are_retried_like_navigation_failures() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new(vec![Step::Load(Page::body("  \n\t\n  "))]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, options_in(dir.path()));

    let start = Instant::now();
    let err = fetcher.fetch(URL).await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::Navigation {
            attempts: 3,
            cause: AttemptError::EmptyContent,
            ..
        }
    ));
    assert_eq!(counters.navigations(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(3 * 3 + 2 * 2));
}

#[tokio::test]
async fn test_main_region_wins_over_body() {
    let dir = tempfile::tempdir().unwrap();
    let page = Page::body("Header\nSenior Engineer\nFooter")
        .region("article", "Article text")
        .region("main", "  Senior Engineer  \n\n Apply now ");
    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page)]),
        fast_options_in(dir.path()),
    );

    let content = fetcher.fetch(URL).await.unwrap();
    assert_eq!(content.as_str(), "Senior Engineer\nApply now");
}

#[tokio::test]
async fn test_later_selector_used_when_earlier_ones_miss() {
    let dir = tempfile::tempdir().unwrap();
    let page = Page::body("Everything")
        .region(".description", "Fallback description")
        .region("#job-description", "Job description block");
    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page)]),
        fast_options_in(dir.path()),
    );

    let content = fetcher.fetch(URL).await.unwrap();
    assert_eq!(content.as_str(), "Job description block");
}

#[tokio::test]
async fn test_selector_query_error_moves_to_next_selector() {
    let dir = tempfile::tempdir().unwrap();
    let page = Page::body("Nav\nArticle text\nFooter")
        .region("main", "Main text")
        .broken_selector("main")
        .region("article", "Article text");
    let launcher = ScriptedLauncher::new(vec![Step::Load(page)]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    let content = fetcher.fetch(URL).await.unwrap();
    assert_eq!(content.as_str(), "Article text");
    // The query error is not a failed attempt
    assert_eq!(counters.navigations(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_body_fallback_when_every_selector_errors() {
    let dir = tempfile::tempdir().unwrap();
    let page = jobhunter::client::DEFAULT_CONTENT_SELECTORS
        .iter()
        .fold(Page::body("Whole page"), |page, selector| page.broken_selector(selector));
    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page)]),
        fast_options_in(dir.path()),
    );

    let content = fetcher.fetch(URL).await.unwrap();
    assert_eq!(content.as_str(), "Whole page");
}

#[tokio::test]
async fn test_body_fallback_when_no_region_matches() {
    let dir = tempfile::tempdir().unwrap();
    let (logs, _guard) = capture_logs();
    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(Page::body("\n  Whole page  \n\nText\n"))]),
        fast_options_in(dir.path()),
    );

    let content = fetcher.fetch(URL).await.unwrap();
    assert_eq!(content.as_str(), "Whole page\nText");
    assert!(logs.contains("Falling back to full body text"));
}

#[tokio::test]
async fn test_blank_region_falls_back_to_body() {
    let dir = tempfile::tempdir().unwrap();
    let page = Page::body("Body text")
        .region("main", "   \n  ")
        .region("article", "Article text");
    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page)]),
        fast_options_in(dir.path()),
    );

    // The first matching region decides; a blank one does not defer to later selectors
    let content = fetcher.fetch(URL).await.unwrap();
    assert_eq!(content.as_str(), "Body text");
}

#[tokio::test]
async fn test_min_region_chars() {
    let dir = tempfile::tempdir().unwrap();
    let page = Page::body("Full posting with every detail").region("main", "Apply");

    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page.clone())]),
        fast_options_in(dir.path()),
    );
    assert_eq!(fetcher.fetch(URL).await.unwrap().as_str(), "Apply");

    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page)]),
        fast_options_in(dir.path()).min_region_chars(20),
    );
    assert_eq!(
        fetcher.fetch(URL).await.unwrap().as_str(),
        "Full posting with every detail"
    );
}

#[tokio::test]
async fn test_custom_selectors() {
    let dir = tempfile::tempdir().unwrap();
    let page = Page::body("Body")
        .region("main", "Main")
        .region(".posting", "Posting");
    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(page)]),
        fast_options_in(dir.path()).content_selectors([".posting", "main"]),
    );

    assert_eq!(fetcher.fetch(URL).await.unwrap().as_str(), "Posting");
}

#[tokio::test]
async fn test_launch_failure_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::failing_launch();
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    let err = fetcher.fetch(URL).await.unwrap_err();
    assert!(matches!(err, FetchError::Launch(_)));
    assert_eq!(counters.launches(), 1);
    assert_eq!(counters.navigations(), 0);
}

#[tokio::test]
async fn test_session_closed_after_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::failing_stealth(vec![Step::Load(Page::body("x"))]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    let err = fetcher.fetch(URL).await.unwrap_err();
    assert!(matches!(err, FetchError::Launch(_)));
    assert_eq!(counters.navigations(), 0);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_session_reused_across_retries() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new(vec![
        Step::Fail("reset"),
        Step::Load(Page::body("Done")),
    ]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    fetcher.fetch(URL).await.unwrap();
    assert_eq!(counters.launches(), 1);
    assert_eq!(counters.stealth.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_missing_auth_state_logs_warning() {
    let dir = tempfile::tempdir().unwrap();
    let (logs, _guard) = capture_logs();
    let launcher = ScriptedLauncher::new(vec![Step::Load(Page::body("ok"))]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    fetcher.fetch(URL).await.unwrap();

    assert!(logs.contains("No auth state found. Running without login state"));
    assert_eq!(counters.auth_restores.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_saved_auth_state_is_restored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("auth.json"),
        r#"{
            "cookies": [
                {"name": "li_at", "value": "abc", "domain": ".linkedin.com", "path": "/",
                 "expires": -1, "httpOnly": true, "secure": true, "sameSite": "None"},
                {"name": "lang", "value": "en", "domain": ".linkedin.com"}
            ],
            "origins": []
        }"#,
    )
    .unwrap();

    let launcher = ScriptedLauncher::new(vec![Step::Load(Page::body("ok"))]);
    let counters = launcher.counters();
    let fetcher = ContentFetcher::new(launcher, fast_options_in(dir.path()));

    fetcher.fetch(URL).await.unwrap();

    use std::sync::atomic::Ordering;
    assert_eq!(counters.auth_restores.load(Ordering::SeqCst), 1);
    assert_eq!(counters.restored_cookies.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_corrupt_auth_state_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("auth.json"), "{ not json").unwrap();
    let (logs, _guard) = capture_logs();

    let fetcher = ContentFetcher::new(
        ScriptedLauncher::new(vec![Step::Load(Page::body("still works"))]),
        fast_options_in(dir.path()),
    );

    assert_eq!(fetcher.fetch(URL).await.unwrap().as_str(), "still works");
    assert!(logs.contains("Unusable auth state"));
}
