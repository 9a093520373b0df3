use std::fs;
use std::path::PathBuf;

use fc25_crawler::config::CrawlConfig;
use fc25_crawler::http_client::http_client;
use fc25_crawler::page_cache::{PageCache, page_key};
use fc25_crawler::ratings_fetch::{fetch_all_players, fetch_page};

// Nothing listens on the discard port, so any request the cache does not
// absorb fails immediately instead of touching the network.
fn offline_cfg(page_size: u64) -> CrawlConfig {
    CrawlConfig {
        base_url: "http://127.0.0.1:9/ratings".to_string(),
        page_size,
        parallelism: 2,
        retry: false,
        ..CrawlConfig::default()
    }
}

fn temp_cache(name: &str) -> (PathBuf, PageCache) {
    let dir = std::env::temp_dir().join(format!(
        "fc25_crawler_crawl_{}_{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let cache = PageCache::open(&dir);
    (dir, cache)
}

fn ids(players: &[fc25_crawler::player::PlayerRecord]) -> Vec<Option<u64>> {
    players.iter().map(|p| p.id).collect()
}

#[test]
fn primed_cache_answers_without_network() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("idempotent");
    cache.put(
        &page_key("en", 2, 0),
        r#"{"items": [{"id": 1}, {"id": 2}], "totalItems": 2}"#,
    );

    let client = http_client().expect("client should build");
    let first = fetch_page(client, &cfg, &cache, 0, false).expect("cache hit should succeed");
    assert!(first.from_cache);
    assert_eq!(first.page.items.len(), 2);

    // A repeat request returns the identical payload, still without a call.
    let second = fetch_page(client, &cfg, &cache, 0, false).expect("cache hit should succeed");
    assert!(second.from_cache);
    assert_eq!(ids(&second.page.items), ids(&first.page.items));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn skip_cache_bypasses_reads() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("skip");
    cache.put(
        &page_key("en", 2, 0),
        r#"{"items": [{"id": 1}], "totalItems": 1}"#,
    );

    let client = http_client().expect("client should build");
    let result = fetch_page(client, &cfg, &cache, 0, true);
    assert!(result.is_err(), "skip-cache must go to the network");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn failed_pages_are_skipped_and_the_rest_survive() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("isolation");
    // Three pages expected; the one at offset 4 is not cached and the
    // endpoint is unreachable, so it fails while the others come through.
    cache.put(
        &page_key("en", 2, 0),
        r#"{"items": [{"id": 1}, {"id": 2}], "totalItems": 6}"#,
    );
    cache.put(
        &page_key("en", 2, 2),
        r#"{"items": [{"id": 3}, {"id": 4}]}"#,
    );

    let outcome = fetch_all_players(&cfg, &cache, false).expect("crawl should not abort");
    assert_eq!(
        ids(&outcome.players),
        vec![Some(1), Some(2), Some(3), Some(4)]
    );
    assert_eq!(outcome.pages_from_cache, 2);
    assert_eq!(outcome.pages_fetched, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("offset 4"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn sequential_walk_stops_at_a_short_page() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("walk");
    // No totalItems anywhere: the crawler walks until a page comes up short.
    cache.put(&page_key("en", 2, 0), r#"{"items": [{"id": 1}, {"id": 2}]}"#);
    cache.put(&page_key("en", 2, 2), r#"{"items": [{"id": 3}]}"#);

    let outcome = fetch_all_players(&cfg, &cache, false).expect("crawl should not abort");
    assert_eq!(ids(&outcome.players), vec![Some(1), Some(2), Some(3)]);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.pages_from_cache, 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn empty_dataset_is_not_an_error() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("empty");
    cache.put(&page_key("en", 2, 0), r#"{"items": [], "totalItems": 0}"#);

    let outcome = fetch_all_players(&cfg, &cache, false).expect("empty crawl should succeed");
    assert!(outcome.players.is_empty());
    assert!(outcome.errors.is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn first_page_failure_aborts_the_run() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("fatal");

    let result = fetch_all_players(&cfg, &cache, false);
    assert!(result.is_err());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn duplicate_ids_across_pages_collapse() {
    let cfg = offline_cfg(2);
    let (dir, cache) = temp_cache("dedup");
    cache.put(
        &page_key("en", 2, 0),
        r#"{"items": [{"id": 1}, {"id": 2}], "totalItems": 4}"#,
    );
    cache.put(
        &page_key("en", 2, 2),
        r#"{"items": [{"id": 2}, {"id": 3}]}"#,
    );

    let outcome = fetch_all_players(&cfg, &cache, false).expect("crawl should not abort");
    assert_eq!(ids(&outcome.players), vec![Some(1), Some(2), Some(3)]);

    let _ = fs::remove_dir_all(&dir);
}
