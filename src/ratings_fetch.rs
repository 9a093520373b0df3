use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::CrawlConfig;
use crate::http_client::http_client;
use crate::page_cache::{PageCache, page_key};
use crate::player::PlayerRecord;

const RETRY_PAUSE: Duration = Duration::from_millis(300);

/// One page of the ratings listing. `totalItems` is advisory; pages are
/// also terminated by coming up short.
#[derive(Debug, Deserialize)]
pub struct RatingsPage {
    #[serde(default)]
    pub items: Vec<PlayerRecord>,
    #[serde(rename = "totalItems", default)]
    pub total_items: Option<u64>,
}

pub struct FetchedPage {
    pub page: RatingsPage,
    pub from_cache: bool,
}

pub struct CrawlOutcome {
    pub players: Vec<PlayerRecord>,
    pub pages_fetched: usize,
    pub pages_from_cache: usize,
    pub errors: Vec<String>,
}

pub fn parse_ratings_page_json(raw: &str) -> Result<RatingsPage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow::anyhow!("empty ratings response"));
    }
    serde_json::from_str(trimmed).context("invalid ratings json")
}

/// Fetch a single page, consulting the cache first unless `skip_cache` is
/// set. Fresh bodies are written back to the cache; a cached body that no
/// longer parses counts as a miss.
pub fn fetch_page(
    client: &Client,
    cfg: &CrawlConfig,
    cache: &PageCache,
    offset: u64,
    skip_cache: bool,
) -> Result<FetchedPage> {
    let key = page_key(&cfg.locale, cfg.page_size, offset);
    if !skip_cache
        && let Some(body) = cache.get(&key)
        && let Ok(page) = parse_ratings_page_json(&body)
    {
        return Ok(FetchedPage {
            page,
            from_cache: true,
        });
    }

    let body = request_page_body(client, cfg, offset)?;
    let page = parse_ratings_page_json(&body)?;
    cache.put(&key, &body);
    Ok(FetchedPage {
        page,
        from_cache: false,
    })
}

fn request_page_body(client: &Client, cfg: &CrawlConfig, offset: u64) -> Result<String> {
    let limit = cfg.page_size.to_string();
    let offset_param = offset.to_string();
    let attempts = if cfg.retry { 2 } else { 1 };
    let mut last_err = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            std::thread::sleep(RETRY_PAUSE);
        }
        let resp = match client
            .get(&cfg.base_url)
            .query(&[
                ("locale", cfg.locale.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset_param.as_str()),
            ])
            .send()
        {
            Ok(resp) => resp,
            Err(err) => {
                // Transport failures are the only retryable class.
                last_err = Some(anyhow::anyhow!("request failed: {err}"));
                continue;
            }
        };

        let status = resp.status();
        let body = match resp.text() {
            Ok(body) => body,
            Err(err) => {
                last_err = Some(anyhow::anyhow!("failed reading ratings body: {err}"));
                continue;
            }
        };
        if !status.is_success() {
            let snippet = body
                .trim()
                .replace('\n', " ")
                .replace('\r', " ")
                .chars()
                .take(220)
                .collect::<String>();
            return Err(anyhow::anyhow!("ratings http {}: {}", status, snippet));
        }
        return Ok(body);
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("request failed")))
}

/// Crawl the full listing. The first page sizes the run: when it reports a
/// total, the remaining offsets are fetched through a bounded pool and
/// reassembled in offset order; otherwise pages are walked sequentially
/// until one comes up short. Failed pages are skipped and recorded.
pub fn fetch_all_players(
    cfg: &CrawlConfig,
    cache: &PageCache,
    skip_cache: bool,
) -> Result<CrawlOutcome> {
    let client = http_client()?;

    let first =
        fetch_page(client, cfg, cache, 0, skip_cache).context("first ratings page failed")?;

    let mut pages_fetched = usize::from(!first.from_cache);
    let mut pages_from_cache = usize::from(first.from_cache);
    let mut errors = Vec::new();
    let first_len = first.page.items.len() as u64;
    let mut players = first.page.items;

    if let Some(total) = first.page.total_items {
        let offsets = remaining_offsets(total, cfg.page_size);
        let mut results: Vec<(u64, Result<FetchedPage>)> = with_fetch_pool(cfg.parallelism, || {
            offsets
                .par_iter()
                .map(|&offset| (offset, fetch_page(client, cfg, cache, offset, skip_cache)))
                .collect()
        });
        results.sort_by_key(|(offset, _)| *offset);

        for (offset, result) in results {
            match result {
                Ok(fetched) => {
                    pages_fetched += usize::from(!fetched.from_cache);
                    pages_from_cache += usize::from(fetched.from_cache);
                    players.extend(fetched.page.items);
                }
                Err(err) => errors.push(format!("page at offset {offset} failed: {err}")),
            }
        }
    } else {
        let mut offset = cfg.page_size;
        let mut last_len = first_len;
        while last_len == cfg.page_size {
            match fetch_page(client, cfg, cache, offset, skip_cache) {
                Ok(fetched) => {
                    pages_fetched += usize::from(!fetched.from_cache);
                    pages_from_cache += usize::from(fetched.from_cache);
                    last_len = fetched.page.items.len() as u64;
                    players.extend(fetched.page.items);
                    offset += cfg.page_size;
                }
                Err(err) => {
                    errors.push(format!("page at offset {offset} failed: {err}"));
                    break;
                }
            }
        }
    }

    dedup_players(&mut players);

    Ok(CrawlOutcome {
        players,
        pages_fetched,
        pages_from_cache,
        errors,
    })
}

fn remaining_offsets(total_items: u64, page_size: u64) -> Vec<u64> {
    let page_size = page_size.max(1);
    (page_size..total_items)
        .step_by(page_size as usize)
        .collect()
}

/// First occurrence wins; records without an id are always kept.
fn dedup_players(players: &mut Vec<PlayerRecord>) {
    let mut seen = HashSet::new();
    players.retain(|player| match player.id {
        Some(id) => seen.insert(id),
        None => true,
    });
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
