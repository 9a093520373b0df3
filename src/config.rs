use std::env;

pub const RATINGS_BASE_URL: &str = "https://drop-api.ea.com/rating/ea-sports-fc";

const DEFAULT_LOCALE: &str = "en";
const DEFAULT_PAGE_SIZE: u64 = 100;
const DEFAULT_PARALLELISM: usize = 8;

/// Crawl settings resolved once at startup. Everything is overridable from
/// the environment so tests can point the crawler at a dead endpoint.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub locale: String,
    pub page_size: u64,
    pub parallelism: usize,
    pub retry: bool,
}

impl CrawlConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("RATINGS_BASE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| RATINGS_BASE_URL.to_string());
        let locale = env::var("RATINGS_LOCALE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        // The drop API rejects page sizes above 100.
        let page_size = env::var("RATINGS_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, 100);
        let parallelism = env::var("FETCH_PARALLELISM")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM)
            .clamp(1, 32);
        let retry = env_bool("FETCH_RETRY", true);

        Self {
            base_url,
            locale,
            page_size,
            parallelism,
            retry,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: RATINGS_BASE_URL.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            parallelism: DEFAULT_PARALLELISM,
            retry: true,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}
