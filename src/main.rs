use std::path::PathBuf;

use anyhow::Result;

use fc25_crawler::config::CrawlConfig;
use fc25_crawler::export;
use fc25_crawler::page_cache::{self, PageCache};
use fc25_crawler::ratings_fetch;

const DEFAULT_OUTPUT: &str = "players_data.json";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let skip_cache = args.iter().any(|arg| arg == "--skip-cache");
    let out_path =
        parse_path_arg(&args, "--out").unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let cache = match parse_path_arg(&args, "--cache-dir").or_else(page_cache::default_cache_dir) {
        Some(dir) => PageCache::open(&dir),
        None => PageCache::disabled(),
    };

    let cfg = CrawlConfig::from_env();

    println!("Fetching player data...");
    let outcome = ratings_fetch::fetch_all_players(&cfg, &cache, skip_cache)?;

    println!("Total players fetched: {}", outcome.players.len());
    println!(
        "Pages: {} fetched, {} from cache",
        outcome.pages_fetched, outcome.pages_from_cache
    );
    if !outcome.errors.is_empty() {
        println!("Skipped pages: {}", outcome.errors.len());
        for err in outcome.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    let gz_path = export::compressed_path(&out_path);
    println!("Saving data to {}...", out_path.display());
    export::save_players_json(&outcome.players, &out_path)?;
    println!("Compressing data to {}...", gz_path.display());
    export::write_compressed_copy(&out_path, &gz_path)?;
    println!("Done!");

    Ok(())
}

fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}
