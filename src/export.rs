use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::player::PlayerRecord;

pub fn save_players_json(players: &[PlayerRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(players).context("serialize players")?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).with_context(|| format!("failed writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed swapping {}", path.display()))?;
    Ok(())
}

/// Produce the gzip artifact by streaming the already-written JSON file, so
/// the two outputs cannot drift apart.
pub fn write_compressed_copy(json_path: &Path, gz_path: &Path) -> Result<()> {
    let input = File::open(json_path)
        .with_context(|| format!("failed opening {}", json_path.display()))?;
    let tmp = tmp_path(gz_path);
    let output =
        File::create(&tmp).with_context(|| format!("failed creating {}", tmp.display()))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut BufReader::new(input), &mut encoder).context("compress players json")?;
    let mut writer = encoder.finish().context("finalize gzip stream")?;
    writer.flush().context("flush gzip output")?;
    drop(writer);

    fs::rename(&tmp, gz_path).with_context(|| format!("failed swapping {}", gz_path.display()))?;
    Ok(())
}

pub fn read_compressed_players(gz_path: &Path) -> Result<Vec<PlayerRecord>> {
    let file =
        File::open(gz_path).with_context(|| format!("failed opening {}", gz_path.display()))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut raw = String::new();
    decoder
        .read_to_string(&mut raw)
        .context("decompress players json")?;
    serde_json::from_str(&raw).context("invalid players json in gzip artifact")
}

/// `players_data.json` → `players_data.json.gz`.
pub fn compressed_path(json_path: &Path) -> PathBuf {
    let mut name = json_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "players_data.json".into());
    name.push(".gz");
    json_path.with_file_name(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "out".into());
    name.push(".tmp");
    path.with_file_name(name)
}
