// Store operations: convert, info, verify, snapshot

use std::path::PathBuf;

use pxlog_config::Settings;
use pxlog_io::LogStore;
use pxlog_playback::PlaybackOptions;
use serde_json::json;

use crate::util::open_playback;
use crate::CliError;

pub fn cmd_convert(raw: PathBuf, output: Option<PathBuf>) -> Result<(), CliError> {
    let store = match output {
        Some(out) => LogStore::convert_to(&raw, &out)?,
        None => LogStore::convert(&raw)?,
    };
    println!(
        "converted {} records ({}x{}) -> {}",
        store.record_count(),
        store.width(),
        store.height(),
        store.path().display()
    );
    Ok(())
}

pub fn cmd_info(path: PathBuf, json: bool) -> Result<(), CliError> {
    let store = LogStore::open(&path)?;
    let snapshots = store.snapshot_ids()?;

    if json {
        let info = json!({
            "path": store.path().display().to_string(),
            "width": store.width(),
            "height": store.height(),
            "records": store.record_count(),
            "snapshots": snapshots,
        });
        println!("{}", serde_json::to_string_pretty(&info).map_err(|e| CliError::general(e.to_string()))?);
        return Ok(());
    }

    println!("path:      {}", store.path().display());
    println!("canvas:    {}x{}", store.width(), store.height());
    println!("records:   {}", store.record_count());
    if snapshots.is_empty() {
        println!("snapshots: none");
    } else {
        let ids: Vec<String> = snapshots.iter().map(u64::to_string).collect();
        println!("snapshots: {}", ids.join(", "));
    }
    Ok(())
}

pub fn cmd_verify(path: PathBuf) -> Result<(), CliError> {
    let store = LogStore::open(&path)?;
    let checked = store.verify_chain()?;
    println!("ok: {} records, chain intact", checked);
    Ok(())
}

pub fn cmd_snapshot(path: PathBuf, every: Option<u64>, at: Vec<u64>, settings: &Settings) -> Result<(), CliError> {
    // Snapshot building never hands off to a worker
    let options = PlaybackOptions { offload_threshold: u64::MAX, ..PlaybackOptions::default() };
    let mut playback = open_playback(&path, options)?;

    let created = if at.is_empty() {
        let interval = every.unwrap_or(settings.snapshot_interval);
        if interval == 0 {
            return Err(CliError::args("--every must be greater than 0"));
        }
        playback.build_snapshots(interval)?
    } else {
        let mut created = Vec::with_capacity(at.len());
        for id in at {
            if id == 0 || id > playback.total() {
                return Err(CliError::args(format!("snapshot id {} is outside 1..={}", id, playback.total()))
                    .with_hint("snapshots are taken at existing record ids"));
            }
            playback.seek(id)?;
            created.push(playback.create_snapshot()?);
        }
        created
    };

    if created.is_empty() {
        println!("no snapshots written ({} records)", playback.total());
    } else {
        let ids: Vec<String> = created.iter().map(u64::to_string).collect();
        println!("wrote {} snapshots: {}", created.len(), ids.join(", "));
    }
    Ok(())
}
