// pxlog play: headless playback loop
//
// Each tick polls the controller. While a background replay is in flight the
// loop prints a busy line with its progress instead of advancing.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use pxlog_config::Settings;
use pxlog_playback::{PlaybackMode, PlaybackOptions, ReplayProgress, TickOutcome};

use crate::util::{clamp_target, open_playback};
use crate::CliError;

fn print_busy(progress: ReplayProgress) {
    println!("busy {}/{} ({:.0}%)", progress.done, progress.total, progress.fraction() * 100.0);
}

pub fn cmd_play(
    path: PathBuf,
    from: u64,
    step: Option<i64>,
    ticks: u64,
    threshold: Option<u64>,
    tick_ms: Option<u64>,
    settings: &Settings,
) -> Result<(), CliError> {
    let step = step.unwrap_or(settings.default_step);
    if step == 0 {
        return Err(CliError::args("--step must be non-zero"));
    }
    let options = PlaybackOptions {
        offload_threshold: threshold.unwrap_or(settings.offload_threshold),
        step,
    };
    let delay = Duration::from_millis(tick_ms.unwrap_or(settings.tick_millis));
    let wait = delay.max(Duration::from_millis(1));
    let mut playback = open_playback(&path, options)?;

    let start = clamp_target(from, playback.total());
    playback.seek(start)?;
    while playback.is_replay_active() {
        if let Some(progress) = playback.replay_progress() {
            print_busy(progress);
        }
        thread::sleep(wait);
        playback.poll()?;
    }

    playback.set_mode(PlaybackMode::Play);
    println!("{}", playback.status());

    for _ in 0..ticks {
        match playback.tick()? {
            TickOutcome::Busy(progress) => print_busy(progress),
            TickOutcome::Moved { .. } => println!("{}", playback.status()),
            TickOutcome::Paused => break,
        }
        if playback.mode() == PlaybackMode::Pause && !playback.is_replay_active() {
            break;
        }
        thread::sleep(delay);
    }

    // Let an in-flight replay land so the final status is settled
    while playback.is_replay_active() {
        thread::sleep(wait);
        playback.poll()?;
    }
    playback.set_mode(PlaybackMode::Pause);
    println!("stopped at {}", playback.status());
    Ok(())
}
