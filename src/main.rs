mod config;
mod error;
mod image_loader;
mod keymap;
mod models;
mod prefetch;
mod scanner;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

use config::SlideshowConfig;
use error::SessionError;
use keymap::{parse_command, Action};
use scanner::{FolderScanner, ScanConfig};
use session::{Shown, SlideshowSession};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slideshow=info".parse()?),
        )
        .init();

    let config = SlideshowConfig::from_env();
    let mut session = SlideshowSession::new(&config);

    if let Some(dir) = std::env::args_os().nth(1) {
        if let Err(e) = open_folder(&mut session, &config, PathBuf::from(dir)).await {
            error!("Failed to open folder: {:#}", e);
        }
    } else {
        info!("No folder given; type `open <dir>` to load one");
    }

    let result = run(&mut session, &config).await;
    session.shutdown();
    result
}

/// Reads commands from stdin and advances the slideshow on its timer until exit.
async fn run(session: &mut SlideshowSession, config: &SlideshowConfig) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let timer = time::sleep(session.speed());
    tokio::pin!(timer);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let Some(action) = parse_command(&line) else {
                    if !line.trim().is_empty() {
                        warn!("Unknown command: {}", line.trim());
                    }
                    continue;
                };
                if action == Action::Exit {
                    break;
                }
                apply(session, config, action).await;
                // Any input restarts the slide delay.
                timer.as_mut().reset(Instant::now() + session.speed());
            }
            _ = &mut timer, if session.is_playing() => {
                let shown = tokio::task::block_in_place(|| session.next());
                present(session, shown);
                timer.as_mut().reset(Instant::now() + session.speed());
            }
        }
    }

    info!("Exiting");
    Ok(())
}

async fn apply(session: &mut SlideshowSession, config: &SlideshowConfig, action: Action) {
    match action {
        Action::Exit => {}
        Action::Next => {
            let shown = tokio::task::block_in_place(|| session.next());
            present(session, shown);
        }
        Action::Previous => {
            let shown = tokio::task::block_in_place(|| session.previous());
            present(session, shown);
        }
        Action::Reload => {
            let shown = tokio::task::block_in_place(|| session.reload_current());
            present(session, shown);
        }
        Action::TogglePlayback => {
            session.toggle_playback();
            info!("{}", session.mode_line());
        }
        Action::ToggleShuffle => {
            let shuffled = session.toggle_shuffle();
            info!("Shuffle {}", if shuffled { "on" } else { "off" });
            let shown = tokio::task::block_in_place(|| session.show_current());
            present(session, shown);
        }
        Action::SetSpeed(ms) => {
            session.set_speed(ms);
            info!("Slideshow speed: {} ms", ms);
        }
        Action::CycleSpeed => {
            let ms = session.cycle_speed();
            info!("Slideshow speed: {} ms", ms);
        }
        Action::SetCacheSize(size) => {
            let removed = session.set_cache_size(size);
            info!(removed, "Cache size: {}", size);
        }
        Action::CycleCacheSize => {
            let (size, removed) = session.cycle_cache_size();
            info!(removed, "Cache size: {}", size);
        }
        Action::SetSurface(width, height) => {
            session.set_surface(width, height);
            info!("Surface: {}x{}", width, height);
        }
        Action::Open(dir) => {
            if let Err(e) = open_folder(session, config, dir).await {
                error!("Failed to open folder: {:#}", e);
            }
        }
    }
}

/// Scans `dir` and replaces the session's images with what was found.
async fn open_folder(
    session: &mut SlideshowSession,
    config: &SlideshowConfig,
    dir: PathBuf,
) -> Result<()> {
    session.unload();

    let scanner = FolderScanner::with_config(ScanConfig {
        recursive: config.recursive,
        ..Default::default()
    });
    let (mut progress, handle) = scanner.scan_with_progress(dir.clone());
    while let Some(update) = progress.recv().await {
        info!("{}", update.message());
    }
    let paths = handle
        .await
        .context("Scan task panicked")?
        .with_context(|| format!("Failed to scan {:?}", dir))?;

    match session.load(paths) {
        Ok(()) => {}
        Err(SessionError::NoImages) => {
            warn!("No images found in {:?}", dir);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let shown = tokio::task::block_in_place(|| session.show_current());
    present(session, shown);
    Ok(())
}

/// Logs what would be on screen.
fn present(session: &SlideshowSession, shown: Result<Shown, SessionError>) {
    match shown {
        Ok(shown) => {
            info!(
                index = shown.index,
                path = ?shown.path,
                width = shown.image.width,
                height = shown.image.height,
                "{}",
                session.status_line().unwrap_or_default()
            );
            let modes = session.mode_line();
            if !modes.is_empty() {
                info!("{}", modes);
            }
            info!(
                memory_bytes = session.cache_memory_bytes(),
                "{}",
                session.cache_line()
            );
        }
        Err(SessionError::NoImages) => warn!("No images loaded"),
        Err(e) => error!("{}", e),
    }
}
