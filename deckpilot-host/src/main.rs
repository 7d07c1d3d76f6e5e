use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use deckpilot_host::cache::{CacheLimits, SlideCache};
use deckpilot_host::library::Library;
use deckpilot_host::link::{GatttoolCentral, LinkPolicy, LinkRunner};
use deckpilot_host::render::{OfficeConverter, RenderSize};
use deckpilot_host::surface::SnapshotSurface;
use deckpilot_host::{keyboard, logging, Cli, HostConfig, Runtime};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HostConfig::from_cli(&cli).context("invalid configuration")?;
    logging::init(&config.logging)?;

    info!(
        presentations = %config.presentations_dir.display(),
        device = %config.device.address,
        "deckpilot starting"
    );

    let target = config.link_target()?;
    fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("failed to create {}", config.work_dir.display()))?;

    let size = RenderSize {
        width: config.render.width,
        height: config.render.height,
    };
    let converter = OfficeConverter::new(&config.render, &config.work_dir);
    let cache = Arc::new(SlideCache::new(
        converter,
        size,
        CacheLimits::from(&config.cache),
    ));
    let surface = SnapshotSurface::new(
        &config.display.output_dir,
        size,
        config.display.start_fullscreen,
    )
    .context("failed to set up display output")?;

    let (tx, rx) = crossbeam_channel::unbounded();

    let central = GatttoolCentral::new(
        config.device.gatttool.clone(),
        Duration::from_millis(config.link.subscribe_timeout_ms),
    );
    let link = LinkRunner::spawn(central, target, LinkPolicy::from(&config.link), tx.clone())
        .context("failed to start link thread")?;
    if cli.no_keyboard {
        drop(tx);
    } else {
        // Blocked on stdin; never joined
        keyboard::spawn_stdin(tx).context("failed to start keyboard thread")?;
    }

    let mut runtime = Runtime::new(Library::new(&config.presentations_dir), cache, surface)
        .with_prefetch(config.cache.prefetch);
    runtime.run(&rx);

    runtime.shutdown();
    link.shutdown();
    info!("deckpilot stopped");
    Ok(())
}
