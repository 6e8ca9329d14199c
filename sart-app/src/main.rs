mod app;
mod bridge;
mod cli;

use anyhow::{Context, Result, anyhow};
use app::{App, RenderSetup};
use bridge::{ChannelInput, UserEvent, WindowDisplay};
use clap::Parser;
use cli::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sart_core::SartPhase;
use sart_experiment::{AbortSignal, ExperimentStateMachine, JsonLinesSink, SartError, SessionInfo};
use sart_timing::HighPrecisionTimer;
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.session_config()?;
    let target = config.target()?;
    let session = SessionInfo::new(
        args.participant.clone(),
        args.session,
        target,
        chrono::Local::now(),
    );
    tracing::info!(
        participant = %session.participant,
        session = %session.session,
        target = %target,
        platform = std::env::consts::OS,
        "starting SART"
    );

    let font_data = std::fs::read(&config.font_path)
        .with_context(|| format!("cannot read font {}", config.font_path.display()))?;
    let data_path = config.data_dir.join(session.data_file_name());
    let sink = JsonLinesSink::create(&data_path, session)
        .with_context(|| format!("cannot open data file {}", data_path.display()))?;

    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    let timer = HighPrecisionTimer::new();
    let abort = AbortSignal::new();
    let (keys, key_events) = mpsc::channel();

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let setup = RenderSetup {
        font_data,
        digit_heights: config.digit_heights.clone(),
        target,
        screens_dir: config.screens_dir.clone(),
        windowed: args.windowed,
    };
    let mut machine = ExperimentStateMachine::<SartPhase, _, _, _, _, _>::new(
        config,
        timer.clone(),
        WindowDisplay::new(event_loop.create_proxy()),
        ChannelInput::new(key_events, timer.clone(), abort.clone()),
        sink,
        rng,
        abort.clone(),
    )?;

    let mut app = App::new(
        setup,
        timer,
        keys,
        abort.clone(),
        event_loop.create_proxy(),
        Box::new(move || machine.run()),
    );
    event_loop.run_app(&mut app)?;

    let handle = app.into_engine()?;
    let result = handle
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;

    match result {
        Ok(report) => {
            for block in &report.blocks {
                tracing::info!(
                    kind = ?block.kind,
                    trials = block.trials,
                    go_accuracy = block.go_accuracy,
                    nogo_accuracy = block.nogo_accuracy,
                    mean_rt_ms = block.mean_reaction_time.as_secs_f64() * 1e3,
                    "block summary"
                );
            }
            tracing::info!(path = %data_path.display(), "session saved");
            Ok(())
        }
        Err(SartError::Aborted) => {
            tracing::warn!(path = %data_path.display(), "session aborted, partial data saved");
            Ok(())
        }
        // Closing the window tears the channels down under the engine.
        Err(e) if abort.is_raised() => {
            tracing::warn!(path = %data_path.display(), "session aborted: {e}");
            Ok(())
        }
        Err(e) => Err(e).context("session failed"),
    }
}
