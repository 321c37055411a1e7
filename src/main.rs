//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Load `.env` files (working directory, then the config directory).
//! 2. Initialise logging.
//! 3. Load [`AppConfig`] from disk (returns default on first run) and apply
//!    environment overrides.  A missing `settings.toml` is created from the
//!    defaults.
//! 4. Resolve the hotkey bindings.
//! 5. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 6. Build the services: text source, generator, key sink, relay.
//! 7. Spawn the hotkey listener thread.
//! 8. Run the orchestrator until Ctrl+C, then stop any typing job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

use autotypist::{
    config::{AppConfig, AppPaths, InputSource},
    hotkey::{ControlSignal, HotkeyBindings, HotkeyListener},
    inject::{ClipboardSource, EnigoSinkFactory, SelectionSource, TextSource},
    llm::ApiGenerator,
    pipeline::{new_shared_state, Orchestrator, Services},
    relay::{Relay, TelegramRelay},
};

fn main() -> anyhow::Result<()> {
    // 1. Secrets from .env
    let paths = AppPaths::new();
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(&paths.env_file);

    // 2. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("autotypist starting up");

    // 3. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        let mut config = AppConfig::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    });

    // First run: leave a template next to the .env file.  Written from the
    // defaults so secrets picked up from the environment never land on disk.
    if !paths.settings_file.exists() {
        match AppConfig::default().save() {
            Ok(()) => log::info!("Wrote default settings to {}", paths.settings_file.display()),
            Err(e) => log::warn!("Cannot write default settings: {e}"),
        }
    }

    if config.llm.api_key.is_none() {
        log::warn!("No LLM API key found; set LLM_API_KEY or DEEPSEEK_API_KEY");
    }

    // 4. Hotkeys
    let bindings =
        HotkeyBindings::from_config(&config.hotkey).context("invalid [hotkey] configuration")?;

    // 5. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 6. Services
    let source: Arc<dyn TextSource> = match config.input.source {
        InputSource::Clipboard => Arc::new(ClipboardSource),
        InputSource::Selection => Arc::new(SelectionSource::default()),
    };

    let relay: Option<Arc<dyn Relay>> = if config.relay.is_usable() {
        match TelegramRelay::from_config(&config.relay) {
            Ok(relay) => Some(Arc::new(relay) as Arc<dyn Relay>),
            Err(e) => {
                log::warn!("Relay disabled: {e}");
                None
            }
        }
    } else {
        if config.relay.enabled == Some(true) {
            log::warn!("Relay enabled but TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID are missing");
        }
        None
    };

    let services = Services {
        source,
        provider: Arc::new(ApiGenerator::from_config(&config.llm)),
        sinks: Arc::new(EnigoSinkFactory),
        relay,
        relay_source: Arc::new(SelectionSource::default()),
    };

    let state = new_shared_state(config.clone());
    let orchestrator = Orchestrator::new(&config, Arc::clone(&state), services);
    let player = orchestrator.player();

    // 7. Hotkey listener thread
    let (signal_tx, signal_rx) = mpsc::channel::<ControlSignal>(16);
    let _hotkey_listener =
        HotkeyListener::start(bindings, signal_tx).context("failed to start hotkey listener")?;

    log::info!(
        "Ready: {} = start, {} = pause/resume, {} = cancel{}",
        config.hotkey.start_key,
        config.hotkey.pause_key,
        config.hotkey.cancel_key,
        if config.relay.is_usable() {
            format!(", {} = relay selection", config.hotkey.relay_key)
        } else {
            String::new()
        }
    );

    // 8. Run until Ctrl+C
    rt.block_on(async {
        tokio::select! {
            _ = orchestrator.run(signal_rx) => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    log::error!("Cannot listen for Ctrl+C: {e}");
                }
                log::info!("Shutting down");
            }
        }
    });

    if player.cancel() {
        player.wait(Duration::from_secs(1));
    }
    let last = state
        .lock()
        .map(|st| st.pipeline.label())
        .unwrap_or("unknown");
    log::info!("autotypist stopped (last state: {last})");
    Ok(())
}
