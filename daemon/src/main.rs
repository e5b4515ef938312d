mod config;
mod event;
mod logging;
mod paths;
mod platform;
mod process_matcher;
mod run;
mod window_minimizer;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::event::ControlEvent;
use crate::logging::TracingSink;
use crate::platform::{DesktopWindows, SystemProcesses};

#[tokio::main]
async fn main() {
    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path(std::env::args().nth(1));
    let mut config = match config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[config] Error: {e:#}");
            std::process::exit(1);
        }
    };

    // ── Logging ───────────────────────────────────────────────────────────────
    let log_path = paths::log_file_path(&config_path);
    let mut sink = match TracingSink::new(config.debug, &log_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[log] Error: {e:#}");
            std::process::exit(1);
        }
    };

    let mut processes = SystemProcesses::new();
    let mut windows = DesktopWindows;

    let Some(interval) = config.repeat_interval() else {
        run::run_pass(&config.targets, &mut processes, &mut windows, &mut sink);
        return;
    };

    // ── Repeat mode ───────────────────────────────────────────────────────────
    let (control_tx, mut control_rx) = mpsc::channel::<ControlEvent>(8);
    tokio::spawn(config::watch_config(config_path.clone(), control_tx.clone()));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = control_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(ControlEvent::Shutdown).await;
            }
        });
    }

    println!(
        "minimizer-daemon v{} repeating every {}s",
        env!("CARGO_PKG_VERSION"),
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run::run_pass(&config.targets, &mut processes, &mut windows, &mut sink);
            }
            Some(evt) = control_rx.recv() => match evt {
                ControlEvent::ConfigReloaded(new_config) => {
                    println!("Config reloaded ({} targets)", new_config.targets.len());
                    if new_config.debug != config.debug {
                        match TracingSink::new(new_config.debug, &log_path) {
                            Ok(s) => sink = s,
                            Err(e) => eprintln!("[log] Failed to reopen log (keeping previous): {e:#}"),
                        }
                    }
                    // Repeat mode was chosen at startup; removing the interval
                    // keeps the current one.
                    if let Some(new_interval) = new_config.repeat_interval() {
                        if Some(new_interval) != config.repeat_interval() {
                            ticker = tokio::time::interval(new_interval);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        }
                    }
                    config = new_config;
                }
                ControlEvent::Shutdown => {
                    println!("Shutting down");
                    break;
                }
            },
        }
    }
}
