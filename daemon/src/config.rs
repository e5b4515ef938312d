use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::event::ControlEvent;

pub const MIN_REPEAT_INTERVAL_SECS: u64 = 1;
pub const MAX_REPEAT_INTERVAL_SECS: u64 = 86_400;

/// Root configuration structure. Deserialized from %APPDATA%\Minimizer\config.toml.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Enables verbose events (skipped system processes, per-window state reads).
    #[serde(default)]
    pub debug: bool,
    /// Executable paths whose windows should be minimized. Compared
    /// case-insensitively with `/` and `\` treated alike.
    #[serde(default)]
    pub targets: Vec<String>,
    /// When set, a pass runs every this many seconds instead of once.
    /// Clamped to [1, 86400].
    pub repeat_interval_secs: Option<u64>,
}

impl Config {
    /// Returns the clamped repeat interval, or `None` for a single pass.
    pub fn repeat_interval(&self) -> Option<Duration> {
        self.repeat_interval_secs.map(|secs| {
            Duration::from_secs(secs.clamp(MIN_REPEAT_INTERVAL_SECS, MAX_REPEAT_INTERVAL_SECS))
        })
    }
}

/// Loads the config file at `path`.
/// Unlike the optional settings inside it, the file itself is required: a
/// missing or unparsable file is an error.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Splits `path` into the directory to watch and the file name to look for.
///
/// notify reports absolute event paths, so a relative path (e.g. a config
/// name given on the command line) is resolved against the working directory
/// first. Events are then matched by file name only, which also holds when the
/// OS reports the directory under a different spelling.
fn watch_target(path: &Path) -> std::io::Result<(PathBuf, OsString)> {
    let absolute = std::path::absolute(path)?;
    let name = absolute.file_name().map(OsStr::to_os_string);
    let dir = absolute.parent().map(Path::to_path_buf);
    match (dir, name) {
        (Some(dir), Some(name)) => Ok((dir, name)),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("config path has no parent directory: {}", path.display()),
        )),
    }
}

/// True when `event` creates or modifies a file called `config_name`.
fn is_config_write(event: &notify::Event, config_name: &OsStr) -> bool {
    let is_write = matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_)
    );
    is_write && event.paths.iter().any(|p| p.file_name() == Some(config_name))
}

/// Watches the directory holding the config file (repeat mode only). Whenever
/// the file is created or modified it is reloaded and sent as
/// `ControlEvent::ConfigReloaded`; a file that fails to load leaves the
/// previous config in effect.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<ControlEvent>) {
    let (watch_dir, config_name) = match watch_target(&path) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("[config] Cannot watch {}: {e}", path.display());
            return;
        }
    };
    let config_path = watch_dir.join(&config_name);

    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);
    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[config] Failed to create file watcher: {e}");
            return;
        }
    };

    // Watching the directory also catches saves that replace the file by rename.
    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        eprintln!("[config] Failed to watch {}: {e}", watch_dir.display());
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        if !is_config_write(&event, &config_name) {
            continue;
        }
        match load(&config_path) {
            Ok(config) => {
                if tx.send(ControlEvent::ConfigReloaded(config)).await.is_err() {
                    break;
                }
            }
            Err(e) => eprintln!("[config] Failed to reload config (keeping previous): {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn config_default_values() {
        let c = Config::default();
        assert!(!c.debug);
        assert!(c.targets.is_empty());
        assert!(c.repeat_interval().is_none());
    }

    // ── repeat_interval ───────────────────────────────────────────────────────

    #[test]
    fn repeat_interval_passes_through_in_range() {
        let c = Config { repeat_interval_secs: Some(30), ..Config::default() };
        assert_eq!(c.repeat_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn repeat_interval_clamps_zero_to_min() {
        let c = Config { repeat_interval_secs: Some(0), ..Config::default() };
        assert_eq!(c.repeat_interval(), Some(Duration::from_secs(MIN_REPEAT_INTERVAL_SECS)));
    }

    #[test]
    fn repeat_interval_clamps_above_max() {
        let c = Config { repeat_interval_secs: Some(u64::MAX), ..Config::default() };
        assert_eq!(c.repeat_interval(), Some(Duration::from_secs(MAX_REPEAT_INTERVAL_SECS)));
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nonexistent.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }

    #[test]
    fn load_parses_valid_toml() {
        let (_dir, path) = write_config(
            r#"
debug = true
targets = ['C:\App\app.exe', "D:/Tools/tool.exe"]
repeat_interval_secs = 60
"#,
        );

        let config = load(&path).unwrap();
        assert!(config.debug);
        assert_eq!(config.targets, vec![r"C:\App\app.exe", "D:/Tools/tool.exe"]);
        assert_eq!(config.repeat_interval_secs, Some(60));
    }

    #[test]
    fn load_empty_file_uses_field_defaults() {
        let (_dir, path) = write_config("");
        assert_eq!(load(&path).unwrap(), Config::default());
    }

    #[test]
    fn load_keeps_duplicate_targets_in_order() {
        let (_dir, path) = write_config("targets = ['a.exe', 'b.exe', 'a.exe']\n");
        let config = load(&path).unwrap();
        assert_eq!(config.targets, vec!["a.exe", "b.exe", "a.exe"]);
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let (_dir, path) = write_config("this is not valid toml ][[[");
        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn load_wrong_type_returns_error() {
        let (_dir, path) = write_config("targets = 'C:\\\\single.exe'\n");
        assert!(load(&path).is_err());
    }

    // ── watch_config ──────────────────────────────────────────────────────────

    fn modify_event(path: &Path) -> notify::Event {
        notify::Event::new(notify::EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(path.to_path_buf())
    }

    #[test]
    fn watch_target_resolves_relative_path_against_cwd() {
        let (dir, name) = watch_target(Path::new("config.toml")).unwrap();
        assert_eq!(dir, std::env::current_dir().unwrap());
        assert_eq!(name, "config.toml");
    }

    #[test]
    fn watch_target_keeps_absolute_path() {
        let tmp = tempfile::tempdir().unwrap();
        let (dir, name) = watch_target(&tmp.path().join("settings.toml")).unwrap();
        assert_eq!(dir, tmp.path());
        assert_eq!(name, "settings.toml");
    }

    #[test]
    fn absolute_event_matches_relative_config_name() {
        let (dir, name) = watch_target(Path::new("config.toml")).unwrap();
        assert!(is_config_write(&modify_event(&dir.join("config.toml")), &name));
    }

    #[test]
    fn other_files_and_removals_are_ignored() {
        let name = OsString::from("config.toml");
        assert!(!is_config_write(&modify_event(Path::new("/x/other.toml")), &name));
        let removed = notify::Event::new(notify::EventKind::Remove(notify::event::RemoveKind::Any))
            .add_path(PathBuf::from("/x/config.toml"));
        assert!(!is_config_write(&removed, &name));
    }

    #[tokio::test]
    async fn watch_config_sends_reloaded_config() {
        let (dir, path) = write_config("targets = ['a.exe']\n");
        let (tx, mut rx) = mpsc::channel::<ControlEvent>(8);
        let watcher = tokio::spawn(watch_config(path.clone(), tx));

        // Keep rewriting until the watcher is up and reports the change.
        let reloaded = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                std::fs::write(&path, "targets = ['b.exe']\n").unwrap();
                match tokio::time::timeout(Duration::from_millis(250), rx.recv()).await {
                    Ok(Some(ControlEvent::ConfigReloaded(config))) => return config,
                    Ok(Some(ControlEvent::Shutdown)) | Ok(None) | Err(_) => continue,
                }
            }
        })
        .await
        .expect("config reload was not reported");

        assert_eq!(reloaded.targets, vec!["b.exe"]);
        watcher.abort();
        drop(dir);
    }
}
