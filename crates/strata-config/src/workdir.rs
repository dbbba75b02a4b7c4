//! Work-dir resolution, including the remote-git mode.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Timeout for git operations while resolving work dirs.
const GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Resolve every plugin's work dir in place.
///
/// Git-enabled entries are cloned into `<tmp>/strata-plugins/<id>`; with
/// `persistent: true` an existing checkout is reused, otherwise it is removed
/// and cloned fresh, optionally at the pinned `version`. Plain relative paths
/// are lexically cleaned but not made absolute.
///
/// # Errors
///
/// Returns [`ConfigError::GitClone`] when a clone or checkout fails; such
/// failures are fatal at boot.
pub async fn resolve_work_dirs(cfg: &mut Config) -> ConfigResult<()> {
    for plugin in &mut cfg.plugins {
        if plugin.command.is_empty() || plugin.work_dir.path.is_empty() {
            continue;
        }

        if plugin.work_dir.git.enabled {
            let dest = std::env::temp_dir().join("strata-plugins").join(&plugin.id);
            let remote = plugin.work_dir.path.clone();

            let reuse = plugin.work_dir.git.persistent && dest.exists();
            if reuse {
                info!(plugin_id = %plugin.id, path = %dest.display(), "reusing persistent work dir");
            } else {
                if dest.exists() {
                    remove_all(&dest).map_err(|e| ConfigError::GitClone {
                        plugin_id: plugin.id.clone(),
                        message: format!("reset checkout: {e}"),
                    })?;
                }
                clone(&plugin.id, &remote, &dest).await?;
                if !plugin.work_dir.git.version.is_empty() {
                    checkout(&plugin.id, &dest, &plugin.work_dir.git.version).await?;
                }
            }

            plugin.work_dir.path = dest.to_string_lossy().into_owned();
        } else {
            plugin.work_dir.path = clean_path(Path::new(&plugin.work_dir.path))
                .to_string_lossy()
                .into_owned();
        }
    }
    Ok(())
}

async fn clone(plugin_id: &str, remote: &str, dest: &Path) -> ConfigResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
    }
    info!(plugin_id = %plugin_id, remote = %remote, "cloning remote work dir");
    let mut cmd = git_command(None);
    cmd.args(["clone", "--depth=1", remote]);
    cmd.arg(dest);
    run(plugin_id, cmd).await
}

async fn checkout(plugin_id: &str, dest: &Path, version: &str) -> ConfigResult<()> {
    let mut cmd = git_command(Some(dest));
    cmd.args(["checkout", "--detach", version]);
    run(plugin_id, cmd).await
}

/// Build a `git` command with a cleared environment so inherited variables
/// (`GIT_PROXY_COMMAND`, `GIT_CONFIG_GLOBAL`, ...) cannot execute arbitrary
/// code, and with interactive prompts suppressed so a clone needing
/// credentials fails fast instead of hanging boot.
fn git_command(dir: Option<&Path>) -> Command {
    let mut cmd = Command::new("git");
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
        cmd.env("HOME", home);
    }
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    cmd
}

async fn run(plugin_id: &str, mut cmd: Command) -> ConfigResult<()> {
    let output = tokio::time::timeout(GIT_TIMEOUT, cmd.output())
        .await
        .map_err(|_| ConfigError::GitClone {
            plugin_id: plugin_id.to_string(),
            message: format!("git timed out after {}s", GIT_TIMEOUT.as_secs()),
        })?
        .map_err(|e| ConfigError::GitClone {
            plugin_id: plugin_id.to_string(),
            message: format!("run git: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConfigError::GitClone {
            plugin_id: plugin_id.to_string(),
            message: format!("git failed: {}", stderr.trim()),
        });
    }
    Ok(())
}

/// Lexically clean a path: drop `.` components and fold `..` where possible.
/// Relative paths stay relative.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.last() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                _ => cleaned.push(component),
            },
            other => cleaned.push(other),
        }
    }
    if cleaned.is_empty() {
        PathBuf::from(".")
    } else {
        cleaned.iter().collect()
    }
}

/// Remove a stale checkout target, whether a directory or a stray file.
fn remove_all(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
