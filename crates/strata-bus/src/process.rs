//! Plugin child-process supervision.
//!
//! Each configured plugin with a non-empty command gets one child process.
//! The child learns where to connect through its environment; its stdio is
//! line-tailed into the host log. An unexpected exit is logged but does NOT
//! tear down the session: the plugin may be restarted externally and
//! reconnect to the same session. The host never respawns on its own.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use strata_config::PluginConfig;

/// Environment variable carrying the plugin's configured id.
pub(crate) const ENV_PLUGIN_ID: &str = "PLUGIN_ID";
/// Environment variable carrying the normalized host address.
pub(crate) const ENV_SERVER_ADDRESS: &str = "PLUGIN_SERVER_ADDRESS";
/// Environment variable carrying the per-boot host identifier.
pub(crate) const ENV_BOOT_ID: &str = "HOST_BOOT_ID";

/// Spawn the child process for `cfg` and the tasks that tail its stdio and
/// await its exit. The child is killed when `cancel` fires (host shutdown).
///
/// # Errors
///
/// Returns the spawn error; callers log it and keep the session alive for a
/// plugin that connects by other means.
pub(crate) fn spawn(
    cfg: &PluginConfig,
    address: &str,
    boot_id: &str,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let mut cmd = Command::new(&cfg.command);
    cmd.args(&cfg.args);
    if !cfg.work_dir.path.is_empty() {
        cmd.current_dir(&cfg.work_dir.path);
    }
    cmd.env(ENV_PLUGIN_ID, &cfg.id);
    cmd.env(ENV_SERVER_ADDRESS, address);
    cmd.env(ENV_BOOT_ID, boot_id);
    for (key, value) in &cfg.env {
        cmd.env(key, value);
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn()?;
    info!(plugin_id = %cfg.id, command = %cfg.command, "launched plugin process");

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(tail_output(cfg.id.clone(), stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(tail_output(cfg.id.clone(), stderr));
    }

    let plugin_id = cfg.id.clone();
    tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if !status.success() => {
                    warn!(plugin_id = %plugin_id, %status, "plugin process exited");
                }
                Ok(_) => {
                    info!(plugin_id = %plugin_id, "plugin process exited cleanly");
                }
                Err(e) => {
                    warn!(plugin_id = %plugin_id, error = %e, "failed to await plugin process");
                }
            },
            () = cancel.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    });
    Ok(())
}

/// Forward a child stream into the host log, one line at a time.
async fn tail_output(plugin_id: String, stream: impl AsyncRead + Unpin + Send + 'static) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(plugin_id = %plugin_id, "{line}");
    }
}
