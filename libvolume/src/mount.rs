//! Host-wide Quobyte namespace mount.
//!
//! All volumes are reached through a single mount of the whole Quobyte
//! namespace at the driver's mount root. The daemon sets it up once at
//! startup; individual lifecycle requests never mount or unmount anything.

use std::io;
use std::path::Path;

use tracing::{debug, info, instrument};

/// Device prefix used by the Quobyte client in the mount table.
const QUOBYTE_DEVICE_PREFIX: &str = "quobyte";

/// Return `true` if `mounts` (in `/proc/mounts` format) lists a Quobyte mount
/// at `path`.
///
/// Format: `<device> <mountpoint> <fstype> <options> <dump> <pass>`.
pub fn has_quobyte_mount(mounts: &str, path: &Path) -> bool {
    mounts.lines().any(|line| {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(device), Some(mountpoint)) => {
                device.starts_with(QUOBYTE_DEVICE_PREFIX) && Path::new(mountpoint) == path
            }
            _ => false,
        }
    })
}

/// Return `true` if the Quobyte namespace is currently mounted at `path`.
///
/// An unreadable mount table counts as "not mounted".
pub async fn is_mounted(path: &Path) -> bool {
    match tokio::fs::read_to_string("/proc/mounts").await {
        Ok(mounts) => {
            let found = has_quobyte_mount(&mounts, path);
            if found {
                debug!(path = %path.display(), "found Quobyte mount point");
            }
            found
        }
        Err(e) => {
            debug!(error = %e, "cannot read /proc/mounts");
            false
        }
    }
}

/// Build the shell command that mounts the namespace served by `registry`
/// at `path`.
pub fn mount_command(options: &str, registry: &str, path: &Path) -> String {
    format!(
        "mount {options} -t quobyte {registry}/ {}",
        path.display()
    )
}

/// Mount the Quobyte namespace served by `registry` at `path`.
///
/// `options` is passed to `mount` verbatim (e.g. `-o user_xattr`). On a
/// non-zero exit the combined output of the command is returned as the error.
#[instrument]
pub async fn mount_namespace(options: &str, registry: &str, path: &Path) -> io::Result<()> {
    let cmd = mount_command(options, registry, path);
    info!(%cmd, "mounting Quobyte namespace");

    let output = tokio::process::Command::new("/bin/sh")
        .args(["-c", &cmd])
        .output()
        .await?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(io::Error::other(format!(
            "`{cmd}` exited with {}: {}",
            output.status,
            combined.trim()
        )));
    }
    Ok(())
}
