//! macOS launch agent that keeps `webnotes-agent run` alive.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::{Error, Result};

pub const LABEL: &str = "com.webnotes.client";

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Property list running `program` with `args` at login, restarted if it exits.
pub fn plist(program: &Path, args: &[String]) -> String {
    let arguments: String = std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .map(|arg| format!("        <string>{}</string>\n", escape(&arg)))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LABEL}</string>
    <key>ProgramArguments</key>
    <array>
{arguments}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
</dict>
</plist>
"#
    )
}

/// `~/Library/LaunchAgents/com.webnotes.client.plist`
pub fn plist_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Custom("could not determine the home directory".into()))?;
    Ok(home
        .join("Library")
        .join("LaunchAgents")
        .join(format!("{LABEL}.plist")))
}

/// Write the plist and (re)load it with `launchctl`.
pub fn install(args: &[String]) -> Result<PathBuf> {
    let program = std::env::current_exe()?;
    let path = plist_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, plist(&program, args))?;
    info!("wrote {}", path.display());

    // Unloading a job that was never loaded fails; that is fine.
    let unload = Command::new("launchctl").arg("unload").arg(&path).output()?;
    debug!("launchctl unload exited with {}", unload.status);

    let load = Command::new("launchctl").arg("load").arg(&path).output()?;
    if !load.status.success() {
        return Err(Error::Custom(format!(
            "launchctl load failed: {}",
            String::from_utf8_lossy(&load.stderr).trim()
        )));
    }
    info!("loaded launch agent {LABEL}");
    Ok(path)
}
