//! Locating and launching a debuggable Chromium-family browser.
//!
//! Launched browsers always get `--remote-debugging-port=0` plus a caller
//! -owned profile directory; the kernel-assigned port is read back from the
//! `DevToolsActivePort` file, so parallel probe browsers never collide.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use ak_runtime::{DevToolsInfo, fetch_devtools_info};
use tracing::debug;

use crate::error::{AkError, Result};

const STARTUP_POLL_ATTEMPTS: u32 = 40;
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(400);

/// Finds a Chromium-family executable on this machine.
pub fn find_browser_executable() -> Option<String> {
	let candidates: Vec<String> = if cfg!(target_os = "macos") {
		vec![
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else {
		vec![
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"brave-browser",
			"msedge",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	};

	for candidate in candidates {
		if candidate.starts_with('/') {
			if Path::new(&candidate).exists() {
				return Some(candidate);
			}
		} else if which::which(&candidate).is_ok() {
			return Some(candidate);
		}
	}

	None
}

/// Launches a browser with remote debugging and returns its DevTools info.
///
/// The process is detached from our process group; shutdown goes through
/// `Browser.close` on the CDP connection, not through killing the child.
pub async fn launch_browser(user_data_dir: &Path, headless: bool) -> Result<DevToolsInfo> {
	let browser_path = find_browser_executable().ok_or_else(|| {
		AkError::BrowserLaunch("could not find a Chrome/Chromium executable; install one or adjust PATH".to_string())
	})?;

	let mut args = vec![
		"--remote-debugging-port=0".to_string(),
		format!("--user-data-dir={}", user_data_dir.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
	];
	if headless {
		args.push("--headless=new".to_string());
	}

	let mut cmd = Command::new(&browser_path);
	cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

	#[cfg(unix)]
	std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

	let mut child = cmd
		.spawn()
		.map_err(|e| AkError::BrowserLaunch(format!("failed to launch {browser_path}: {e}")))?;
	debug!(target = "ak.launch", browser = %browser_path, headless, "browser spawned");

	let mut last_error = "DevTools endpoint not ready".to_string();
	for _ in 0..STARTUP_POLL_ATTEMPTS {
		tokio::time::sleep(STARTUP_POLL_INTERVAL).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(AkError::BrowserLaunch(format!(
				"browser exited before its debugging endpoint came up (status: {status})"
			)));
		}

		let Some(port) = read_devtools_port(user_data_dir) else {
			continue;
		};

		match fetch_devtools_info(port, DISCOVERY_TIMEOUT).await {
			Ok(info) => {
				debug!(target = "ak.launch", port, endpoint = %info.web_socket_debugger_url, "browser ready");
				return Ok(info);
			}
			Err(e) => last_error = e.to_string(),
		}
	}

	Err(AkError::BrowserLaunch(format!(
		"browser launched but its debugging endpoint never became available: {last_error}"
	)))
}

/// Reads the port Chromium assigned itself from the profile's
/// `DevToolsActivePort` file (first line).
fn read_devtools_port(user_data_dir: &Path) -> Option<u16> {
	let content = std::fs::read_to_string(user_data_dir.join("DevToolsActivePort")).ok()?;
	content.lines().next()?.trim().parse().ok()
}
