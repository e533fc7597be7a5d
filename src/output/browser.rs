use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

/// Opens `path` with the platform's default handler.
///
/// Best effort: a missing handler or a failed spawn is logged at debug level
/// and otherwise ignored.
pub fn open_in_browser(path: &Path) {
    let mut command = opener_command(path);
    match command.stdout(Stdio::null()).stderr(Stdio::null()).spawn() {
        Ok(_) => debug!("Opened {} in the default browser", path.display()),
        Err(e) => debug!("Could not open {}: {e}", path.display()),
    }
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("cmd");
    // The empty string is the window title `start` expects before a quoted path.
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}
