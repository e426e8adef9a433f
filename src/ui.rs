// UI layer: terminal setup, colored notices, a spinner for blocking calls
// and the "press Enter to continue" pause between operations.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType, SetTitle},
};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, stderr, stdout, Write};
use std::time::Duration;

const BACKGROUND: Color = Color::DarkMagenta;

/// Title the terminal, paint the background, clear the screen and hide the
/// cursor. Failures are ignored: output still works on terminals that do
/// not support it.
pub fn console_setup() {
    let _ = console_setup_to(&mut stdout());
}

fn console_setup_to<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(
        out,
        SetTitle("kaltura-ingest"),
        SetBackgroundColor(BACKGROUND),
        Clear(ClearType::All),
        Hide
    )?;
    out.flush()
}

/// Undo `console_setup` before the process exits.
pub fn console_restore() {
    let _ = execute!(stdout(), ResetColor, Show);
}

/// Print a notice in cyan.
pub fn notice(message: &str) {
    let _ = execute!(
        stdout(),
        SetForegroundColor(Color::Cyan),
        Print(message),
        SetForegroundColor(Color::Reset),
        Print("\n")
    );
}

/// Print an error in red on stderr.
pub fn error(message: &str) {
    let _ = execute!(
        stderr(),
        SetForegroundColor(Color::Red),
        Print(message),
        SetForegroundColor(Color::Reset),
        Print("\n")
    );
}

/// Run `work` while a spinner shows `message`.
pub fn with_spinner<T>(message: &str, work: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = work();
    spinner.finish_and_clear();
    out
}

/// Block until the user presses Enter.
pub fn pause() -> Result<()> {
    let _: String = Input::new()
        .with_prompt("Press Enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}
