use clipboard_win::set_clipboard_string;
use tracing::debug;

/// Hands the exported log to the shared clipboard. Failures are dropped; the
/// clipboard is either replaced whole or left untouched.
pub fn copy_text(text: &str) {
    if text.is_empty() {
        return;
    }
    if let Err(err) = set_clipboard_string(text) {
        debug!("clipboard export failed: {}", err);
    }
}
