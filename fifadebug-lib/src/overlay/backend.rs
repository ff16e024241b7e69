use std::ffi::c_void;

use anyhow::Result;

/// View model for the debug-log pane drawn each frame.
pub struct LogPane<'a> {
    pub text: &'a str,
    /// Scroll to the newest entry; set on frames where the text grew.
    pub stick_to_bottom: bool,
}

/// What the user did with the pane's controls this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogPaneAction {
    Clear,
    CopyToClipboard,
}

/// The immediate-mode UI binding the dispatcher drives. Implementations own
/// the UI context and the device-dependent resources; the dispatcher only
/// guarantees call ordering across the host's device lifecycle:
///
/// * `init` / `init_device` after a successful device creation,
/// * `invalidate_device_objects` before the device reset runs and
///   `recreate_device_objects` after it,
/// * `begin_frame` / `draw_log` / `end_frame` / `submit` once per host frame,
/// * `shutdown_device` / `shutdown` before the device is torn down.
pub trait OverlayBackend {
    fn init(&mut self, window: *mut c_void) -> Result<()>;
    fn init_device(&mut self, device: *mut c_void) -> Result<()>;
    fn shutdown_device(&mut self);
    fn shutdown(&mut self);
    fn invalidate_device_objects(&mut self);
    fn recreate_device_objects(&mut self);
    fn begin_frame(&mut self);
    fn draw_log(&mut self, pane: &LogPane) -> Option<LogPaneAction>;
    fn end_frame(&mut self);
    fn submit(&mut self);
    /// First refusal on every host window message; `true` consumes it.
    fn handle_window_message(&mut self, msg: u32, wparam: usize, lparam: isize) -> bool;
}
