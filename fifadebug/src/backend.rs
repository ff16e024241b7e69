use std::ffi::c_void;

use anyhow::Result;
use fifadebug_lib::overlay::{LogPane, LogPaneAction, OverlayBackend};

/// Backend used when no UI binding is linked in: the dispatcher still runs
/// the full device lifecycle, nothing is drawn and no input is consumed.
#[derive(Default)]
pub struct HeadlessBackend;

impl OverlayBackend for HeadlessBackend {
    fn init(&mut self, _window: *mut c_void) -> Result<()> {
        Ok(())
    }

    fn init_device(&mut self, _device: *mut c_void) -> Result<()> {
        Ok(())
    }

    fn shutdown_device(&mut self) {}

    fn shutdown(&mut self) {}

    fn invalidate_device_objects(&mut self) {}

    fn recreate_device_objects(&mut self) {}

    fn begin_frame(&mut self) {}

    fn draw_log(&mut self, _pane: &LogPane) -> Option<LogPaneAction> {
        None
    }

    fn end_frame(&mut self) {}

    fn submit(&mut self) {}

    fn handle_window_message(&mut self, _msg: u32, _wparam: usize, _lparam: isize) -> bool {
        false
    }
}
