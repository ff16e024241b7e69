mod backend;

use std::ffi::c_void;

use tracing::warn;

use crate::message::MessageLog;
pub use backend::{LogPane, LogPaneAction, OverlayBackend};

/// Where the overlay sits in the host's device lifecycle. The host drives
/// every transition through the four intercepted entry points; nothing here
/// runs on its own schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    DeviceReady,
    Rendering,
    Invalidated,
}

/// The lifecycle dispatcher: brackets the host's device create/reset/render/
/// destroy calls with overlay setup, per-frame drawing and teardown. Purely
/// additive: a backend failure is absorbed and traced, never surfaced to the
/// host.
pub struct Overlay<B> {
    backend: B,
    state: LifecycleState,
    pane_len: usize,
}

impl<B: OverlayBackend> Overlay<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: LifecycleState::Uninitialized,
            pane_len: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Device creation succeeded in the host; bind the backend to the window
    /// and the fresh device. On a backend failure the overlay simply stays
    /// down until the next successful create.
    pub fn on_device_created(&mut self, window: *mut c_void, device: *mut c_void) {
        if self.state != LifecycleState::Uninitialized {
            return;
        }
        if let Err(err) = self.backend.init(window) {
            warn!("overlay window binding failed: {err}");
            return;
        }
        if let Err(err) = self.backend.init_device(device) {
            warn!("overlay device binding failed: {err}");
            self.backend.shutdown();
            return;
        }
        self.pane_len = 0;
        self.state = LifecycleState::DeviceReady;
    }

    /// The host is about to reset the device; device-dependent resources must
    /// be released before the reset call runs.
    pub fn on_reset_begin(&mut self) {
        if !matches!(
            self.state,
            LifecycleState::DeviceReady | LifecycleState::Rendering
        ) {
            return;
        }
        self.backend.invalidate_device_objects();
        self.state = LifecycleState::Invalidated;
    }

    /// The host's reset call returned. Resources are recreated whether or not
    /// the reset reported success; see DESIGN.md.
    pub fn on_reset_end(&mut self) {
        if self.state != LifecycleState::Invalidated {
            return;
        }
        self.backend.recreate_device_objects();
        self.state = LifecycleState::DeviceReady;
    }

    /// Produce one overlay frame. Returns the pane action for the caller to
    /// route; outside `DeviceReady`/`Rendering` the frame is skipped entirely.
    pub fn on_frame(&mut self, log: &MessageLog) -> Option<LogPaneAction> {
        if !matches!(
            self.state,
            LifecycleState::DeviceReady | LifecycleState::Rendering
        ) {
            return None;
        }
        self.state = LifecycleState::Rendering;
        self.backend.begin_frame();
        let text = log.export();
        let stick_to_bottom = text.len() != self.pane_len;
        self.pane_len = text.len();
        let action = self.backend.draw_log(&LogPane {
            text: &text,
            stick_to_bottom,
        });
        self.backend.end_frame();
        self.backend.submit();
        action
    }

    /// The host is about to destroy the device; tear everything down first.
    /// Safe to call twice, some builds reach their teardown from two sites.
    pub fn on_device_destroyed(&mut self) {
        if self.state == LifecycleState::Uninitialized {
            return;
        }
        self.backend.shutdown_device();
        self.backend.shutdown();
        self.state = LifecycleState::Uninitialized;
    }

    /// First refusal on a host window message; unhandled messages go back to
    /// the original window procedure.
    pub fn handle_window_message(&mut self, msg: u32, wparam: usize, lparam: isize) -> bool {
        if self.state == LifecycleState::Uninitialized {
            return false;
        }
        self.backend.handle_window_message(msg, wparam, lparam)
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use anyhow::bail;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Call {
        Init,
        InitDevice,
        ShutdownDevice,
        Shutdown,
        Invalidate,
        Recreate,
        BeginFrame,
        DrawLog,
        EndFrame,
        Submit,
        HostResetRan,
    }

    /// Records every backend call; failure points and pane actions are
    /// scripted per test.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<Call>,
        fail_init: bool,
        fail_init_device: bool,
        next_action: Option<LogPaneAction>,
        last_pane_text: String,
        last_stick: bool,
    }

    impl OverlayBackend for RecordingBackend {
        fn init(&mut self, _window: *mut c_void) -> anyhow::Result<()> {
            self.calls.push(Call::Init);
            if self.fail_init {
                bail!("window binding rejected");
            }
            Ok(())
        }

        fn init_device(&mut self, _device: *mut c_void) -> anyhow::Result<()> {
            self.calls.push(Call::InitDevice);
            if self.fail_init_device {
                bail!("device binding rejected");
            }
            Ok(())
        }

        fn shutdown_device(&mut self) {
            self.calls.push(Call::ShutdownDevice);
        }

        fn shutdown(&mut self) {
            self.calls.push(Call::Shutdown);
        }

        fn invalidate_device_objects(&mut self) {
            self.calls.push(Call::Invalidate);
        }

        fn recreate_device_objects(&mut self) {
            self.calls.push(Call::Recreate);
        }

        fn begin_frame(&mut self) {
            self.calls.push(Call::BeginFrame);
        }

        fn draw_log(&mut self, pane: &LogPane) -> Option<LogPaneAction> {
            self.calls.push(Call::DrawLog);
            self.last_pane_text = pane.text.to_owned();
            self.last_stick = pane.stick_to_bottom;
            self.next_action.take()
        }

        fn end_frame(&mut self) {
            self.calls.push(Call::EndFrame);
        }

        fn submit(&mut self) {
            self.calls.push(Call::Submit);
        }

        fn handle_window_message(&mut self, msg: u32, _wparam: usize, _lparam: isize) -> bool {
            msg == 0x0100
        }
    }

    fn ready_overlay() -> Overlay<RecordingBackend> {
        let mut overlay = Overlay::new(RecordingBackend::default());
        overlay.on_device_created(ptr::null_mut(), ptr::null_mut());
        assert_eq!(overlay.state(), LifecycleState::DeviceReady);
        overlay.backend.calls.clear();
        overlay
    }

    #[test]
    fn create_binds_window_then_device() {
        let mut overlay = Overlay::new(RecordingBackend::default());
        overlay.on_device_created(ptr::null_mut(), ptr::null_mut());
        assert_eq!(overlay.backend.calls, [Call::Init, Call::InitDevice]);
        assert_eq!(overlay.state(), LifecycleState::DeviceReady);
    }

    #[test]
    fn failed_window_binding_leaves_the_overlay_down() {
        let mut overlay = Overlay::new(RecordingBackend {
            fail_init: true,
            ..Default::default()
        });
        overlay.on_device_created(ptr::null_mut(), ptr::null_mut());
        assert_eq!(overlay.backend.calls, [Call::Init]);
        assert_eq!(overlay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn failed_device_binding_unwinds_the_window_binding() {
        let mut overlay = Overlay::new(RecordingBackend {
            fail_init_device: true,
            ..Default::default()
        });
        overlay.on_device_created(ptr::null_mut(), ptr::null_mut());
        assert_eq!(
            overlay.backend.calls,
            [Call::Init, Call::InitDevice, Call::Shutdown]
        );
        assert_eq!(overlay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn reset_invalidates_before_and_recreates_after_the_host_call() {
        let mut overlay = ready_overlay();
        overlay.on_reset_begin();
        overlay.backend.calls.push(Call::HostResetRan);
        overlay.on_reset_end();
        assert_eq!(
            overlay.backend.calls,
            [Call::Invalidate, Call::HostResetRan, Call::Recreate]
        );
        assert_eq!(overlay.state(), LifecycleState::DeviceReady);
    }

    #[test]
    fn recreate_runs_even_when_the_host_reset_failed() {
        // the host's failure is invisible here on purpose: on_reset_end is
        // unconditional, mirroring the intercepted call flow
        let mut overlay = ready_overlay();
        overlay.on_reset_begin();
        assert_eq!(overlay.state(), LifecycleState::Invalidated);
        overlay.on_reset_end();
        assert_eq!(overlay.backend.calls, [Call::Invalidate, Call::Recreate]);
        assert_eq!(overlay.state(), LifecycleState::DeviceReady);
    }

    #[test]
    fn frames_run_the_full_backend_sequence() {
        let mut overlay = ready_overlay();
        let log = MessageLog::new();
        assert_eq!(overlay.on_frame(&log), None);
        assert_eq!(
            overlay.backend.calls,
            [Call::BeginFrame, Call::DrawLog, Call::EndFrame, Call::Submit]
        );
        assert_eq!(overlay.state(), LifecycleState::Rendering);
    }

    #[test]
    fn frames_are_skipped_until_a_device_exists() {
        let mut overlay = Overlay::new(RecordingBackend::default());
        let log = MessageLog::new();
        assert_eq!(overlay.on_frame(&log), None);
        assert!(overlay.backend.calls.is_empty());
        assert_eq!(overlay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn frames_are_skipped_while_the_device_is_invalidated() {
        let mut overlay = ready_overlay();
        overlay.on_reset_begin();
        overlay.backend.calls.clear();
        assert_eq!(overlay.on_frame(&MessageLog::new()), None);
        assert!(overlay.backend.calls.is_empty());
    }

    #[test]
    fn pane_text_mirrors_the_log_and_tracks_growth() {
        let mut overlay = ready_overlay();
        let mut log = MessageLog::new();
        log.append("first");
        overlay.on_frame(&log);
        assert_eq!(overlay.backend.last_pane_text, "first");
        assert!(overlay.backend.last_stick);

        overlay.on_frame(&log);
        assert!(!overlay.backend.last_stick);

        log.append("second");
        overlay.on_frame(&log);
        assert_eq!(overlay.backend.last_pane_text, "firstsecond");
        assert!(overlay.backend.last_stick);
    }

    #[test]
    fn pane_actions_are_handed_back_to_the_caller() {
        let mut overlay = ready_overlay();
        overlay.backend.next_action = Some(LogPaneAction::Clear);
        assert_eq!(
            overlay.on_frame(&MessageLog::new()),
            Some(LogPaneAction::Clear)
        );
    }

    #[test]
    fn destroy_tears_down_device_objects_first() {
        let mut overlay = ready_overlay();
        overlay.on_device_destroyed();
        assert_eq!(
            overlay.backend.calls,
            [Call::ShutdownDevice, Call::Shutdown]
        );
        assert_eq!(overlay.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn second_destroy_site_is_a_no_op() {
        let mut overlay = ready_overlay();
        overlay.on_device_destroyed();
        overlay.backend.calls.clear();
        overlay.on_device_destroyed();
        assert!(overlay.backend.calls.is_empty());
    }

    #[test]
    fn destroy_then_create_reinitializes_from_scratch() {
        let mut overlay = ready_overlay();
        overlay.on_frame(&MessageLog::new());
        overlay.on_device_destroyed();
        overlay.backend.calls.clear();

        overlay.on_device_created(ptr::null_mut(), ptr::null_mut());
        assert_eq!(overlay.backend.calls, [Call::Init, Call::InitDevice]);
        assert_eq!(overlay.state(), LifecycleState::DeviceReady);
    }

    #[test]
    fn window_messages_reach_the_backend_only_after_init() {
        let mut overlay = Overlay::new(RecordingBackend::default());
        assert!(!overlay.handle_window_message(0x0100, 0, 0));

        overlay.on_device_created(ptr::null_mut(), ptr::null_mut());
        assert!(overlay.handle_window_message(0x0100, 0, 0));
        assert!(!overlay.handle_window_message(0x0200, 0, 0));
    }
}
