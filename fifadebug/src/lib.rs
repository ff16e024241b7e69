#![cfg(windows)]

mod backend;
mod clipboard;
mod config;
mod hooks;
mod tracing_helper;

use std::ffi::{c_char, c_void, CStr};

use fifadebug_lib::{
    message::{is_dlc_update_notice, MessageFlag, MessageLog, StagingBuffer, STAGING_CAPACITY},
    overlay::{LogPaneAction, Overlay},
    Fifa,
};
use flagset::FlagSet;
use tracing::{info, warn};
use windows::Win32::{
    Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
    System::{Console::AllocConsole, SystemServices::DLL_PROCESS_ATTACH},
};

use crate::{
    backend::HeadlessBackend,
    config::{to_dll_path, SettingsRepo},
    hooks::{OriginalFns, Replacements},
};

extern "C" {
    fn _snprintf(buffer: *mut c_char, count: usize, format: *const c_char, ...) -> i32;
}

/// Everything the hook bodies touch, created once during attach. One instance
/// per process; every callback threads it through explicitly after fetching
/// it from the slot below.
struct Context {
    originals: OriginalFns,
    flags: FlagSet<MessageFlag>,
    fifa: Fifa,
    overlay: Overlay<HeadlessBackend>,
    log: MessageLog,
    staging: StagingBuffer,
}

static mut CONTEXT: Option<Context> = None;

fn context_mut() -> &'static mut Context {
    unsafe { CONTEXT.as_mut().unwrap() }
}

extern "cdecl" fn on_device_create(init_params: *mut c_void) -> bool {
    let ctx = context_mut();
    let created = (ctx.originals.device_create)(init_params);
    if created {
        match ctx.fifa.device_pointer() {
            Ok(device) => {
                let window = unsafe { Fifa::window_from_creation_params(init_params) };
                ctx.overlay
                    .on_device_created(window.0 as *mut c_void, device);
            }
            Err(err) => warn!("device lookup failed: {}", err),
        }
    }
    created
}

extern "thiscall" fn on_device_destroy(this: *mut c_void) -> *mut c_void {
    let ctx = context_mut();
    ctx.overlay.on_device_destroyed();

    let Some(original) = ctx.originals.device_destroy else {
        return std::ptr::null_mut();
    };
    original(this)
}

extern "thiscall" fn on_device_reset(this: *mut c_void) -> bool {
    let ctx = context_mut();
    ctx.overlay.on_reset_begin();
    let result = (ctx.originals.device_reset)(this);
    ctx.overlay.on_reset_end();
    result
}

extern "thiscall" fn on_render(this: *mut c_void, flip: bool) -> bool {
    let ctx = context_mut();
    match ctx.overlay.on_frame(&ctx.log) {
        Some(LogPaneAction::Clear) => ctx.log.clear(),
        Some(LogPaneAction::CopyToClipboard) => clipboard::copy_text(&ctx.log.export()),
        None => {}
    }
    (ctx.originals.render)(this, flip)
}

extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let ctx = context_mut();
    if ctx.overlay.handle_window_message(msg, wparam.0, lparam.0) {
        return LRESULT(1);
    }
    (ctx.originals.wnd_proc)(hwnd, msg, wparam, lparam)
}

/// Formats an intercepted message into the staging buffer and appends it.
/// Only the first eight argument words survive the redirection; formats
/// consuming more would read past what the caller pushed.
unsafe fn capture_formatted(ctx: &mut Context, format: *const c_char, args: [usize; 8]) {
    if format.is_null() {
        return;
    }
    let written = _snprintf(
        ctx.staging.as_mut_ptr().cast(),
        STAGING_CAPACITY - 1,
        format,
        args[0],
        args[1],
        args[2],
        args[3],
        args[4],
        args[5],
        args[6],
        args[7],
    );
    ctx.staging.mark_written(written as isize);
    let message = ctx.staging.message().into_owned();
    ctx.log.append(message);
}

unsafe extern "C" fn on_printf(
    format: *const c_char,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
    a7: usize,
    a8: usize,
) {
    capture_formatted(context_mut(), format, [a1, a2, a3, a4, a5, a6, a7, a8]);
}

unsafe extern "C" fn on_dlc_log(
    format: *const c_char,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
    a7: usize,
    a8: usize,
) {
    if format.is_null() || is_dlc_update_notice(CStr::from_ptr(format).to_bytes()) {
        return;
    }
    capture_formatted(context_mut(), format, [a1, a2, a3, a4, a5, a6, a7, a8]);
}

unsafe extern "C" fn on_ugc_log(
    format: *const c_char,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
    a7: usize,
    a8: usize,
) {
    capture_formatted(context_mut(), format, [a1, a2, a3, a4, a5, a6, a7, a8]);
}

unsafe extern "C" fn on_mode_log(
    _category: i32,
    format: *const c_char,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
    a7: usize,
    a8: usize,
) {
    capture_formatted(context_mut(), format, [a1, a2, a3, a4, a5, a6, a7, a8]);
}

unsafe extern "system" fn on_output_debug_string(message: *const c_char) {
    if message.is_null() {
        return;
    }
    let message = CStr::from_ptr(message).to_string_lossy().into_owned();
    context_mut().log.append(message);
}

/// Shared log entry point for other injected modules; active only when the
/// `user` source is configured.
#[no_mangle]
pub unsafe extern "C" fn DebugPrint(message: *const c_char) {
    if message.is_null() {
        return;
    }
    let Some(ctx) = CONTEXT.as_mut() else {
        return;
    };
    if !ctx.flags.contains(MessageFlag::User) {
        return;
    }
    ctx.log
        .append(CStr::from_ptr(message).to_string_lossy().into_owned());
}

#[no_mangle]
pub extern "stdcall" fn DllMain(inst_dll: HINSTANCE, reason: u32, _reserved: u32) -> bool {
    if reason == DLL_PROCESS_ATTACH {
        if cfg!(debug_assertions) {
            let _ = unsafe { AllocConsole() };
            std::env::set_var("RUST_BACKTRACE", "1");
        }
        let dll_path = to_dll_path(inst_dll);
        tracing_helper::init_tracing(
            dll_path.parent().unwrap().to_string_lossy().as_ref(),
            &format!("{}.log", dll_path.file_stem().unwrap().to_string_lossy()),
        );

        let flags = SettingsRepo::new(dll_path.with_extension("toml")).message_flags();

        let fifa = match Fifa::new_hooked_process() {
            Ok(fifa) => fifa,
            Err(err) => {
                warn!("debug overlay disabled: {}", err);
                return true;
            }
        };
        info!("attached to {:?}, sources {:?}", fifa.version(), flags);

        let replacements = Replacements {
            device_create: on_device_create as usize,
            device_destroy: on_device_destroy as usize,
            device_reset: on_device_reset as usize,
            render: on_render as usize,
            wnd_proc: wnd_proc as usize,
            printf: on_printf as usize,
            output_debug_string: on_output_debug_string as usize,
            dlc_log: on_dlc_log as usize,
            ugc_log: on_ugc_log as usize,
            mode_log: on_mode_log as usize,
        };
        let (originals, patches) = match hooks::prepare(&fifa, &replacements, flags) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!("debug overlay disabled: {}", err);
                return true;
            }
        };

        // hooked sites may fire as soon as they are patched, so the context
        // goes in place first
        unsafe {
            CONTEXT = Some(Context {
                originals,
                flags,
                fifa,
                overlay: Overlay::new(HeadlessBackend),
                log: MessageLog::new(),
                staging: StagingBuffer::new(),
            });
        }
        if let Err(err) = patches.apply(&mut context_mut().fifa) {
            warn!("hook installation incomplete: {}", err);
        }
    }
    true
}
