use std::mem::transmute;

use anyhow::Result;
use fifadebug_lib::{
    message::MessageFlag,
    version::{HookKind, HookSlot},
    Fifa, FnDeviceCreate, FnDeviceDestroy, FnDeviceReset, FnRender, FnWndProc, InstallError,
};
use flagset::FlagSet;
use tracing::debug;

/// Replacement entry points, one per hook slot, as raw addresses.
pub struct Replacements {
    pub device_create: usize,
    pub device_destroy: usize,
    pub device_reset: usize,
    pub render: usize,
    pub wnd_proc: usize,
    pub printf: usize,
    pub output_debug_string: usize,
    pub dlc_log: usize,
    pub ugc_log: usize,
    pub mode_log: usize,
}

impl Replacements {
    fn for_slot(&self, slot: HookSlot) -> usize {
        match slot {
            HookSlot::DeviceCreate => self.device_create,
            HookSlot::DeviceDestroy => self.device_destroy,
            HookSlot::DeviceReset => self.device_reset,
            HookSlot::Render => self.render,
            HookSlot::WndProc => self.wnd_proc,
            HookSlot::Printf => self.printf,
            HookSlot::OutputDebugString => self.output_debug_string,
            HookSlot::DlcLog => self.dlc_log,
            HookSlot::UgcLog => self.ugc_log,
            HookSlot::ModeLog => self.mode_log,
        }
    }
}

/// Call-through handles, typed with each slot's original calling convention.
/// Owned by the process-wide context for the rest of the process's life.
#[derive(Clone, Copy)]
pub struct OriginalFns {
    pub device_create: FnDeviceCreate,
    pub device_destroy: Option<FnDeviceDestroy>,
    pub device_reset: FnDeviceReset,
    pub render: FnRender,
    pub wnd_proc: FnWndProc,
}

struct PatchOp {
    kind: HookKind,
    addr: usize,
    target: usize,
}

/// Patches validated by [`prepare`], not yet written.
pub struct PendingPatches {
    ops: Vec<PatchOp>,
}

impl PendingPatches {
    /// Writes every patch. Call only once the process-wide context the
    /// replacements read is in place; a hooked site can fire the moment its
    /// patch lands.
    pub fn apply(self, fifa: &mut Fifa) -> Result<()> {
        for op in &self.ops {
            match op.kind {
                HookKind::CallRedirect => {
                    fifa.install_call(op.addr, op.target)?;
                }
                HookKind::JumpRedirect => {
                    fifa.install_jump(op.addr, op.target)?;
                }
                HookKind::PointerPatch => {
                    fifa.patch_pointer(op.addr, op.target)?;
                }
            }
        }
        debug!("{} hooks installed", self.ops.len());
        Ok(())
    }
}

#[derive(Default)]
struct RawOriginals {
    device_create: Option<usize>,
    device_destroy: Option<usize>,
    device_reset: Option<usize>,
    render: Option<usize>,
    wnd_proc: Option<usize>,
}

impl RawOriginals {
    fn slot_mut(&mut self, slot: HookSlot) -> Option<&mut Option<usize>> {
        match slot {
            HookSlot::DeviceCreate => Some(&mut self.device_create),
            HookSlot::DeviceDestroy => Some(&mut self.device_destroy),
            HookSlot::DeviceReset => Some(&mut self.device_reset),
            HookSlot::Render => Some(&mut self.render),
            HookSlot::WndProc => Some(&mut self.wnd_proc),
            // log sinks never call through
            _ => None,
        }
    }

    fn require(&self, slot: HookSlot) -> Result<usize> {
        let handle = match slot {
            HookSlot::DeviceCreate => self.device_create,
            HookSlot::DeviceReset => self.device_reset,
            HookSlot::Render => self.render,
            HookSlot::WndProc => self.wnd_proc,
            _ => None,
        };
        Ok(handle.ok_or(InstallError::MissingSlot(slot))?)
    }
}

/// Walks the build's hook table: validates every enabled row, reads the
/// original targets, and stages the patches. Nothing is written yet, so a
/// failing row aborts the whole installation with the process untouched.
///
/// Rows gated behind a disabled [`MessageFlag`] are skipped outright. When
/// several rows share a slot the first handle read is the one retained; the
/// replacement always calls through that primary handle.
pub fn prepare(
    fifa: &Fifa,
    replacements: &Replacements,
    flags: FlagSet<MessageFlag>,
) -> Result<(OriginalFns, PendingPatches)> {
    let mut raw = RawOriginals::default();
    let mut ops = Vec::new();

    for spec in fifa.offsets().enabled_specs(flags) {
        let original = match spec.kind {
            HookKind::CallRedirect => Some(fifa.call_target(spec.addr)?),
            HookKind::JumpRedirect => {
                fifa.jump_target(spec.addr)?;
                None
            }
            HookKind::PointerPatch => Some(fifa.pointer_value(spec.addr)),
        };
        if let (Some(original), Some(retained)) = (original, raw.slot_mut(spec.slot)) {
            if retained.is_none() {
                *retained = Some(original);
            }
        }
        ops.push(PatchOp {
            kind: spec.kind,
            addr: spec.addr,
            target: replacements.for_slot(spec.slot),
        });
    }

    let originals = unsafe {
        OriginalFns {
            device_create: transmute::<usize, FnDeviceCreate>(
                raw.require(HookSlot::DeviceCreate)?,
            ),
            device_destroy: raw
                .device_destroy
                .map(|addr| transmute::<usize, FnDeviceDestroy>(addr)),
            device_reset: transmute::<usize, FnDeviceReset>(raw.require(HookSlot::DeviceReset)?),
            render: transmute::<usize, FnRender>(raw.require(HookSlot::Render)?),
            wnd_proc: transmute::<usize, FnWndProc>(raw.require(HookSlot::WndProc)?),
        }
    };
    Ok((originals, PendingPatches { ops }))
}
