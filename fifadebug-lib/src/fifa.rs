use std::ffi::c_void;

use anyhow::{anyhow, Result};
use thiserror::Error;
use windows::{
    core::Interface,
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, WPARAM},
        Graphics::Direct3D9::IDirect3DDevice9,
        System::Memory::PAGE_EXECUTE_WRITECOPY,
    },
};

use crate::{
    hook_utils::calc_game_hash,
    memory_accessors::HookedProcess,
    version::{GameVersion, HookSlot, OffsetTable},
};

/// Byte offset of the live device pointer inside the renderer registry
/// structure.
const DEVICE_PTR_OFFSET: usize = 0xC;
/// Byte offset of the window handle inside the device-creation parameter
/// block.
const WINDOW_HANDLE_OFFSET: usize = 4;

pub type FnDeviceCreate = extern "cdecl" fn(init_params: *mut c_void) -> bool;
pub type FnDeviceDestroy = extern "thiscall" fn(this: *mut c_void) -> *mut c_void;
pub type FnDeviceReset = extern "thiscall" fn(this: *mut c_void) -> bool;
pub type FnRender = extern "thiscall" fn(this: *mut c_void, flip: bool) -> bool;
pub type FnWndProc =
    extern "system" fn(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unrecognized game build")]
    UnrecognizedBuild,
    #[error("build exposes no {0:?} hook")]
    MissingSlot(HookSlot),
    #[error("unexpected opcode {found:#04x} at {addr:#x}")]
    UnexpectedOpcode { addr: usize, found: u8 },
}

/// The hooked game process plus the offset table its build resolved to. All
/// public addresses are the table's absolute virtual addresses; rebasing
/// against the real load address happens here and nowhere else.
pub struct Fifa {
    process: HookedProcess,
    version: GameVersion,
}

impl Fifa {
    /// Fingerprints the running executable and binds to it. Fails on an
    /// unrecognized build so that no hook is ever installed against wrong
    /// offsets.
    pub fn new_hooked_process() -> Result<Self> {
        let digest = calc_game_hash()?;
        let version =
            GameVersion::from_fingerprint(&digest).ok_or(InstallError::UnrecognizedBuild)?;
        Ok(Self {
            process: HookedProcess::new()?,
            version,
        })
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }

    pub fn offsets(&self) -> &'static OffsetTable {
        self.version.offset_table()
    }

    fn rebase(&self, addr: usize) -> usize {
        addr - self.offsets().image_base
    }

    fn expect_opcode(&self, addr: usize, expected: u8) -> Result<()> {
        let found = self.process.read_u8(self.rebase(addr));
        if found != expected {
            return Err(InstallError::UnexpectedOpcode { addr, found }.into());
        }
        Ok(())
    }

    /// Current target of the `call` at `addr`, i.e. the call-through handle a
    /// redirect of this site must preserve.
    pub fn call_target(&self, addr: usize) -> Result<usize> {
        self.expect_opcode(addr, 0xe8)?;
        Ok(self.process.rel32_target(self.rebase(addr)))
    }

    /// Current target of the `jmp` at `addr`. Jump redirects never call
    /// through, but validating the site before patching keeps a bad offset
    /// table from ever writing to the process.
    pub fn jump_target(&self, addr: usize) -> Result<usize> {
        self.expect_opcode(addr, 0xe9)?;
        Ok(self.process.rel32_target(self.rebase(addr)))
    }

    pub fn install_call(&mut self, addr: usize, target: usize) -> Result<usize> {
        self.expect_opcode(addr, 0xe8)?;
        self.install_rel32(addr, target)
    }

    pub fn install_jump(&mut self, addr: usize, target: usize) -> Result<usize> {
        self.expect_opcode(addr, 0xe9)?;
        self.install_rel32(addr, target)
    }

    fn install_rel32(&mut self, addr: usize, target: usize) -> Result<usize> {
        let addr = self.rebase(addr);
        let old = self.process.virtual_protect(addr, 5, PAGE_EXECUTE_WRITECOPY)?;
        let original = self.process.hook_rel32(addr, target);
        self.process.virtual_protect(addr, 5, old)?;
        Ok(original)
    }

    /// Current value of the function-pointer slot at `addr`.
    pub fn pointer_value(&self, addr: usize) -> usize {
        self.process.read_u32(self.rebase(addr)) as usize
    }

    pub fn patch_pointer(&mut self, addr: usize, target: usize) -> Result<usize> {
        let addr = self.rebase(addr);
        let original = self.process.read_u32(addr) as usize;
        let old = self.process.virtual_protect(addr, 4, PAGE_EXECUTE_WRITECOPY)?;
        self.process.write_u32(addr, target as u32);
        self.process.virtual_protect(addr, 4, old)?;
        Ok(original)
    }

    /// The live D3D device, located through the renderer registry: a fixed
    /// process-wide address holds a pointer to the registry structure, and the
    /// device pointer sits at a fixed byte offset within it.
    pub fn direct_3d_device(&self) -> Result<&'static IDirect3DDevice9> {
        let registry = self
            .process
            .read_u32(self.rebase(self.offsets().renderer_registry)) as usize;
        if registry == 0 {
            return Err(anyhow!("renderer registry is not populated yet"));
        }
        let p_p_device = (registry + DEVICE_PTR_OFFSET) as *const *mut c_void;
        unsafe { IDirect3DDevice9::from_raw_borrowed(&*p_p_device) }
            .ok_or_else(|| anyhow!("no device in the renderer registry"))
    }

    pub fn device_pointer(&self) -> Result<*mut c_void> {
        Ok(self.direct_3d_device()?.as_raw())
    }

    /// Window handle out of the parameter block the host passes to its
    /// device-creation routine.
    ///
    /// # Safety
    /// `init_params` must be the block the intercepted creation call received.
    pub unsafe fn window_from_creation_params(init_params: *const c_void) -> HWND {
        unsafe { *(init_params.cast::<u8>().add(WINDOW_HANDLE_OFFSET) as *const HWND) }
    }
}
