use std::{
    mem::size_of,
    ptr::{read_unaligned, write_unaligned},
};

use anyhow::Result;
use windows::{
    core::PCWSTR,
    Win32::System::{
        LibraryLoader::GetModuleHandleW,
        Memory::{VirtualProtect, PAGE_PROTECTION_FLAGS},
        ProcessStatus::{GetModuleInformation, MODULEINFO},
        Threading::GetCurrentProcess,
    },
};

fn module_base_addr() -> Result<usize> {
    let module = unsafe { GetModuleHandleW(PCWSTR::null()) }?;
    let mut module_info: MODULEINFO = Default::default();
    unsafe {
        GetModuleInformation(
            GetCurrentProcess(),
            module,
            &mut module_info,
            size_of::<MODULEINFO>() as u32,
        )
    }?;
    Ok(module_info.lpBaseOfDll as usize)
}

/// Rewrites the rel32 operand of the `call`/`jmp` at `addr`, returning the
/// absolute address it used to land on. The opcode byte itself is untouched.
unsafe fn swap_rel32_target(addr: *mut u8, target: usize) -> usize {
    let next_instruction = addr.wrapping_add(5) as i64;
    let p_operand = addr.wrapping_add(1) as *mut i32;
    let old_value = read_unaligned(p_operand);
    write_unaligned(p_operand, (target as i64 - next_instruction) as i32);
    (next_instruction + old_value as i64) as usize
}

fn rel32_target(addr: *const u8) -> usize {
    let next_instruction = addr.wrapping_add(5) as i64;
    let operand = unsafe { read_unaligned(addr.wrapping_add(1) as *const i32) };
    (next_instruction + operand as i64) as usize
}

/// Patch access to the process this code is loaded into. Addresses are
/// relative to the main module's load address.
pub struct HookedProcess {
    base_addr: usize,
}

impl HookedProcess {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base_addr: module_base_addr()?,
        })
    }

    pub fn read(&self, addr: usize, buffer: &mut [u8]) {
        unsafe { ((self.base_addr + addr) as *const u8).copy_to(buffer.as_mut_ptr(), buffer.len()) };
    }

    pub fn read_u8(&self, addr: usize) -> u8 {
        let mut buffer = [0; 1];
        self.read(addr, &mut buffer);
        buffer[0]
    }

    pub fn read_u32(&self, addr: usize) -> u32 {
        let mut buffer = [0; 4];
        self.read(addr, &mut buffer);
        u32::from_le_bytes(buffer)
    }

    pub fn write_u32(&mut self, addr: usize, value: u32) {
        unsafe {
            ((self.base_addr + addr) as *mut u8)
                .copy_from(value.to_le_bytes().as_ptr(), size_of::<u32>())
        };
    }

    pub fn virtual_protect(
        &mut self,
        addr: usize,
        size: usize,
        protect: PAGE_PROTECTION_FLAGS,
    ) -> Result<PAGE_PROTECTION_FLAGS> {
        let mut old: PAGE_PROTECTION_FLAGS = Default::default();
        unsafe { VirtualProtect((self.base_addr + addr) as _, size, protect, &mut old) }?;
        Ok(old)
    }

    /// Redirects the rel32 transfer at `addr` to `target`; returns the
    /// original destination. The page must already be writable.
    pub fn hook_rel32(&mut self, addr: usize, target: usize) -> usize {
        unsafe { swap_rel32_target((self.base_addr + addr) as *mut u8, target) }
    }

    /// Current destination of the rel32 transfer at `addr`.
    pub fn rel32_target(&self, addr: usize) -> usize {
        rel32_target((self.base_addr + addr) as *const u8)
    }
}
