use std::{fs::File, io::Read};

use anyhow::Result;
use sha3::digest::Digest; // using for Sha3_224::new()
use sha3::{digest::generic_array::GenericArray, Sha3_224};
use windows::{
    core::PCWSTR,
    Win32::{Foundation::MAX_PATH, System::LibraryLoader::GetModuleFileNameW},
};

/// SHA3-224 digest of the host executable, used as the build fingerprint.
pub fn calc_game_hash() -> Result<Vec<u8>> {
    let mut buf = [0u16; MAX_PATH as usize];
    if unsafe { GetModuleFileNameW(None, &mut buf) } == 0 {
        anyhow::bail!("failed to locate the host executable");
    }
    let exe_file_path = unsafe { PCWSTR::from_raw(buf.as_ptr()).to_string() }?;
    let mut file = File::open(exe_file_path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    let mut hasher: Sha3_224 = Sha3_224::new();
    hasher.update(&buffer);
    let hash: GenericArray<_, _> = hasher.finalize();
    Ok(hash.to_vec())
}
