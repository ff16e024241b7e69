use std::{fs, path::PathBuf};

use derive_new::new;
use fifadebug_lib::message::{parse_message_flags, MessageFlag};
use flagset::FlagSet;
use serde::Deserialize;
use tracing::error;
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{HINSTANCE, MAX_PATH},
        System::LibraryLoader::GetModuleFileNameW,
    },
};

pub fn to_dll_path(module: HINSTANCE) -> PathBuf {
    let mut buf = [0u16; MAX_PATH as usize];
    if unsafe { GetModuleFileNameW(module, &mut buf) } == 0 {
        panic!();
    }
    let dll_path = unsafe { PCWSTR::from_raw(buf.as_ptr()).to_string() }.unwrap();
    PathBuf::from(dll_path)
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(default)]
    debug: DebugSettings,
}

#[derive(Debug, Default, Deserialize)]
struct DebugSettings {
    messages: Option<String>,
}

/// Read-once view of the module's settings file. A missing or malformed file
/// behaves like an empty one: every message source stays enabled.
#[derive(new)]
pub struct SettingsRepo {
    path: PathBuf,
}

impl SettingsRepo {
    fn load(&self) -> Settings {
        let Ok(text) = fs::read_to_string(&self.path) else {
            return Settings::default();
        };
        toml::from_str(&text).unwrap_or_else(|err| {
            error!("{} is malformed: {}", self.path.display(), err);
            Settings::default()
        })
    }

    pub fn message_flags(&self) -> FlagSet<MessageFlag> {
        parse_message_flags(self.load().debug.messages.as_deref().unwrap_or(""))
    }
}
