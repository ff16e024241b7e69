use flagset::FlagSet;
use hex_literal::hex;

use crate::message::MessageFlag;

/// One recognized release of the game. Resolved once from the executable's
/// fingerprint at attach time; every offset below is only valid for the build
/// it is declared under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameVersion {
    Fifa13V1700Rld,
    Fifa13V1800,
    Fifa12V1700,
    Fifa12V1500Skd,
    Fifa12V1000Rld,
    Fifa11V1010Rld,
    Fifa11V1010,
}

/// SHA3-224 digests of the supported executables.
const KNOWN_BUILD_FINGERPRINTS: [([u8; 28], GameVersion); 7] = [
    (
        hex!("6f3c9edb714a50b1c7ad20e85b2f4a0dd93c175e84b6f20a1c59de38"),
        GameVersion::Fifa13V1700Rld,
    ),
    (
        hex!("2b80cf15d9ae467308c2b64f1df05a6790433d21be65a7c804f1e9ba"),
        GameVersion::Fifa13V1800,
    ),
    (
        hex!("c41d8f02e6953ab07d12c08e5be4df6730a91fc2d50b84ae6397f515"),
        GameVersion::Fifa12V1700,
    ),
    (
        hex!("98a03be1557fd2c6e04d1b8a36cf2290517efea4bd08c341a2d67c0f"),
        GameVersion::Fifa12V1500Skd,
    ),
    (
        hex!("e5f12490cc83ab7d66105f3e2a98d04b1c27309ff4ae815d20c6b7d4"),
        GameVersion::Fifa12V1000Rld,
    ),
    (
        hex!("7da4e0b92f165c83de01a7f440962cb58d13ea06253cf90b41e8a672"),
        GameVersion::Fifa11V1010Rld,
    ),
    (
        hex!("40b7d1fa8c325e96014adf27b09e63c51f78205dba4c1e08926fd3b5"),
        GameVersion::Fifa11V1010,
    ),
];

impl GameVersion {
    pub fn from_fingerprint(digest: &[u8]) -> Option<Self> {
        KNOWN_BUILD_FINGERPRINTS
            .iter()
            .find(|(fingerprint, _)| fingerprint == digest)
            .map(|&(_, version)| version)
    }

    pub fn offset_table(self) -> &'static OffsetTable {
        match self {
            GameVersion::Fifa13V1700Rld => &FIFA13_1700_RLD,
            GameVersion::Fifa13V1800 => &FIFA13_1800,
            GameVersion::Fifa12V1700 => &FIFA12_1700,
            GameVersion::Fifa12V1500Skd => &FIFA12_1500_SKD,
            GameVersion::Fifa12V1000Rld => &FIFA12_1000_RLD,
            GameVersion::Fifa11V1010Rld => &FIFA11_1010_RLD,
            GameVersion::Fifa11V1010 => &FIFA11_1010,
        }
    }
}

/// How a [`HookSpec`] rewires its source address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    /// Swap the rel32 target of a `call` instruction; the previous target is
    /// the call-through handle.
    CallRedirect,
    /// Swap the rel32 target of a `jmp` instruction; no call-through.
    JumpRedirect,
    /// Overwrite a stored function pointer, reading the old value first.
    PointerPatch,
}

/// Which replacement function a [`HookSpec`] binds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookSlot {
    DeviceCreate,
    DeviceDestroy,
    DeviceReset,
    Render,
    WndProc,
    Printf,
    OutputDebugString,
    DlcLog,
    UgcLog,
    ModeLog,
}

/// One row of a build's hook table. Rows are constant data; everything the
/// installer varies per build lives here rather than in code.
#[derive(Clone, Copy, Debug)]
pub struct HookSpec {
    pub slot: HookSlot,
    pub kind: HookKind,
    pub addr: usize,
    pub gate: Option<MessageFlag>,
}

impl HookSpec {
    const fn hook(slot: HookSlot, kind: HookKind, addr: usize) -> Self {
        Self {
            slot,
            kind,
            addr,
            gate: None,
        }
    }

    const fn gated(slot: HookSlot, kind: HookKind, addr: usize, gate: MessageFlag) -> Self {
        Self {
            slot,
            kind,
            addr,
            gate: Some(gate),
        }
    }

    pub fn enabled_for(&self, flags: FlagSet<MessageFlag>) -> bool {
        self.gate.map_or(true, |gate| flags.contains(gate))
    }
}

/// Per-build hook table plus the auxiliary fixed addresses the dispatcher
/// needs. All addresses are absolute virtual addresses at `image_base`; the
/// patch layer rebases them against the module's real load address.
pub struct OffsetTable {
    pub image_base: usize,
    pub specs: &'static [HookSpec],
    /// Process-wide pointer to the renderer registry; the live device pointer
    /// sits at a fixed byte offset inside the pointed-to structure.
    pub renderer_registry: usize,
}

impl OffsetTable {
    pub fn enabled_specs(
        &self,
        flags: FlagSet<MessageFlag>,
    ) -> impl Iterator<Item = &'static HookSpec> {
        self.specs.iter().filter(move |spec| spec.enabled_for(flags))
    }
}

use HookKind::{CallRedirect, JumpRedirect, PointerPatch};
use HookSlot::{
    DeviceCreate, DeviceDestroy, DeviceReset, DlcLog, ModeLog, OutputDebugString, Printf, Render,
    UgcLog, WndProc,
};

static FIFA13_1700_RLD: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0x1292AD1),
        HookSpec::hook(DeviceDestroy, CallRedirect, 0x19FD006),
        HookSpec::hook(DeviceDestroy, CallRedirect, 0x1A0FEF4),
        HookSpec::hook(DeviceReset, CallRedirect, 0x19D4A9D),
        HookSpec::hook(DeviceReset, CallRedirect, 0x1BB12B0),
        HookSpec::hook(Render, PointerPatch, 0x313B308),
        HookSpec::hook(WndProc, PointerPatch, 0x12A5176 + 3),
        HookSpec::gated(Printf, PointerPatch, 0x2F36588, MessageFlag::Printf),
        HookSpec::gated(DlcLog, JumpRedirect, 0x531870, MessageFlag::Dlc),
        HookSpec::gated(UgcLog, JumpRedirect, 0xFABB70, MessageFlag::Ugc),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x2F36270,
            MessageFlag::OutputDebugString,
        ),
        HookSpec::gated(ModeLog, JumpRedirect, 0x749090, MessageFlag::FceGameModes),
    ],
    renderer_registry: 0x3DD53F0,
};

static FIFA13_1800: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0x128E051),
        HookSpec::hook(DeviceDestroy, CallRedirect, 0x19F8746),
        HookSpec::hook(DeviceDestroy, CallRedirect, 0x1A0B614),
        HookSpec::hook(DeviceReset, CallRedirect, 0x19D01BD),
        HookSpec::hook(DeviceReset, CallRedirect, 0x1BAC9E0),
        HookSpec::hook(Render, PointerPatch, 0x25333D8),
        HookSpec::hook(WndProc, PointerPatch, 0x12A21F6 + 3),
        HookSpec::gated(Printf, PointerPatch, 0x232E58C, MessageFlag::Printf),
        HookSpec::gated(DlcLog, JumpRedirect, 0x52C920, MessageFlag::Dlc),
        HookSpec::gated(UgcLog, JumpRedirect, 0xFA7130, MessageFlag::Ugc),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x232E270,
            MessageFlag::OutputDebugString,
        ),
        HookSpec::gated(ModeLog, JumpRedirect, 0x744110, MessageFlag::FceGameModes),
    ],
    renderer_registry: 0x27A1D60,
};

static FIFA12_1700: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0xE55E72),
        HookSpec::hook(DeviceReset, CallRedirect, 0xDF7C19),
        HookSpec::hook(Render, PointerPatch, 0x1764674),
        HookSpec::hook(WndProc, PointerPatch, 0xB9E923 + 4),
        HookSpec::gated(Printf, PointerPatch, 0x1650400, MessageFlag::Printf),
        HookSpec::gated(DlcLog, JumpRedirect, 0xB403B0, MessageFlag::Dlc),
        HookSpec::gated(UgcLog, JumpRedirect, 0xD359E0, MessageFlag::Ugc),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x16501C4,
            MessageFlag::OutputDebugString,
        ),
        HookSpec::gated(ModeLog, JumpRedirect, 0xCCEC20, MessageFlag::FceGameModes),
    ],
    renderer_registry: 0x1A4AE00,
};

static FIFA12_1500_SKD: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0xE52872),
        HookSpec::hook(DeviceReset, CallRedirect, 0xDF3079),
        HookSpec::hook(Render, PointerPatch, 0x17646E4),
        HookSpec::hook(WndProc, PointerPatch, 0xB9CB13 + 4),
        HookSpec::gated(Printf, PointerPatch, 0x1B7B3FC, MessageFlag::Printf),
        HookSpec::gated(DlcLog, JumpRedirect, 0xB3FD90, MessageFlag::Dlc),
        HookSpec::gated(UgcLog, JumpRedirect, 0xD33CB0, MessageFlag::Ugc),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x1B7B1AC,
            MessageFlag::OutputDebugString,
        ),
        HookSpec::gated(ModeLog, JumpRedirect, 0xCCDA50, MessageFlag::FceGameModes),
    ],
    renderer_registry: 0x1A4ADC0,
};

static FIFA12_1000_RLD: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0x80C912),
        HookSpec::hook(DeviceReset, CallRedirect, 0x7AF079),
        HookSpec::hook(Render, PointerPatch, 0x17389BC),
        HookSpec::hook(WndProc, PointerPatch, 0x51CF0C + 4),
        HookSpec::gated(Printf, PointerPatch, 0x163F410, MessageFlag::Printf),
        HookSpec::gated(DlcLog, JumpRedirect, 0x4C3D30, MessageFlag::Dlc),
        HookSpec::gated(UgcLog, JumpRedirect, 0x6AFBE0, MessageFlag::Ugc),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x163F1E0,
            MessageFlag::OutputDebugString,
        ),
        HookSpec::gated(ModeLog, JumpRedirect, 0x64E830, MessageFlag::FceGameModes),
    ],
    renderer_registry: 0x19A9F70,
};

// FIFA 11 never shipped the UGC uploader or the FCE game-modes logger, and
// only the RLD build carries the DLC updater.
static FIFA11_1010_RLD: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0x83A549),
        HookSpec::hook(DeviceReset, CallRedirect, 0xEC21D0),
        HookSpec::hook(Render, PointerPatch, 0x12641DC),
        HookSpec::hook(WndProc, PointerPatch, 0x8EA74A + 4),
        HookSpec::gated(Printf, PointerPatch, 0x114A280, MessageFlag::Printf),
        HookSpec::gated(DlcLog, JumpRedirect, 0x4388C0, MessageFlag::Dlc),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x114A178,
            MessageFlag::OutputDebugString,
        ),
    ],
    renderer_registry: 0x1489760,
};

static FIFA11_1010: OffsetTable = OffsetTable {
    image_base: 0x400000,
    specs: &[
        HookSpec::hook(DeviceCreate, CallRedirect, 0x83A549),
        HookSpec::hook(DeviceReset, CallRedirect, 0xEC21D0),
        HookSpec::hook(Render, PointerPatch, 0x12641DC),
        HookSpec::hook(WndProc, PointerPatch, 0x8EA74A + 4),
        HookSpec::gated(Printf, PointerPatch, 0x114A280, MessageFlag::Printf),
        HookSpec::gated(
            OutputDebugString,
            PointerPatch,
            0x114A178,
            MessageFlag::OutputDebugString,
        ),
    ],
    renderer_registry: 0x1489760,
};

#[cfg(test)]
mod tests {
    use flagset::FlagSet;

    use super::*;
    use crate::message::parse_message_flags;

    const ALL_VERSIONS: [GameVersion; 7] = [
        GameVersion::Fifa13V1700Rld,
        GameVersion::Fifa13V1800,
        GameVersion::Fifa12V1700,
        GameVersion::Fifa12V1500Skd,
        GameVersion::Fifa12V1000Rld,
        GameVersion::Fifa11V1010Rld,
        GameVersion::Fifa11V1010,
    ];

    #[test]
    fn fingerprints_resolve_to_their_version() {
        for (fingerprint, version) in KNOWN_BUILD_FINGERPRINTS {
            assert_eq!(GameVersion::from_fingerprint(&fingerprint), Some(version));
        }
        assert_eq!(GameVersion::from_fingerprint(&[0u8; 28]), None);
        assert_eq!(GameVersion::from_fingerprint(&[]), None);
    }

    #[test]
    fn every_build_hooks_the_full_device_lifecycle() {
        for version in ALL_VERSIONS {
            let table = version.offset_table();
            for slot in [
                HookSlot::DeviceCreate,
                HookSlot::DeviceReset,
                HookSlot::Render,
                HookSlot::WndProc,
            ] {
                assert!(
                    table.specs.iter().any(|spec| spec.slot == slot),
                    "{version:?} is missing {slot:?}"
                );
            }
        }
    }

    #[test]
    fn lifecycle_hooks_are_never_gated() {
        for version in ALL_VERSIONS {
            for spec in version.offset_table().specs {
                let lifecycle = matches!(
                    spec.slot,
                    HookSlot::DeviceCreate
                        | HookSlot::DeviceDestroy
                        | HookSlot::DeviceReset
                        | HookSlot::Render
                        | HookSlot::WndProc
                );
                assert_eq!(spec.gate.is_none(), lifecycle, "{version:?} {spec:?}");
            }
        }
    }

    #[test]
    fn gating_selects_exactly_the_configured_sinks() {
        let flags = parse_message_flags("dlc,user");
        let table = GameVersion::Fifa13V1700Rld.offset_table();
        let enabled: Vec<HookSlot> = table.enabled_specs(flags).map(|spec| spec.slot).collect();
        assert!(enabled.contains(&HookSlot::DlcLog));
        assert!(!enabled.contains(&HookSlot::Printf));
        assert!(!enabled.contains(&HookSlot::OutputDebugString));
        assert!(!enabled.contains(&HookSlot::UgcLog));
        assert!(!enabled.contains(&HookSlot::ModeLog));
        // lifecycle hooks install regardless of configuration
        assert!(enabled.contains(&HookSlot::DeviceCreate));
        assert!(enabled.contains(&HookSlot::Render));
    }

    #[test]
    fn no_flags_still_installs_the_lifecycle() {
        let table = GameVersion::Fifa12V1700.offset_table();
        let enabled: Vec<&HookSpec> = table.enabled_specs(FlagSet::default()).collect();
        assert_eq!(enabled.len(), 4);
        assert!(enabled.iter().all(|spec| spec.gate.is_none()));
    }

    #[test]
    fn duplicate_slots_keep_declaration_order() {
        let table = GameVersion::Fifa13V1700Rld.offset_table();
        let destroy_sites: Vec<usize> = table
            .specs
            .iter()
            .filter(|spec| spec.slot == HookSlot::DeviceDestroy)
            .map(|spec| spec.addr)
            .collect();
        assert_eq!(destroy_sites, [0x19FD006, 0x1A0FEF4]);
    }
}
