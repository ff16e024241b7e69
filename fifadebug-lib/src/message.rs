mod flags;
mod log;
mod staging;

pub use flags::{parse_message_flags, MessageFlag};
pub use log::{MessageLog, LOG_CAPACITY};
pub use staging::{StagingBuffer, STAGING_CAPACITY};

/// Prefix of the repeating content-update notice the DLC logger spams once per
/// frame while a download is pending.
pub const DLC_UPDATE_PREFIX: &[u8] = b"[DLC] Update";

pub fn is_dlc_update_notice(format: &[u8]) -> bool {
    format.starts_with(DLC_UPDATE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::{is_dlc_update_notice, MessageLog};

    #[test]
    fn dlc_update_notices_are_recognized() {
        assert!(is_dlc_update_notice(b"[DLC] Update 3"));
        assert!(is_dlc_update_notice(b"[DLC] Update"));
        assert!(!is_dlc_update_notice(b"[DLC] Installed squad file"));
        assert!(!is_dlc_update_notice(b"Loaded level X"));
        assert!(!is_dlc_update_notice(b""));
    }

    #[test]
    fn filtered_notices_never_reach_the_log() {
        let mut log = MessageLog::new();
        for raw in [&b"[DLC] Update 3"[..], b"Loaded level X"] {
            if is_dlc_update_notice(raw) {
                continue;
            }
            log.append(String::from_utf8_lossy(raw).into_owned());
        }
        assert_eq!(log.iter().collect::<Vec<_>>(), ["Loaded level X"]);
    }
}
