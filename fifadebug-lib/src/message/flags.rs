use flagset::{flags, FlagSet};

flags! {
    /// Which intercepted message sources feed the debug log. Computed once
    /// from configuration at attach time, read-only afterwards.
    pub enum MessageFlag: u32 {
        Printf,
        OutputDebugString,
        Dlc,
        Ugc,
        FceGameModes,
        User,
    }
}

/// Parses the configured source list: comma-separated, case-insensitive.
/// An empty value or `all` enables every source; unrecognized tokens are
/// silently ignored.
pub fn parse_message_flags(value: &str) -> FlagSet<MessageFlag> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        return FlagSet::full();
    }
    value
        .split(',')
        .map(str::trim)
        .fold(FlagSet::default(), |flags, token| {
            match token.to_ascii_lowercase().as_str() {
                "printf" => flags | MessageFlag::Printf,
                "outputdebugstring" => flags | MessageFlag::OutputDebugString,
                "dlc" => flags | MessageFlag::Dlc,
                "ugc" => flags | MessageFlag::Ugc,
                "fcegamemodes" => flags | MessageFlag::FceGameModes,
                "user" => flags | MessageFlag::User,
                _ => flags,
            }
        })
}
