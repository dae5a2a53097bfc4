//! Title cleanup applied when an event is pulled into a task.

/// Remove leading status markers such as "✅ " or "🔁 " from an event
/// summary. Only the front of the string is touched; emoji inside the
/// title are kept.
pub fn strip_leading_emoji(title: &str) -> String {
    title
        .trim_start_matches(|c: char| is_emoji_like(c) || c.is_whitespace())
        .to_string()
}

fn is_emoji_like(c: char) -> bool {
    matches!(
        c as u32,
        0x200D                  // zero width joiner
            | 0x20E3            // combining keycap
            | 0x2190..=0x21FF   // arrows
            | 0x2300..=0x23FF   // misc technical (⌚ ⏰)
            | 0x25A0..=0x27BF   // shapes, misc symbols, dingbats
            | 0x2B00..=0x2BFF   // misc symbols and arrows (⭐)
            | 0xFE00..=0xFE0F   // variation selectors
            | 0x1F000..=0x1FAFF // emoji blocks, flags included
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_single_emoji() {
        assert_eq!(strip_leading_emoji("✅ Dentist"), "Dentist");
        assert_eq!(strip_leading_emoji("📅Team sync"), "Team sync");
    }

    #[test]
    fn test_strips_sequences_with_joiners_and_selectors() {
        assert_eq!(strip_leading_emoji("❤️ Date night"), "Date night");
        assert_eq!(strip_leading_emoji("👨‍💻 Code review"), "Code review");
        assert_eq!(strip_leading_emoji("🔁 🔔 Standup"), "Standup");
    }

    #[test]
    fn test_keeps_inner_emoji_and_plain_titles() {
        assert_eq!(strip_leading_emoji("Pizza 🍕 night"), "Pizza 🍕 night");
        assert_eq!(strip_leading_emoji("Plain title"), "Plain title");
        assert_eq!(strip_leading_emoji("Café à 8h"), "Café à 8h");
        assert_eq!(strip_leading_emoji(""), "");
    }
}
