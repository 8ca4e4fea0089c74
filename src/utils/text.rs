//! UTF-8 safe shortening of field values for card output.

use std::borrow::Cow;

/// Shortens `s` to `max_chars` characters, ending with `…` when cut.
///
/// Values that already fit are borrowed unchanged.
///
/// ```
/// use ado_mobile::utils::ellipsize;
///
/// assert_eq!(ellipsize("Crash on save", 6), "Crash…");
/// assert_eq!(ellipsize("Crash", 6), "Crash");
/// ```
pub fn ellipsize(s: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some(_) => {
            let keep = s
                .char_indices()
                .nth(max_chars - 1)
                .map(|(idx, _)| idx)
                .unwrap_or(s.len());
            Cow::Owned(format!("{}…", s[..keep].trim_end()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # Ellipsize
    ///
    /// Tests character-based shortening for long titles.
    ///
    /// ## Test Scenario
    /// - Short, exact-length, long and emoji input
    ///
    /// ## Expected Outcome
    /// - Fitting values are borrowed; cut values end in an ellipsis and count
    ///   at most `max_chars` characters
    #[test]
    fn test_ellipsize() {
        assert!(matches!(ellipsize("short", 10), Cow::Borrowed("short")));
        assert_eq!(ellipsize("exact", 5), "exact");
        assert_eq!(ellipsize("Login page crashes", 8), "Login p…");
        assert_eq!(ellipsize("Login page", 7), "Login…");

        let cut = ellipsize("👋👋👋👋", 3);
        assert_eq!(cut, "👋👋…");
        assert_eq!(cut.chars().count(), 3);
        assert_eq!(ellipsize("abc", 0), "");
    }
}
