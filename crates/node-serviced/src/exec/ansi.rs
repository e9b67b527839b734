//! Removal of terminal colour/style sequences from captured output.

use std::sync::LazyLock;

use regex::Regex;

static CSI_SGR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static regex"));

/// Strip `ESC [ <params> m` sequences, leaving every other byte untouched.
///
/// Removal repeats until nothing matches, so a sequence assembled from the
/// halves around an inner one is removed as well.
pub fn clean_ansi(s: &str) -> String {
    let mut out = s.to_owned();
    loop {
        let next = CSI_SGR_RE.replace_all(&out, "").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_colour_sequences() {
        assert_eq!(
            clean_ansi("\x1b[31mversion not found\x1b[0m"),
            "version not found"
        );
        assert_eq!(clean_ansi("\x1b[1;33mwarn\x1b[m: x"), "warn: x");
    }

    #[test]
    fn plain_text_is_unchanged() {
        let s = "error: release v9.9.9 does not exist\n";
        assert_eq!(clean_ansi(s), s);
    }

    #[test]
    fn other_escapes_are_kept() {
        // Cursor movement is a CSI sequence but not a style one.
        let s = "\x1b[2Kline\x1b[1A";
        assert_eq!(clean_ansi(s), s);
    }

    #[test]
    fn nested_sequences_are_removed() {
        assert_eq!(clean_ansi("\x1b[\x1b[31mmtext"), "text");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "\x1b[31mred\x1b[0m",
            "\x1b[\x1b[31mm",
            "a\x1b[0;1;4mb\x1b[0mc",
            "",
        ];
        for s in inputs {
            let once = clean_ansi(s);
            assert_eq!(clean_ansi(&once), once, "{s:?}");
        }
    }
}
