//! Logging helpers for user-supplied strings (usernames, product names)
//! so log lines stay single-line and readable.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Long values are truncated with an ellipsis; identifiers and display
///   names rarely exceed the cap.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_log;

    #[test]
    fn escapes_control_characters() {
        let s = "alice\nbob\r\tend";
        assert_eq!(escape_log(s), "alice\\nbob\\r\\tend");
    }

    #[test]
    fn truncates_long_values() {
        let s = "x".repeat(500);
        let esc = escape_log(&s);
        assert!(esc.chars().count() <= 121);
        assert!(esc.ends_with('…'));
    }
}
