// Copyright (C) 2026  ircfs developers

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

/// Longest canonical conversation name in bytes.
pub const NAME_MAX: usize = 49;

/// True when the name designates a channel rather than a user.
pub fn is_channel(name: &str) -> bool {
    matches!(
        name.as_bytes().first(),
        Some(b'#') | Some(b'+') | Some(b'!') | Some(b'&')
    )
}

/// Case-folds a conversation name to its rfc1459 canonical form, which is
/// also its directory name: `[`, `]`, `\` and `~` fold to `{`, `}`, `|` and
/// `^`, ASCII uppercase folds to lowercase, anything else passes through.
///
/// Names containing NUL, BEL, CR, LF or SP are rejected. A comma terminates
/// the name (multi-target lists are not supported, only the first target is
/// kept) and the result is capped at [`NAME_MAX`] bytes. Only bytes actually
/// scanned are validated; whatever hides behind a comma or the length cap is
/// never seen.
pub fn normalize(name: &str) -> Option<String> {
    let mut canonical = String::new();
    for chr in name.chars() {
        if canonical.len() + chr.len_utf8() > NAME_MAX {
            break;
        }
        match chr {
            '\0' | '\x07' | '\r' | '\n' | ' ' => return None,
            ',' => break,
            '[' => canonical.push('{'),
            ']' => canonical.push('}'),
            '\\' => canonical.push('|'),
            '~' => canonical.push('^'),
            _ => canonical.push(chr.to_ascii_lowercase()),
        }
    }
    Some(canonical)
}

#[cfg(test)]
mod test {
    use super::{is_channel, normalize, NAME_MAX};

    #[test]
    fn folds_rfc1459_specials() {
        assert_eq!(normalize("[]\\~").unwrap(), "{}|^");
        assert_eq!(normalize("NickName").unwrap(), "nickname");
        assert_eq!(normalize("#Chan[1]").unwrap(), "#chan{1}");
    }

    #[test]
    fn leaves_other_bytes_alone() {
        assert_eq!(normalize("#chan-{}|^_09").unwrap(), "#chan-{}|^_09");
    }

    #[test]
    fn idempotent() {
        for name in &["#Chan[1]", "bob", "[]\\~", "#a,#b", "x"] {
            let once = normalize(name).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn rejects_forbidden_bytes() {
        assert!(normalize("a\0b").is_none());
        assert!(normalize("a\x07b").is_none());
        assert!(normalize("a\rb").is_none());
        assert!(normalize("a\nb").is_none());
        assert!(normalize("a b").is_none());
    }

    #[test]
    fn comma_keeps_first_target() {
        assert_eq!(normalize("#a,#b,#c").unwrap(), "#a");
        // bytes behind the comma are never inspected
        assert_eq!(normalize("#a,bad name").unwrap(), "#a");
    }

    #[test]
    fn truncates_at_name_max() {
        let long = "#".repeat(NAME_MAX * 2);
        assert_eq!(normalize(&long).unwrap().len(), NAME_MAX);
    }

    #[test]
    fn empty_is_the_server_conversation() {
        assert_eq!(normalize("").unwrap(), "");
    }

    #[test]
    fn channel_sigils() {
        assert!(is_channel("#chan"));
        assert!(is_channel("+chan"));
        assert!(is_channel("!chan"));
        assert!(is_channel("&chan"));
        assert!(!is_channel("bob"));
        assert!(!is_channel(""));
    }
}
