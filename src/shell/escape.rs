//! Backslash escape decoding for completed input lines.

/// Decode backslash escapes.
///
/// Supports `\0 \b \f \n \r \t \" \' \\` and `\uXXXX`. Unknown escapes,
/// malformed `\u` sequences and a lone trailing backslash are kept as written.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };

        let decoded = match next {
            '0' => Some('\0'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '"' => Some('"'),
            '\'' => Some('\''),
            '\\' => Some('\\'),
            _ => None,
        };

        if let Some(decoded) = decoded {
            chars.next();
            out.push(decoded);
        } else if next == 'u' {
            let hex: String = chars.clone().skip(1).take(4).collect();
            match decode_unicode(&hex) {
                Some(decoded) => {
                    // 'u' plus four hex digits
                    for _ in 0..5 {
                        chars.next();
                    }
                    out.push(decoded);
                }
                None => out.push('\\'),
            }
        } else {
            out.push('\\');
        }
    }

    out
}

fn decode_unicode(hex: &str) -> Option<char> {
    if hex.len() != 4 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}
