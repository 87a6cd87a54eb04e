//! Parsing of RFC 2821 mailboxes

/// `Mailbox` is an RFC 2821 mailbox split into its local part (unquoted and unescaped) and the text
/// following the `@`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Mailbox {
    pub(crate) local: String,
    pub(crate) domain: String,
}

/// `is_atext` returns true for the atext characters of RFC 2822 section 3.2.4 and the period.
fn is_atext(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"!#$%&'*+-/=?^_`{|}~.".contains(&c)
}

/// `is_qtext` returns true for characters permitted unescaped within a quoted local part,
/// including the obsolete control characters.
fn is_qtext(c: u8) -> bool {
    matches!(c, 1..=8 | 11 | 12 | 14..=31 | 32 | 33 | 35..=91 | 93..=127)
}

/// `is_quoted_pair_text` returns true for characters that may follow a backslash.
fn is_quoted_pair_text(c: u8) -> bool {
    matches!(c, 1..=9 | 11 | 12 | 14..=127)
}

/// `parse_rfc2821_mailbox` parses `Local-part "@" Domain`. The local part is either a quoted string
/// or a dot-atom (escaped characters are tolerated outside quotes, per RFC 3696). No structure is
/// imposed on the domain beyond being non-empty; callers convert and validate it.
pub(crate) fn parse_rfc2821_mailbox(input: &str) -> Option<Mailbox> {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let mut local = Vec::with_capacity(bytes.len() / 2);
    let mut pos = 0;

    if bytes[0] == b'"' {
        pos += 1;
        loop {
            let c = *bytes.get(pos)?;
            pos += 1;
            if c == b'"' {
                break;
            } else if c == b'\\' {
                let escaped = *bytes.get(pos)?;
                if !is_quoted_pair_text(escaped) {
                    return None;
                }
                local.push(escaped);
                pos += 1;
            } else if is_qtext(c) {
                local.push(c);
            } else {
                return None;
            }
        }
    } else {
        while let Some(&c) = bytes.get(pos) {
            if c == b'\\' {
                let escaped = *bytes.get(pos + 1)?;
                if !is_quoted_pair_text(escaped) {
                    return None;
                }
                local.push(escaped);
                pos += 2;
            } else if is_atext(c) {
                local.push(c);
                pos += 1;
            } else {
                break;
            }
        }

        // RFC 3696 section 3: no leading, trailing or consecutive periods
        if local.is_empty()
            || local[0] == b'.'
            || local[local.len() - 1] == b'.'
            || local.windows(2).any(|w| w == b"..")
        {
            return None;
        }
    }

    if bytes.get(pos) != Some(&b'@') {
        return None;
    }
    let domain = &input[pos + 1..];
    if domain.is_empty() {
        return None;
    }

    Some(Mailbox {
        local: String::from_utf8(local).ok()?,
        domain: domain.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_atom_mailboxes() {
        let m = parse_rfc2821_mailbox("Alice.Smith+tag@Example.com").unwrap();
        assert_eq!("Alice.Smith+tag", m.local);
        assert_eq!("Example.com", m.domain);

        assert!(parse_rfc2821_mailbox(".alice@example.com").is_none());
        assert!(parse_rfc2821_mailbox("alice.@example.com").is_none());
        assert!(parse_rfc2821_mailbox("al..ice@example.com").is_none());
        assert!(parse_rfc2821_mailbox("@example.com").is_none());
        assert!(parse_rfc2821_mailbox("alice@").is_none());
        assert!(parse_rfc2821_mailbox("alice").is_none());
        assert!(parse_rfc2821_mailbox("ali ce@example.com").is_none());
    }

    #[test]
    fn quoted_mailboxes() {
        let m = parse_rfc2821_mailbox("\"a b\"@example.com").unwrap();
        assert_eq!("a b", m.local);

        let m = parse_rfc2821_mailbox("\"a\\\"b\"@example.com").unwrap();
        assert_eq!("a\"b", m.local);

        assert!(parse_rfc2821_mailbox("\"unterminated@example.com").is_none());
        assert!(parse_rfc2821_mailbox("\"a\"b@example.com").is_none());
    }

    #[test]
    fn escaped_outside_quotes() {
        let m = parse_rfc2821_mailbox("a\\+b@example.com").unwrap();
        assert_eq!("a+b", m.local);
        let m = parse_rfc2821_mailbox("a\\ b@example.com").unwrap();
        assert_eq!("a b", m.local);
        assert!(parse_rfc2821_mailbox("ab\\").is_none());
    }
}
