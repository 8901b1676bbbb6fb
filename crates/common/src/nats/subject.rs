/// Encode an arbitrary string as a single NATS subject token.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX` (uppercase hex). The result never contains `.`, `*`, `>` or
/// whitespace, and distinct inputs map to distinct tokens.
pub fn subject_token(raw: &str) -> String {
    let mut token = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            token.push(byte as char);
        } else {
            token.push_str(&format!("%{:02X}", byte));
        }
    }
    token
}
