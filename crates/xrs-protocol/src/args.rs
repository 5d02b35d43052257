//! Payload helpers for AT notification lines
//!
//! Notifications look like `+WGCHSQ: 1,40,476.425,476.425,"CH40"`: a prefix
//! terminated by `:`, followed by comma-separated arguments. String arguments
//! are double-quoted and may contain commas.

/// Extract the payload after `prefix`, trimming surrounding whitespace
///
/// Returns `None` if the prefix does not occur in the line.
pub fn extract_payload<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let pos = line.find(prefix)?;
    Some(line[pos + prefix.len()..].trim())
}

/// Split a comma-separated payload into fields, keeping quoted strings intact
///
/// Whitespace around each field is trimmed; quotes are preserved. A trailing
/// comma does not produce an empty final field.
pub fn split_args(payload: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in payload.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(payload[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < payload.len() {
        fields.push(payload[start..].trim());
    }

    fields
}

/// Strip one pair of surrounding double quotes and any spaces/tabs inside them
pub fn unquote(field: &str) -> &str {
    let field = field.strip_prefix('"').unwrap_or(field);
    let field = field.strip_suffix('"').unwrap_or(field);
    field.trim_matches(|c| c == ' ' || c == '\t')
}

/// Parse a leading decimal integer the way `%d` does
///
/// Leading whitespace and an optional sign are accepted; anything after the
/// digits is ignored. Returns `None` if no digits are present.
pub fn leading_int(field: &str) -> Option<i64> {
    let field = field.trim_start();
    let (sign, rest) = match field.as_bytes().first() {
        Some(b'-') => (-1, &field[1..]),
        Some(b'+') => (1, &field[1..]),
        _ => (1, field),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse::<i64>().ok().map(|v| sign * v)
}
