/// Why an upload filename was rejected.
#[derive(Debug)]
pub enum FilenameError {
    Empty,
    TooLong,
    ContainsPathSeparator,
    NullByte,
    /// CR, LF and friends would allow header injection via `Content-Disposition`.
    ControlCharacter,
}

impl FilenameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::TooLong => "Filename exceeds 255 bytes",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
        }
    }
}

/// Validate the `filename` an uploader attaches to media.
pub fn validate_upload_name(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }
    if trimmed.len() > 255 {
        return Err(FilenameError::TooLong);
    }
    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    Ok(trimmed)
}

/// Build a `Content-Disposition` header value for a download.
pub fn content_disposition_value(filename: Option<&str>) -> String {
    let Some(filename) = filename else {
        return "inline".to_string();
    };

    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
