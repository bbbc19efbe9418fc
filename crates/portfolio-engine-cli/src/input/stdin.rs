use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Read a piped JSON or YAML document from stdin into a typed struct.
/// `None` for an interactive TTY or empty input.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    parse_document(trimmed).map(Some)
}

/// A document opening with `{` or `[` is JSON; anything else is YAML.
fn parse_document<T: DeserializeOwned>(text: &str) -> Result<T, Box<dyn std::error::Error>> {
    if text.starts_with('{') || text.starts_with('[') {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse JSON from stdin: {e}").into())
    } else {
        serde_yaml::from_str(text).map_err(|e| format!("Failed to parse YAML from stdin: {e}").into())
    }
}
