use base64::{engine::general_purpose::STANDARD, Engine};

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Encodes a stored image column for the browser.
pub fn to_data_uri(bytes: &[u8]) -> String {
    format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(bytes))
}

/// Accepts either a `data:<mime>;base64,` URI or bare base64.
pub fn from_data_uri(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match input.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => input,
    };
    STANDARD.decode(payload.trim())
}
