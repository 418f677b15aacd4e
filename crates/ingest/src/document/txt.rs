/// Decode document bytes. Invalid UTF-8 is replaced rather than rejected,
/// and CRLF line endings are normalized so paragraph breaks are `\n\n`.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    };
    if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}
