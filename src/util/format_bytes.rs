use std::ascii;

pub fn format_byte_string<Bytes: IntoIterator<Item=u8>>(bytes: Bytes) -> String {
    bytes
        .into_iter()
        .flat_map(ascii::escape_default)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_bytes() {
        assert_eq!(format_byte_string(b"G90\n".iter().copied()), "G90\\n");
        assert_eq!(format_byte_string([0x85]), "\\x85");
    }
}
