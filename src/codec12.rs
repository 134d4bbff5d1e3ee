//! Codec 12 downlink frames for the device command channel.
//!
//! The firmware accepts injected text commands wrapped in a Codec 12 frame.
//! On this transport the frame travels as hexadecimal ASCII:
//!
//! ```text
//! [ codec id: 0C ][ quantity: 01 ][ type: 05 ][ length: 8 hex digits, u32 BE ]
//! [ command bytes, hex ][ terminator: 0D 0A ][ quantity: 01 ]
//! ```
//!
//! The length field counts the command bytes plus the CR LF terminator; it
//! does not count itself, the codec id, the type, or the quantity bytes.

use thiserror::Error;

/// Codec 12 framing marker.
pub const CODEC_ID: u8 = 0x0C;

/// "Set parameter" command class.
pub const COMMAND_TYPE: u8 = 0x05;

const COMMAND_QUANTITY: u8 = 0x01;
const TERMINATOR: [u8; 2] = [0x0D, 0x0A];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("command too long for length field: {0} bytes")]
    CommandTooLong(usize),
}

/// Encode a text command into its hex-rendered downlink frame.
///
/// Deterministic and storage-free; the only failure is a command whose
/// byte length no longer fits the 4-byte length field.
pub fn encode_downlink(command_text: &str) -> Result<String, CodecError> {
    let payload = command_text.as_bytes();
    let framed_len = payload.len() + TERMINATOR.len();
    if framed_len > u32::MAX as usize {
        return Err(CodecError::CommandTooLong(payload.len()));
    }

    let mut frame = String::with_capacity(2 * (3 + 4 + framed_len + 1));
    frame.push_str(&format!(
        "{CODEC_ID:02X}{COMMAND_QUANTITY:02X}{COMMAND_TYPE:02X}{:08X}",
        framed_len as u32
    ));
    for byte in payload.iter().chain(TERMINATOR.iter()) {
        frame.push_str(&format!("{byte:02X}"));
    }
    frame.push_str(&format!("{COMMAND_QUANTITY:02X}"));

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Undo the hex rendering: returns the length field value and the
    /// command text recovered from the payload bytes.
    fn decode_frame(frame: &str) -> (u32, String) {
        assert_eq!(&frame[0..2], "0C", "codec id");
        assert_eq!(&frame[2..4], "01", "leading quantity");
        assert_eq!(&frame[4..6], "05", "command type");

        let length = u32::from_str_radix(&frame[6..14], 16).expect("length field");
        let payload_hex = &frame[14..14 + 2 * length as usize];
        let bytes: Vec<u8> = (0..payload_hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&payload_hex[i..i + 2], 16).expect("hex byte"))
            .collect();

        assert_eq!(&bytes[bytes.len() - 2..], &[0x0D, 0x0A], "terminator");
        assert_eq!(&frame[14 + 2 * length as usize..], "01", "trailing quantity");

        let text = String::from_utf8(bytes[..bytes.len() - 2].to_vec()).expect("utf8");
        (length, text)
    }

    #[test]
    fn length_field_counts_terminator() {
        let frame = encode_downlink("setdigout 0").expect("encode");
        // "setdigout 0" is 11 bytes, plus CR LF
        assert_eq!(&frame[6..14], "0000000D");
    }

    #[test]
    fn known_engage_frame() {
        let frame = encode_downlink("setdigout 1 3600").expect("encode");
        assert!(frame.starts_with("0C010500000012"));
        assert!(frame.ends_with("0D0A01"));
    }

    #[test]
    fn roundtrip_recovers_command_text() {
        for cmd in ["setdigout 0", "setdigout 1 3600", "getparam 11104"] {
            let frame = encode_downlink(cmd).expect("encode");
            let (length, text) = decode_frame(&frame);
            assert_eq!(length as usize, cmd.len() + 2);
            assert_eq!(text, cmd);
        }
    }

    #[test]
    fn empty_command_is_just_terminator() {
        let frame = encode_downlink("").expect("encode");
        assert_eq!(frame, "0C0105000000020D0A01");
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode_downlink("setdigout 1 3600").expect("encode");
        let b = encode_downlink("setdigout 1 3600").expect("encode");
        assert_eq!(a, b);
    }
}
