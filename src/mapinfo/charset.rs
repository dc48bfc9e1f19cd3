//! Windows-1251 output encoding
//!
//! Every file handed to the viewer is 8-bit Cyrillic. Characters outside the
//! code page become `?` instead of failing the write.

use encoding_rs::{EncoderResult, WINDOWS_1251};

/// Byte written in place of an unmappable character
pub const SUBSTITUTE: u8 = b'?';

/// Encoded text and the number of characters that had to be replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub substituted: usize,
}

pub fn encode_cp1251(text: &str) -> Encoded {
    let mut encoder = WINDOWS_1251.new_encoder();
    let mut bytes = Vec::with_capacity(text.len());
    let mut buffer = [0u8; 1024];
    let mut rest = text;
    let mut substituted = 0;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(rest, &mut buffer, true);
        bytes.extend_from_slice(&buffer[..written]);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            // The unmappable character is already consumed
            EncoderResult::Unmappable(_) => {
                bytes.push(SUBSTITUTE);
                substituted += 1;
            }
        }
    }

    Encoded { bytes, substituted }
}
