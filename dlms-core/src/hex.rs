//! Hex rendering for trace output

use std::fmt::Write;

/// Format bytes as upper-case hex pairs separated by single spaces
///
/// ```
/// assert_eq!(dlms_core::hex::to_hex(&[0x7E, 0xA0, 0x07]), "7E A0 07");
/// ```
pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, b) in data.iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}
