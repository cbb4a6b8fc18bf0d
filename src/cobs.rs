//! Consistent Overhead Byte Stuffing: 254-byte non-zero runs per block
//! (code byte `0xFF` for a full block with no embedded zero), a single
//! trailing `0x00` delimiter, and an empty-input special case that
//! encodes to `[0x01, 0x00]`.

use crate::error::CobsError;

const MAX_BLOCK_SIZE: u8 = 0xFF;

/// Encode `data` into a COBS frame terminated by a single `0x00` byte.
/// Infallible: any byte sequence, including one already containing
/// zeros, has a COBS encoding.
pub fn encode(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![0x01, 0x00];
    }

    let mut out = Vec::with_capacity(data.len() + data.len() / 254 + 2);
    let mut code_pos = 0usize;
    out.push(0); // placeholder for the first code byte
    let mut code: u8 = 1;

    for &b in data {
        if b == 0 {
            out[code_pos] = code;
            code_pos = out.len();
            out.push(0);
            code = 1;
        } else {
            out.push(b);
            code += 1;
            if code == MAX_BLOCK_SIZE {
                out[code_pos] = code;
                code_pos = out.len();
                out.push(0);
                code = 1;
            }
        }
    }
    out[code_pos] = code;
    out.push(0);
    out
}

/// Decode a COBS frame that includes its trailing `0x00` delimiter.
/// Callers that strip delimiters before calling this (e.g. the
/// reassembler) must re-append one first.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>, CobsError> {
    if frame.last() != Some(&0) {
        return Err(CobsError::Truncated);
    }
    let data = &frame[..frame.len() - 1];

    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0usize;
    while pos < data.len() {
        let code = data[pos] as usize;
        if code == 0 {
            return Err(CobsError::UnexpectedZero);
        }
        pos += 1;
        let end = pos + code - 1;
        if end > data.len() {
            return Err(CobsError::Truncated);
        }
        out.extend_from_slice(&data[pos..end]);
        pos = end;
        if code != MAX_BLOCK_SIZE as usize && pos < data.len() {
            out.push(0);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_special_case() {
        assert_eq!(encode(&[]), vec![0x01, 0x00]);
        assert_eq!(decode(&[0x01, 0x00]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn no_zeros_roundtrip() {
        let data = b"hello world".to_vec();
        let encoded = encode(&data);
        assert!(!encoded[..encoded.len() - 1].contains(&0));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn embedded_zeros_roundtrip() {
        let data = vec![0x11, 0x00, 0x00, 0x22, 0x33, 0x00];
        let encoded = encode(&data);
        assert!(!encoded[..encoded.len() - 1].contains(&0));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn long_run_without_zero_splits_at_block_boundary() {
        let data = vec![0xAB; 300];
        let encoded = encode(&data);
        assert_eq!(decode(&encoded).unwrap(), data);
        // A 300-byte zero-free run must split into more than one block.
        assert!(encoded.len() > data.len() + 1);
    }

    #[test]
    fn decode_rejects_missing_delimiter() {
        assert_eq!(decode(&[0x01]).unwrap_err(), CobsError::Truncated);
    }

    #[test]
    fn decode_rejects_truncated_block() {
        // code byte claims 5 following bytes but only 2 are present.
        assert_eq!(decode(&[0x06, 0x01, 0x02, 0x00]).unwrap_err(), CobsError::Truncated);
    }

    #[test]
    fn all_byte_values_roundtrip() {
        let data: Vec<u8> = (0..=255u16).map(|v| v as u8).collect();
        let encoded = encode(&data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }
}
