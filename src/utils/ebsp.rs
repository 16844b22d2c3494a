use bytes::{BufMut, BytesMut};

/// Removes emulation prevention bytes from EBSP data.
///
/// Every `0x03` that follows two zero bytes is dropped; the zero count
/// restarts after a removed byte.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut buffer = BytesMut::with_capacity(data.len());
    let mut zeros = 0usize;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        buffer.put_u8(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }

    buffer.to_vec()
}

/// Inserts emulation prevention bytes so the output never contains
/// `00 00 0x` with `x <= 3`.
pub fn insert_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut buffer = BytesMut::with_capacity(data.len() + data.len() / 2);
    let mut zeros = 0usize;

    for &byte in data {
        if zeros >= 2 && byte <= 0x03 {
            buffer.put_u8(0x03);
            zeros = 0;
        }
        buffer.put_u8(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }

    buffer.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_remove_emulation_prevention() {
        let input = vec![0x00, 0x00, 0x03, 0x01];
        assert_eq!(remove_emulation_prevention(&input), vec![0x00, 0x00, 0x01]);

        let input = vec![0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x02];
        assert_eq!(
            remove_emulation_prevention(&input),
            vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x02]
        );

        // Back to back escapes
        let input = vec![0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00];
        assert_eq!(remove_emulation_prevention(&input), vec![0x00; 5]);

        let input = vec![0x00, 0x01, 0x02, 0x03];
        assert_eq!(remove_emulation_prevention(&input), input);
    }

    #[test]
    fn test_insert_emulation_prevention() {
        assert_eq!(
            insert_emulation_prevention(&[0x00, 0x00, 0x00, 0x00, 0x80]),
            vec![0x00, 0x00, 0x03, 0x00, 0x00, 0x80]
        );
        assert_eq!(
            insert_emulation_prevention(&[0x00, 0x00, 0x04]),
            vec![0x00, 0x00, 0x04]
        );
    }

    #[quickcheck]
    fn prop_escape_round_trip(data: Vec<u8>) -> bool {
        let escaped = insert_emulation_prevention(&data);
        let no_start_code = escaped
            .windows(3)
            .all(|w| !(w[0] == 0 && w[1] == 0 && w[2] <= 2));
        no_start_code && remove_emulation_prevention(&escaped) == data
    }
}
