//! The Internet checksum ([RFC 1071]) as used by `ICMPv4`.
//!
//! The checksum is the one's complement of the one's complement sum of all
//! 16-bit big-endian words of the data, with any trailing odd byte padded with
//! a zero byte.  When computing a checksum to be written into a packet the
//! word holding the checksum field is skipped.
//!
//! [RFC 1071]: https://datatracker.ietf.org/doc/html/rfc1071

/// Index of the checksum word within an `ICMPv4` header.
const ICMP_CHECKSUM_WORD: usize = 1;

/// Calculate the checksum for an `Ipv4` `ICMP` packet (header and payload).
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    checksum(data, Some(ICMP_CHECKSUM_WORD))
}

/// Does `data`, including its embedded checksum field, verify?
///
/// Summing every word of correctly checksummed data, checksum included, folds
/// to `0xffff`.
#[must_use]
pub fn is_valid(data: &[u8]) -> bool {
    !data.is_empty() && fold(sum_be_words(data, None)) == 0xffff
}

fn checksum(data: &[u8], skip_word: Option<usize>) -> u16 {
    if data.is_empty() {
        return 0;
    }
    !fold(sum_be_words(data, skip_word))
}

fn sum_be_words(data: &[u8], skip_word: Option<usize>) -> u32 {
    let mut words = data.chunks_exact(2);
    let mut sum = words
        .by_ref()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip_word)
        .map(|(_, word)| u32::from(u16::from_be_bytes([word[0], word[1]])))
        .fold(0_u32, u32::wrapping_add);
    if let [last] = words.remainder() {
        if Some(data.len() / 2) != skip_word {
            sum = sum.wrapping_add(u32::from(*last) << 8);
        }
    }
    sum
}

const fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }
    sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use test_case::test_case;

    #[test]
    fn test_empty() {
        assert_eq!(0, icmp_ipv4_checksum(&[]));
        assert!(!is_valid(&[]));
    }

    #[test]
    fn test_odd_length_pads_with_zero() {
        assert_eq!(0xfeff, icmp_ipv4_checksum(&[0x01]));
        assert_eq!(0xf6ff, icmp_ipv4_checksum(&hex!("08 00 00 00 01")));
    }

    #[test_case(&hex!("08 00 00 00 12 34 00 01"), 0xe5ca; "echo request no payload")]
    #[test_case(&hex!("00 00 00 00 12 34 00 01"), 0xedca; "echo reply no payload")]
    #[test_case(&hex!("08 00 ff ff 00 00 00 00"), 0xf7ff; "checksum field ignored")]
    #[test_case(&hex!("08 00 00 00 ff ff ff ff ff ff"), 0xf7ff; "carry folded")]
    fn test_icmp_ipv4_checksum(bytes: &[u8], expected: u16) {
        assert_eq!(expected, icmp_ipv4_checksum(bytes));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(&hex!("08 00 e5 ca 12 34 00 01")));
        assert!(is_valid(&hex!("00 00 ed ca 12 34 00 01")));
        assert!(!is_valid(&hex!("00 00 ed cb 12 34 00 01")));
        assert!(is_valid(&hex!(
            "45 00 00 54 1c 46 40 00 40 01 9c 4a c0 a8 00 01 c0 a8 00 c7"
        )));
    }

    #[test]
    fn test_computed_checksum_verifies() {
        let mut bytes = hex!("08 00 00 00 00 2a 00 07 22 48 65 6c 6c 6f 21 22 ff");
        let checksum = icmp_ipv4_checksum(&bytes);
        bytes[2..4].copy_from_slice(&checksum.to_be_bytes());
        assert!(is_valid(&bytes));
    }
}
