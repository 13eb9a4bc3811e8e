pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize + 7) / 8
}

/// read bit `index` of an LSB-first packed byte slice
pub(crate) fn get_bit(bytes: &[u8], index: usize) -> bool {
    let byte = bytes.get(index / 8).copied().unwrap_or(0);
    byte & (1 << (index % 8)) != 0
}

/// set bit `index` of an LSB-first packed byte slice
pub(crate) fn set_bit(bytes: &mut [u8], index: usize, value: bool) {
    if let Some(byte) = bytes.get_mut(index / 8) {
        let mask = 1 << (index % 8);
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculates_number_of_bytes_needed_for_count_of_packed_bits() {
        assert_eq!(num_bytes_for_bits(7), 1);
        assert_eq!(num_bytes_for_bits(8), 1);
        assert_eq!(num_bytes_for_bits(9), 2);
        assert_eq!(num_bytes_for_bits(15), 2);
        assert_eq!(num_bytes_for_bits(16), 2);
        assert_eq!(num_bytes_for_bits(17), 3);
        assert_eq!(num_bytes_for_bits(0xFFFF), 8192); // ensure that it's free from overflow
    }

    #[test]
    fn packs_bits_least_significant_first() {
        let mut bytes = [0u8; 2];
        set_bit(&mut bytes, 0, true);
        set_bit(&mut bytes, 2, true);
        set_bit(&mut bytes, 8, true);
        assert_eq!(bytes, [0x05, 0x01]);
        assert!(get_bit(&bytes, 0));
        assert!(!get_bit(&bytes, 1));
        assert!(get_bit(&bytes, 2));
        assert!(get_bit(&bytes, 8));
        assert!(!get_bit(&bytes, 15));
    }

    #[test]
    fn clearing_a_bit_leaves_others_untouched() {
        let mut bytes = [0xFFu8];
        set_bit(&mut bytes, 3, false);
        assert_eq!(bytes, [0xF7]);
    }
}
