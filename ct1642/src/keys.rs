//! Key-scan results for the up-to-8-key front panel matrix behind the
//! CT1642's single key-sense output.

/// Code reported by [`KeyScan::key_code`] when no key was down during the
/// scan pass.
pub const NO_KEY_CODE: u8 = 9;

/// One of the eight keys the chip can scan.
///
/// Key Kn sits on scan line n-1: the chip sees it when the one-hot select
/// code `1 << (n - 1)` is loaded in the segment outputs.  Electrically K1 is
/// the key wired to output Q9, K8 the one on Q2.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::VariantArray)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
}

impl Key {
    /// The 1-indexed identifier this key contributes to a legacy key code.
    pub fn key_number(self) -> u8 {
        match self {
            Self::K1 => 1,
            Self::K2 => 2,
            Self::K3 => 3,
            Self::K4 => 4,
            Self::K5 => 5,
            Self::K6 => 6,
            Self::K7 => 7,
            Self::K8 => 8,
        }
    }

    /// The 0-based scan line this key answers on.
    pub fn scan_line(self) -> u8 {
        self.key_number() - 1
    }

    fn from_scan_line(line: u8) -> Option<Self> {
        match line {
            0 => Some(Self::K1),
            1 => Some(Self::K2),
            2 => Some(Self::K3),
            3 => Some(Self::K4),
            4 => Some(Self::K5),
            5 => Some(Self::K6),
            6 => Some(Self::K7),
            7 => Some(Self::K8),
            _ => None,
        }
    }
}

/// The scan lines that read back active during one pass of
/// [`crate::Ct1642::scan_keys`]: bit n set means the key on scan line n was
/// down.
///
/// The struct is an [`Iterator`] over the pressed [`Key`]s; iterating
/// consumes the state, so clone first if you also need the aggregate views.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyScan(u8);

impl KeyScan {
    pub(crate) fn new(lines: u8) -> Self {
        Self(lines)
    }

    /// Quickly check whether *any* key was down.
    pub fn any_pressed(&self) -> bool {
        self.0 != 0
    }

    /// Whether this specific key was down.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.0 & (1 << key.scan_line()) != 0
    }

    /// The legacy front-panel key code: the sum of the 1-indexed identifiers
    /// of every key held, or [`NO_KEY_CODE`] when none were.
    ///
    /// The identifiers are sequential rather than powers of two, so chords
    /// produce an ambiguous sum (K3 + K6 reads the same as K4 + K5, and the
    /// same as the no-key sentinel).  That is the contract the appliance
    /// firmware this chip ships in has always had; use [`Self::is_pressed`]
    /// or iteration when you need the keys unambiguously.
    pub fn key_code(&self) -> u8 {
        if !self.any_pressed() {
            return NO_KEY_CODE;
        }

        self.clone().map(Key::key_number).sum()
    }

    /// Report one pressed key and clear it from the state, lowest scan line
    /// first.
    fn pop_key(&mut self) -> Option<Key> {
        if self.0 == 0 {
            return None;
        }

        let line = self.0.trailing_zeros() as u8;
        self.0 &= !(1 << line);

        Key::from_scan_line(line)
    }
}

impl Iterator for KeyScan {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        self.pop_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::VariantArray;

    #[test]
    fn key_numbers_and_scan_lines_round_trip() {
        for key in Key::VARIANTS {
            let number = key.key_number();
            assert!((1..=8).contains(&number));
            assert_eq!(number - 1, key.scan_line());
            assert_eq!(Some(*key), Key::from_scan_line(key.scan_line()));
        }

        assert!(Key::from_scan_line(8).is_none());
    }

    #[test]
    fn empty_scan_reports_the_sentinel() {
        let scan = KeyScan::new(0);

        assert!(!scan.any_pressed());
        assert_eq!(NO_KEY_CODE, scan.key_code());
        for key in Key::VARIANTS {
            assert!(!scan.is_pressed(*key));
        }
        assert_eq!(0, scan.count());
    }

    #[test]
    fn single_keys_code_as_their_identifier() {
        for key in Key::VARIANTS {
            let scan = KeyScan::new(1 << key.scan_line());

            assert!(scan.any_pressed());
            assert!(scan.is_pressed(*key));
            assert_eq!(key.key_number(), scan.key_code());
            assert_eq!(Some(*key), scan.clone().next());
            assert_eq!(1, scan.count());
        }
    }

    #[test]
    fn chords_sum_their_identifiers() {
        // K3 (identifier 3) and K6 (identifier 6); the sum happens to
        // collide with the no-key sentinel, which the original firmware
        // contract accepts
        let scan = KeyScan::new((1 << 2) | (1 << 5));

        assert_eq!(9, scan.key_code());
        assert!(scan.is_pressed(Key::K3));
        assert!(scan.is_pressed(Key::K6));
        assert!(!scan.is_pressed(Key::K1));
    }

    #[test]
    fn iteration_pops_lowest_scan_line_first() {
        let scan = KeyScan::new(0b1010_0001);

        let pressed: std::vec::Vec<Key> = scan.collect();
        assert_eq!(vec![Key::K1, Key::K6, Key::K8], pressed);
    }

    #[test]
    fn all_keys_down() {
        let scan = KeyScan::new(0xff);

        assert_eq!(36, scan.key_code());
        assert_eq!(8, scan.count());
    }
}
