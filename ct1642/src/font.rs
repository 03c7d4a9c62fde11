//! Segment glyphs for the 4-digit 7-segment panels the CT1642 drives.
//!
//! The layout is for common-cathode displays wired the way set-top-box front
//! panels usually are: chip output Q2 drives segment A, down to Q9 for the
//! decimal point.  A glyph byte therefore reads `[A B C D E F G P]` from bit
//! 7 down to bit 0.  Alter the constants here if your panel is wired
//! differently.

//          A
//       -------
//      |       |
//    F |       | B
//       ---G---
//    E |       | C
//      |       |
//       ---D---   P

pub const SEG_A: u8 = 1 << 7;
pub const SEG_B: u8 = 1 << 6;
pub const SEG_C: u8 = 1 << 5;
pub const SEG_D: u8 = 1 << 4;
pub const SEG_E: u8 = 1 << 3;
pub const SEG_F: u8 = 1 << 2;
pub const SEG_G: u8 = 1 << 1;
pub const SEG_DP: u8 = 1 << 0;

/// All segments dark.
pub const BLANK: u8 = 0x00;
/// The decimal point segment on its own.
pub const DOT: u8 = SEG_DP;
/// On these panels the HH:MM colon is wired to the second digit's decimal
/// point output, so it shares the glyph.
pub const COLON: u8 = SEG_DP;
pub const HYPHEN: u8 = SEG_G;
pub const UNDERSCORE: u8 = SEG_D;
pub const OVERSCORE: u8 = SEG_A;

pub const LETTER_A: u8 = SEG_A | SEG_B | SEG_C | SEG_E | SEG_F | SEG_G;
pub const LETTER_B: u8 = SEG_C | SEG_D | SEG_E | SEG_F | SEG_G;
pub const LETTER_C: u8 = SEG_A | SEG_D | SEG_E | SEG_F;
pub const LETTER_D: u8 = SEG_B | SEG_C | SEG_D | SEG_E | SEG_G;
pub const LETTER_E: u8 = SEG_A | SEG_D | SEG_E | SEG_F | SEG_G;
pub const LETTER_F: u8 = SEG_A | SEG_E | SEG_F | SEG_G;
pub const LETTER_H: u8 = SEG_B | SEG_C | SEG_E | SEG_F | SEG_G;
pub const LETTER_L: u8 = SEG_D | SEG_E | SEG_F;
pub const LETTER_P: u8 = SEG_A | SEG_B | SEG_E | SEG_F | SEG_G;
pub const LETTER_R: u8 = SEG_E | SEG_G;
pub const LETTER_U: u8 = SEG_B | SEG_C | SEG_D | SEG_E | SEG_F;

/// Glyphs for the decimal digits 0 through 9.
pub const DIGITS: [u8; 10] = [
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F,
    SEG_B | SEG_C,
    SEG_A | SEG_B | SEG_D | SEG_E | SEG_G,
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_G,
    SEG_B | SEG_C | SEG_F | SEG_G,
    SEG_A | SEG_C | SEG_D | SEG_F | SEG_G,
    SEG_A | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G,
    SEG_A | SEG_B | SEG_C,
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G,
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_F | SEG_G,
];

/// Glyph for a decimal digit.
///
/// Total: out-of-range values get the hyphen glyph, the same substitution an
/// unmapped character gets.
pub fn digit_glyph(digit: u8) -> u8 {
    DIGITS.get(digit as usize).copied().unwrap_or(HYPHEN)
}

/// Glyph for one character of the panel's restricted character set: the
/// decimal digits, `-`, `A`, `b`, `C`, `d`, `E`, `F`, `r` and space.
///
/// Anything else renders as a hyphen rather than failing; on a front panel a
/// visible placeholder beats an error path nobody will handle.
pub fn char_glyph(character: char) -> u8 {
    match character {
        '0'..='9' => DIGITS[(character as u8 - b'0') as usize],
        '-' => HYPHEN,
        'A' => LETTER_A,
        'b' => LETTER_B,
        'C' => LETTER_C,
        'd' => LETTER_D,
        'E' => LETTER_E,
        'F' => LETTER_F,
        'r' => LETTER_R,
        ' ' => BLANK,
        _ => HYPHEN,
    }
}
