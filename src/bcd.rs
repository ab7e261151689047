//! binary-coded decimal helpers for `LD B, Vx` and the 16bit `BCD Vx, Vy`

/// hundreds, tens and units of an 8bit value
pub fn bcd8(num: u8) -> [u8; 3] {
    [num / 100, (num % 100) / 10, num % 10]
}

/// five decimal digits of a 16bit value, most significant first
pub fn bcd16(num: u16) -> [u8; 5] {
    [
        (num / 10_000) as u8,
        ((num % 10_000) / 1_000) as u8,
        ((num % 1_000) / 100) as u8,
        ((num % 100) / 10) as u8,
        (num % 10) as u8,
    ]
}
