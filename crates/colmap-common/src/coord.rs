//! Column letter conversion for A1-style references.

/// Largest 0-based column index addressable in a worksheet (`XFD`).
pub const COL_MAX: u32 = 16_383;

/// Largest 1-based row number addressable in a worksheet.
pub const ROW_MAX: u32 = 1_048_576;

/// Convert a 0-based column index into its letter form (`0 -> A`, `27 -> AB`).
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_columns() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(25), "Z");
    }

    #[test]
    fn multi_letter_columns() {
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(27), "AB");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
        assert_eq!(column_to_letters(COL_MAX), "XFD");
    }
}
