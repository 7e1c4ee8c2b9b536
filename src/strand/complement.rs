/// Complement of a single nucleotide symbol.
///
/// Only the four canonical uppercase bases have a mapping; anything else
/// (lowercase, `N`, whitespace, punctuation) returns `None`.
pub const fn complement_of(symbol: char) -> Option<char> {
    match symbol {
        'A' => Some('T'),
        'T' => Some('A'),
        'C' => Some('G'),
        'G' => Some('C'),
        _ => None,
    }
}

/// Complement a whole strand, stopping at the first unmapped symbol.
///
/// An empty strand complements to an empty strand.
pub fn complement_strand(strand: &str) -> Option<String> {
    strand.chars().map(complement_of).collect()
}
