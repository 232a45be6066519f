//! Small text helpers shared by the record builder, coercion and export code.

use unicode_normalization::UnicodeNormalization;

/// Strip diacritics via NFKD decomposition, keeping ASCII only.
///
/// `"Fibrinogène_normal"` becomes `"Fibrinogene_normal"`.
pub fn fold_accents(s: &str) -> String {
    s.nfkd().filter(char::is_ascii).collect()
}

/// Lowercased, trimmed, accent-folded form used for case/accent-insensitive
/// comparisons.
pub fn fold_lower(s: &str) -> String {
    fold_accents(s.trim()).to_ascii_lowercase()
}

/// File-name friendly key: trimmed, accent-folded, spaces replaced by `_`.
pub fn normalize_key(s: &str) -> String {
    fold_accents(s.trim()).replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_accents_drops_diacritics_only() {
        assert_eq!(fold_accents("Exterieur_vegetalisé"), "Exterieur_vegetalise");
        assert_eq!(fold_accents("Tiques_semaines_précédentes"), "Tiques_semaines_precedentes");
        assert_eq!(fold_accents("plain"), "plain");
    }

    #[test]
    fn fold_lower_trims_and_lowercases() {
        assert_eq!(fold_lower("  Intermédiaire "), "intermediaire");
        assert_eq!(fold_lower("VRAI"), "vrai");
    }

    #[test]
    fn normalize_key_builds_file_stem() {
        assert_eq!(normalize_key(" Éclair du Bois "), "Eclair_du_Bois");
        assert_eq!(normalize_key(""), "");
    }
}
