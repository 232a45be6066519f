//! Alternate spellings accepted for schema features.
//!
//! Upstream forms have used both accented and unaccented spellings of some
//! field names. An alias only applies when exactly one spelling of the pair is
//! a schema feature; the answer is then written under the schema's name.

use std::collections::HashMap;

use crate::schema::SchemaRegistry;
use crate::text::fold_accents;

/// Spelling pairs known to appear in upstream forms.
pub const DEFAULT_ALIAS_PAIRS: &[(&str, &str)] = &[("Exterieur_vegetalisé", "Exterieur_vegetalise")];

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// alias -> schema feature name
    map: HashMap<String, String>,
}

impl AliasTable {
    /// Build the table for a registry from explicit pairs plus the
    /// accent-folded spelling of every non-ASCII feature name.
    pub fn for_registry(registry: &SchemaRegistry, pairs: &[(&str, &str)]) -> Self {
        let mut map = HashMap::new();

        for &(a, b) in pairs {
            match (registry.contains(a), registry.contains(b)) {
                (true, false) => {
                    map.insert(b.to_string(), a.to_string());
                }
                (false, true) => {
                    map.insert(a.to_string(), b.to_string());
                }
                _ => {}
            }
        }

        for name in registry.feature_names() {
            let folded = fold_accents(name);
            if folded != *name && !registry.contains(&folded) {
                map.entry(folded).or_insert_with(|| name.clone());
            }
        }

        Self { map }
    }

    /// Schema name for an answer key, or `None` when the key is neither a
    /// feature nor a known alias.
    pub fn resolve<'a>(&'a self, registry: &SchemaRegistry, key: &'a str) -> Option<&'a str> {
        if registry.contains(key) {
            return Some(key);
        }
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn registry(features: &[&str]) -> SchemaRegistry {
        SchemaRegistry::from_parts(
            features.iter().map(|s| s.to_string()).collect(),
            vec![],
            BTreeMap::new(),
            BTreeMap::new(),
            None,
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn pair_maps_absent_spelling_to_schema_spelling() {
        let reg = registry(&["Exterieur_vegetalisé"]);
        let aliases = AliasTable::for_registry(&reg, DEFAULT_ALIAS_PAIRS);
        assert_eq!(
            aliases.resolve(&reg, "Exterieur_vegetalise"),
            Some("Exterieur_vegetalisé")
        );
        assert_eq!(
            aliases.resolve(&reg, "Exterieur_vegetalisé"),
            Some("Exterieur_vegetalisé")
        );

        let reg = registry(&["Exterieur_vegetalise"]);
        let aliases = AliasTable::for_registry(&reg, DEFAULT_ALIAS_PAIRS);
        assert_eq!(
            aliases.resolve(&reg, "Exterieur_vegetalisé"),
            Some("Exterieur_vegetalise")
        );
    }

    #[test]
    fn no_alias_when_both_spellings_are_features() {
        let reg = registry(&["Exterieur_vegetalise", "Exterieur_vegetalisé"]);
        let aliases = AliasTable::for_registry(&reg, DEFAULT_ALIAS_PAIRS);
        assert!(aliases.is_empty());
    }

    #[test]
    fn accent_folded_names_are_accepted() {
        let reg = registry(&["Tiques_semaines_précédentes", "Boiterie"]);
        let aliases = AliasTable::for_registry(&reg, &[]);
        assert_eq!(
            aliases.resolve(&reg, "Tiques_semaines_precedentes"),
            Some("Tiques_semaines_précédentes")
        );
        assert_eq!(aliases.resolve(&reg, "Unrelated"), None);
    }
}
