//! Store name resolution.
//!
//! A store without an explicit name lives under the pluralized, lower-cased
//! name of its record type: `Film` records go to `films`.

use crate::models::Record;

/// Words whose plural is the same as the singular.
const UNCOUNTABLE: &[&str] = &[
    "data",
    "deer",
    "equipment",
    "fish",
    "information",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

/// Irregular plurals matched as a suffix, so `Salesperson` becomes `Salespeople`.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("woman", "women"),
    ("man", "men"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
];

/// Irregular plurals matched only as a whole word (`Box` is not `Boxen`).
const IRREGULAR_WORD: &[(&str, &str)] = &[("louse", "lice"), ("ox", "oxen")];

/// Words ending in `man` that pluralize regularly, matched as a suffix so
/// `Superhuman` follows `human`.
const REGULAR_MAN: &[&str] = &["caiman", "german", "human", "roman", "shaman", "talisman"];

/// `-f`/`-fe` words that take `-ves`.
const VES: &[(&str, &str)] = &[
    ("calf", "calves"),
    ("elf", "elves"),
    ("half", "halves"),
    ("knife", "knives"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("loaf", "loaves"),
    ("self", "selves"),
    ("shelf", "shelves"),
    ("thief", "thieves"),
    ("wife", "wives"),
    ("wolf", "wolves"),
];

/// Latin `-us` words that take `-i`.
const LATIN_US: &[&str] = &[
    "alumnus", "cactus", "fungus", "nucleus", "octopus", "radius", "stimulus", "virus",
];

/// `-o` words that take `-oes`.
const OES: &[&str] = &["buffalo", "echo", "hero", "potato", "tomato", "veto"];

/// Resolves the on-disk name of a store of `T`.
///
/// An explicit `name` wins unchanged; otherwise the record's
/// [`type_name`](Record::type_name) is pluralized and lower-cased.
pub fn resolve_name<T: Record>(name: Option<&str>) -> String {
    name.map_or_else(|| pluralize(&T::type_name()).to_lowercase(), str::to_string)
}

/// Pluralizes an English noun, preserving the casing of the unchanged stem.
///
/// The rules are deterministic: uncountables, irregulars, a handful of
/// suffix rules, then a plain `s`.
///
/// ```rust
/// use flatstore::pluralize;
///
/// assert_eq!(pluralize("Film"), "Films");
/// assert_eq!(pluralize("Category"), "Categories");
/// assert_eq!(pluralize("Person"), "People");
/// ```
#[must_use]
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || !word.is_ascii() {
        return format!("{word}s");
    }

    let lower = word.to_ascii_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }

    if let Some((singular, plural)) = IRREGULAR_WORD.iter().find(|(s, _)| lower == *s) {
        return replace_suffix(word, singular.len(), plural);
    }

    if !REGULAR_MAN.iter().any(|w| lower.ends_with(w)) {
        if let Some((singular, plural)) = IRREGULAR.iter().find(|(s, _)| lower.ends_with(s)) {
            return replace_suffix(word, singular.len(), plural);
        }
    }

    if let Some((singular, plural)) = VES.iter().find(|(s, _)| lower.ends_with(s)) {
        return replace_suffix(word, singular.len(), plural);
    }

    if LATIN_US.iter().any(|w| lower.ends_with(w)) {
        return replace_suffix(word, 2, "i");
    }

    if OES.iter().any(|w| lower.ends_with(w)) {
        return format!("{word}es");
    }

    if lower.ends_with("matrix") || lower.ends_with("vertex") || lower.ends_with("index") {
        return replace_suffix(word, 2, "ices");
    }

    if lower.ends_with("tum") || lower.ends_with("ium") {
        return replace_suffix(word, 2, "a");
    }

    if lower.ends_with("is") {
        return replace_suffix(word, 2, "es");
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }

    if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        return replace_suffix(word, 1, "ies");
    }

    format!("{word}s")
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev().skip(1);
    !lower.ends_with("quy") && matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

/// Replaces the last `len` bytes of `word` with `plural`, keeping the
/// word's leading capital when the whole word was replaced.
fn replace_suffix(word: &str, len: usize, plural: &str) -> String {
    let stem = &word[..word.len() - len];
    if stem.is_empty() && word.starts_with(|c: char| c.is_ascii_uppercase()) {
        let mut chars = plural.chars();
        return chars.next().map_or_else(String::new, |first| {
            first.to_ascii_uppercase().to_string() + chars.as_str()
        });
    }
    format!("{stem}{plural}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use test_case::test_case;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Film;
    impl Record for Film {}

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Category;
    impl Record for Category {}

    #[test_case("Film", "Films")]
    #[test_case("Category", "Categories")]
    #[test_case("Day", "Days")]
    #[test_case("Box", "Boxes")]
    #[test_case("Address", "Addresses")]
    #[test_case("Match", "Matches")]
    #[test_case("Wish", "Wishes")]
    #[test_case("Person", "People")]
    #[test_case("Salesperson", "Salespeople")]
    #[test_case("Child", "Children")]
    #[test_case("Woman", "Women")]
    #[test_case("Human", "Humans")]
    #[test_case("Superhuman", "Superhumans")]
    #[test_case("Chairman", "Chairmen")]
    #[test_case("Leaf", "Leaves")]
    #[test_case("Knife", "Knives")]
    #[test_case("Analysis", "Analyses")]
    #[test_case("Virus", "Viri")]
    #[test_case("Status", "Statuses")]
    #[test_case("Hero", "Heroes")]
    #[test_case("Photo", "Photos")]
    #[test_case("Index", "Indices")]
    #[test_case("Medium", "Media")]
    #[test_case("Series", "Series")]
    #[test_case("Metadata", "Metadata")]
    #[test_case("Ox", "Oxen")]
    #[test_case("Price", "Prices")]
    #[test_case("Soliloquy", "Soliloquies")]
    fn test_pluralize(singular: &str, plural: &str) {
        assert_eq!(pluralize(singular), plural);
    }

    #[test]
    fn test_pluralize_non_ascii_appends_s() {
        assert_eq!(pluralize("Café"), "Cafés");
    }

    #[test]
    fn test_resolve_name_from_type() {
        assert_eq!(resolve_name::<Film>(None), "films");
        assert_eq!(resolve_name::<Category>(None), "categories");
    }

    #[test]
    fn test_resolve_name_override_is_verbatim() {
        assert_eq!(resolve_name::<Film>(Some("Movies")), "Movies");
    }
}
