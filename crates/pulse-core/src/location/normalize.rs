//! Canonical state names.
//!
//! The enrollment data spells some states several ways (historic names,
//! `&` vs `and`, stray casing). Everything shown or sent is folded to one
//! canonical form here.

use std::collections::BTreeSet;

/// Known variants, keyed by lowercased, whitespace-collapsed spelling.
const STATE_ALIASES: &[(&str, &str)] = &[
    ("orissa", "Odisha"),
    ("odisha", "Odisha"),
    ("pondicherry", "Puducherry"),
    ("puducherry", "Puducherry"),
    ("uttaranchal", "Uttarakhand"),
    ("uttarakhand", "Uttarakhand"),
    ("west bangal", "West Bengal"),
    ("westbengal", "West Bengal"),
    ("west bengli", "West Bengal"),
    ("west bengal", "West Bengal"),
    ("jammu & kashmir", "Jammu and Kashmir"),
    ("jammu and kashmir", "Jammu and Kashmir"),
    ("andaman & nicobar islands", "Andaman and Nicobar Islands"),
    ("andaman and nicobar islands", "Andaman and Nicobar Islands"),
    ("dadra & nagar haveli", "Dadra and Nagar Haveli and Daman and Diu"),
    ("dadra and nagar haveli", "Dadra and Nagar Haveli and Daman and Diu"),
    ("daman & diu", "Dadra and Nagar Haveli and Daman and Diu"),
    ("daman and diu", "Dadra and Nagar Haveli and Daman and Diu"),
    (
        "the dadra and nagar haveli and daman and diu",
        "Dadra and Nagar Haveli and Daman and Diu",
    ),
    (
        "dadra and nagar haveli and daman and diu",
        "Dadra and Nagar Haveli and Daman and Diu",
    ),
    ("chhatisgarh", "Chhattisgarh"),
    ("chhattisgarh", "Chhattisgarh"),
    ("tamilnadu", "Tamil Nadu"),
    ("tamil nadu", "Tamil Nadu"),
    ("telengana", "Telangana"),
    ("nct of delhi", "Delhi"),
    ("delhi", "Delhi"),
];

/// Words kept lowercase when title-casing an unknown name.
const LOWERCASE_WORDS: &[&str] = &["and", "of", "the"];

/// Map a raw state name to its canonical spelling.
///
/// Returns `None` for blank input. Names not in the alias table are trimmed,
/// whitespace-collapsed and title-cased.
pub fn canonical_state_name(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let key = collapsed.to_lowercase();
    if let Some((_, canonical)) = STATE_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return Some(canonical.to_string());
    }

    Some(title_case(&key))
}

fn title_case(lower: &str) -> String {
    lower
        .split(' ')
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && LOWERCASE_WORDS.contains(&word) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalize, deduplicate and sort a raw state list.
pub fn normalize_state_list<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|name| canonical_state_name(name.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(canonical_state_name("Orissa").as_deref(), Some("Odisha"));
        assert_eq!(canonical_state_name("ORISSA").as_deref(), Some("Odisha"));
        assert_eq!(canonical_state_name("  west   Bangal ").as_deref(), Some("West Bengal"));
        assert_eq!(
            canonical_state_name("Jammu & Kashmir").as_deref(),
            Some("Jammu and Kashmir")
        );
    }

    #[test]
    fn test_unknown_names_title_cased() {
        assert_eq!(canonical_state_name("andhra pradesh").as_deref(), Some("Andhra Pradesh"));
        assert_eq!(canonical_state_name("KERALA").as_deref(), Some("Kerala"));
        assert_eq!(canonical_state_name("   "), None);
    }

    #[test]
    fn test_list_deduplicated_and_sorted() {
        let raw = ["orissa", "Odisha", "Kerala", "ODISHA", "", "bihar", "Pondicherry"];
        assert_eq!(
            normalize_state_list(raw),
            vec!["Bihar", "Kerala", "Odisha", "Puducherry"]
        );
    }
}
