use crate::LookupMode;
use itertools::Itertools;
use shared_kernel::region_name::RegionName;

pub fn is_match(candidate: &str, query: &str, mode: LookupMode) -> bool {
    match mode {
        LookupMode::Exact => candidate == query,
        LookupMode::Substring => candidate.to_lowercase().contains(&query.to_lowercase()),
    }
}

/// Keeps the names matching `query`, first occurrence wins.
pub fn filter_matches<I>(names: I, query: &str, mode: LookupMode) -> Vec<RegionName>
where
    I: IntoIterator<Item = RegionName>,
{
    names
        .into_iter()
        .filter(|name| is_match(name.as_ref(), query, mode))
        .unique()
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use super::{filter_matches, is_match};
    use crate::LookupMode;
    use rstest::rstest;
    use shared_kernel::region_name::RegionName;

    fn names(values: &[&str]) -> Vec<RegionName> {
        values.iter().map(|value| RegionName::from(*value)).collect()
    }

    #[rstest]
    #[case("Berlin", "Berlin", LookupMode::Substring, true)]
    #[case("Berlin-Mitte", "Berlin", LookupMode::Substring, true)]
    #[case("Berlin-Mitte", "mitte", LookupMode::Substring, true)]
    #[case("Hamburg", "Berlin", LookupMode::Substring, false)]
    #[case("Berlin", "Berlin", LookupMode::Exact, true)]
    #[case("Berlin-Mitte", "Berlin", LookupMode::Exact, false)]
    #[case("berlin", "Berlin", LookupMode::Exact, false)]
    fn test_is_match(
        #[case] candidate: &str,
        #[case] query: &str,
        #[case] mode: LookupMode,
        #[case] expected: bool,
    ) {
        assert_eq!(is_match(candidate, query, mode), expected)
    }

    #[test]
    fn test_substring_lookup_returns_every_match() {
        let result = filter_matches(
            names(&["Berlin", "Berlin-Mitte"]),
            "Berlin",
            LookupMode::Substring,
        );
        assert_eq!(result, names(&["Berlin", "Berlin-Mitte"]));
    }

    #[test]
    fn test_exact_lookup_returns_exactly_one() {
        let result = filter_matches(names(&["Berlin", "Berlin-Mitte"]), "Berlin", LookupMode::Exact);
        assert_eq!(result, names(&["Berlin"]));
    }

    #[test]
    fn test_duplicate_names_are_collapsed() {
        let result = filter_matches(
            names(&["München", "München", "Münchenbernsdorf"]),
            "München",
            LookupMode::Substring,
        );
        assert_eq!(result, names(&["München", "Münchenbernsdorf"]));
    }

    #[test]
    fn test_no_match_is_an_empty_result() {
        let result = filter_matches(names(&["Berlin"]), "Köln", LookupMode::Substring);
        assert!(result.is_empty());
    }
}
