//! Property-based tests for the filename grammar and specificity ordering.

#[cfg(test)]
mod proptest_tests {
    use crate::grammar::{format_filename, FilenameGrammar};
    use crate::metadata::ClientMetadata;
    use crate::specificity::Specificity;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn specificity() -> impl Strategy<Value = Specificity> {
        prop_oneof![
            Just(Specificity::All),
            ("[a-z][a-z0-9_-]{0,10}", 0u32..100).prop_map(|(name, prio)| Specificity::group(name, prio)),
            "[a-z][a-z0-9-]{0,15}".prop_map(Specificity::host),
        ]
    }

    // ============================================================================
    // parse/format
    // ============================================================================

    proptest! {
        /// Property: parsing a formatted filename gives back its parts
        #[test]
        fn parse_inverts_format(wanted in specificity()) {
            let grammar = FilenameGrammar::new(&["motd"], true, &[], &[]).unwrap();
            let filename = format_filename("motd", &wanted, None);
            let parsed = grammar.parse(&filename).unwrap().unwrap();
            prop_assert_eq!(&parsed.specificity, &wanted);
            prop_assert_eq!(parsed.extension.as_deref(), None);
            prop_assert_eq!(parsed.format(), filename);
        }

        /// Property: the extension survives a round trip
        #[test]
        fn parse_inverts_format_with_extension(wanted in specificity(), ext in prop::sample::select(vec!["genshi", "cheetah"])) {
            let grammar = FilenameGrammar::new(&["motd"], true, &["genshi", "cheetah"], &[]).unwrap();
            let filename = format_filename("motd", &wanted, Some(ext));
            let parsed = grammar.parse(&filename).unwrap().unwrap();
            prop_assert_eq!(&parsed.specificity, &wanted);
            prop_assert_eq!(parsed.extension.as_deref(), Some(ext));
        }

        /// Property: unrelated basenames never parse
        #[test]
        fn other_basenames_are_not_handled(name in "[a-z]{1,8}") {
            prop_assume!(!name.starts_with("motd"));
            let grammar = FilenameGrammar::new(&["motd"], true, &[], &[]).unwrap();
            prop_assert!(grammar.parse(&name).unwrap().is_none());
        }

        /// Property: a group priority that is not two digits is malformed
        #[test]
        fn wide_priorities_are_malformed(prio in 100u32..100_000, group in "[a-z]{1,8}") {
            let grammar = FilenameGrammar::new(&["motd"], true, &[], &[]).unwrap();
            let filename = format!("motd.G{}_{}", prio, group);
            prop_assert!(grammar.parse(&filename).is_err());
        }
    }

    // ============================================================================
    // Specificity ordering
    // ============================================================================

    proptest! {
        /// Property: more_specific is irreflexive and asymmetric
        #[test]
        fn more_specific_is_a_strict_order(a in specificity(), b in specificity()) {
            prop_assert!(!a.more_specific(&a));
            prop_assert!(!(a.more_specific(&b) && b.more_specific(&a)));
        }

        /// Property: a host descriptor beats every group and the default
        #[test]
        fn host_beats_everything_else(host in "[a-z]{1,8}", other in specificity()) {
            prop_assume!(!other.is_host());
            prop_assert!(Specificity::host(host).more_specific(&other));
        }

        /// Property: between groups, the higher priority wins
        #[test]
        fn groups_rank_by_priority(a in 0u32..100, b in 0u32..100) {
            let left = Specificity::group("left", a);
            let right = Specificity::group("right", b);
            prop_assert_eq!(left.more_specific(&right), a > b);
            if a == b {
                prop_assert_eq!(left.compare(&right), None);
            }
        }

        /// Property: compare agrees with more_specific
        #[test]
        fn compare_agrees_with_more_specific(a in specificity(), b in specificity()) {
            match a.compare(&b) {
                Some(Ordering::Greater) => prop_assert!(a.more_specific(&b)),
                Some(Ordering::Less) => prop_assert!(b.more_specific(&a)),
                Some(Ordering::Equal) => prop_assert_eq!(&a, &b),
                None => prop_assert!(!a.more_specific(&b) && !b.more_specific(&a)),
            }
        }

        /// Property: the default matches every client
        #[test]
        fn default_matches_every_client(host in "[a-z]{1,8}", group in "[a-z]{1,8}") {
            let client = ClientMetadata::new(host).with_group(group, 0);
            prop_assert!(Specificity::All.matches(&client));
        }
    }
}
