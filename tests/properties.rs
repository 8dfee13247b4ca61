// Property suites over the normalization laws and pipeline invariants.

mod common;

use carta_core::id::node_id;
use carta_core::NodeType;
use carta_core::{sqlite::SqliteStore, CancelToken, GraphStore};
use carta_linker::{normalize_url, Linker};
use proptest::prelude::*;

use common::index_into;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_normalize_url_idempotent(path in "[A-Za-z0-9/{}:<>._-]{0,40}") {
        let once = normalize_url(&path);
        prop_assert_eq!(normalize_url(&once), once);
    }

    #[test]
    fn prop_normalize_url_case_insensitive(path in "[A-Za-z0-9/{}._-]{0,40}") {
        prop_assert_eq!(normalize_url(&path), normalize_url(&path.to_uppercase()));
    }

    #[test]
    fn prop_normalized_urls_are_rooted(path in "[A-Za-z0-9/{}:<>._-]{0,40}") {
        let normalized = normalize_url(&path);
        prop_assert!(normalized.starts_with('/'));
        prop_assert!(!normalized.ends_with('/') || normalized == "/");
    }

    #[test]
    fn prop_node_ids_deterministic_and_distinct(
        name_a in "[A-Za-z][A-Za-z0-9_]{0,12}",
        name_b in "[A-Za-z][A-Za-z0-9_]{0,12}",
        path in "[a-z]{1,8}/[a-z]{1,8}\\.go",
    ) {
        let a1 = node_id(NodeType::Function, &path, &name_a);
        let a2 = node_id(NodeType::Function, &path, &name_a);
        prop_assert_eq!(&a1, &a2);
        prop_assert_eq!(a1.len(), 24);
        if name_a != name_b {
            prop_assert_ne!(a1, node_id(NodeType::Function, &path, &name_b));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Random small service layouts: indexing is reproducible and every
    /// linker phase is idempotent on re-run.
    #[test]
    fn prop_random_layout_pipeline_invariants(
        layout in proptest::collection::vec(
            (
                "[a-z]{3,8}",                                     // service dir
                "[a-z]{3,8}",                                     // file stem
                proptest::collection::vec("[A-Z][a-z]{2,8}", 1..4), // function names
            ),
            1..4,
        )
    ) {
        let mut files: Vec<(String, String)> = Vec::new();
        for (service, stem, functions) in &layout {
            let mut source = String::from("package app\n\n");
            for function in functions {
                source.push_str(&format!("func {function}() {{}}\n\n"));
            }
            files.push((format!("{service}/{stem}.go"), source));
        }
        let borrowed: Vec<(&str, &str)> =
            files.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();

        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        index_into(&store, &token, &borrowed);
        let after_index = store.stats(&token).unwrap();

        // Re-index everything: identical ids, identical counts.
        index_into(&store, &token, &borrowed);
        prop_assert_eq!(&store.stats(&token).unwrap(), &after_index);

        // Linking twice adds nothing the second time.
        let linker = Linker::new(&store, &token);
        linker.run_all().unwrap();
        let after_link = store.stats(&token).unwrap();
        let second = linker.run_all().unwrap();
        prop_assert_eq!(second.total(), 0);
        prop_assert_eq!(&store.stats(&token).unwrap(), &after_link);
    }
}
