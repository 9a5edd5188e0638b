//! Macro-generated contract suite for `SequenceStore` and the code
//! generator running on it

/// Generate the sequence store conformance suite.
///
/// `$factory` must evaluate to a fresh, empty [`Store`].
#[macro_export]
macro_rules! sequence_store_tests {
    ($factory:expr) => {
        mod sequence_store_contract_tests {
            use super::*;
            use std::collections::HashSet;

            #[tokio::test]
            async fn test_compare_and_set() {
                let store: Store = $factory;
                let sequences = store.sequences.clone();

                assert_eq!(sequences.current("manifest:BAN").await.unwrap(), None);
                assert!(
                    sequences
                        .compare_and_set("manifest:BAN", None, "BANA000001")
                        .await
                        .unwrap()
                );
                // The counter exists now
                assert!(
                    !sequences
                        .compare_and_set("manifest:BAN", None, "BANA000001")
                        .await
                        .unwrap()
                );
                assert!(
                    !sequences
                        .compare_and_set("manifest:BAN", Some("BANA000007"), "BANA000008")
                        .await
                        .unwrap()
                );
                assert!(
                    sequences
                        .compare_and_set("manifest:BAN", Some("BANA000001"), "BANA000002")
                        .await
                        .unwrap()
                );
                assert_eq!(
                    sequences.current("manifest:BAN").await.unwrap().as_deref(),
                    Some("BANA000002")
                );
                assert_eq!(sequences.current("drs:BAN").await.unwrap(), None);
            }

            #[tokio::test]
            async fn test_concurrent_codes_are_unique() {
                let store: Store = $factory;
                let codes = CodeGenerator::new(store.sequences.clone(), 64);

                let tasks: Vec<_> = (0..10)
                    .map(|_| {
                        let codes = codes.clone();
                        tokio::spawn(async move { codes.issue(CodeSeries::Drs, "Pune").await })
                    })
                    .collect();

                let mut issued = HashSet::new();
                for task in tasks {
                    issued.insert(task.await.unwrap().unwrap());
                }

                assert_eq!(issued.len(), 10);
                assert!(issued.contains("PUNA000001"));
                assert!(issued.contains("PUNA000010"));
            }

            #[tokio::test]
            async fn test_series_are_independent() {
                let store: Store = $factory;
                let codes = CodeGenerator::new(store.sequences.clone(), 8);

                assert_eq!(
                    codes.issue(CodeSeries::Manifest, "Chennai").await.unwrap(),
                    "CHEA000001"
                );
                assert_eq!(
                    codes.issue(CodeSeries::Drs, "Chennai").await.unwrap(),
                    "CHEA000001"
                );
                assert_eq!(
                    codes.issue(CodeSeries::Manifest, "chennai").await.unwrap(),
                    "CHEA000002"
                );
            }
        }
    };
}
