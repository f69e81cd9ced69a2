//! Round-trip and no-expansion properties through the whole engine

use foldvault_config::Config;
use foldvault_engine::{StoreRequest, VaultEngine};
use proptest::prelude::*;

fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(Vec::new()),
        prop::collection::vec(any::<u8>(), 1..=64),
        prop::collection::vec(any::<u8>(), 64..=4096),
        (any::<u8>(), 1usize..=8192).prop_map(|(byte, len)| vec![byte; len]),
        "[a-z_ \n]{1,2048}".prop_map(String::into_bytes),
        (1usize..=40).prop_flat_map(|width| {
            (prop::collection::vec(32u8..=126, width), 1usize..=100)
                .prop_map(|(line, repeats)| {
                    let mut line = line;
                    line.push(b'\n');
                    line.repeat(repeats)
                })
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn store_then_retrieve_is_identity(content in content_strategy()) {
        let (receipt, retrieved) = tokio_test::block_on(async {
            let engine = VaultEngine::with_config(Config::default()).await.unwrap();
            let receipt = engine
                .store(StoreRequest::new("owner", "c", "n", content.clone()))
                .await
                .unwrap();
            let retrieved = engine.retrieve("owner", &receipt.record_id).await.unwrap();
            (receipt, retrieved)
        });

        prop_assert!(receipt.final_size <= receipt.original_size);
        prop_assert_eq!(receipt.original_size, content.len() as u64);
        prop_assert_eq!(retrieved.content, content);
    }

    #[test]
    fn every_line_range_matches_the_original(content in "[a-z ]{0,30}(\n[a-z ]{0,30}){0,20}") {
        let lines: Vec<&str> = content.split_terminator('\n').collect();
        let result = tokio_test::block_on(async {
            let engine = VaultEngine::with_config(Config::default()).await.unwrap();
            let id = engine
                .store(StoreRequest::new("owner", "c", "n", content.clone().into_bytes()))
                .await
                .unwrap()
                .record_id;

            let mut slices = Vec::new();
            for start in 0..lines.len() as u64 {
                let range = engine.retrieve_range("owner", &id, start, start).await.unwrap();
                slices.push(range.content);
            }
            slices
        });

        let mut rebuilt = Vec::new();
        for slice in result {
            rebuilt.extend_from_slice(&slice);
        }
        prop_assert_eq!(rebuilt, content.into_bytes());
    }
}
