//! Property-based tests for delta-log sets

use bytes::Bytes;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use synapsed_cache::backends::MemoryStore;
use synapsed_cache::codec::{encode_batch, encode_compacted, parse_log, replay, DeltaRecord, Sign};
use synapsed_cache::{CacheConfig, DeltaSet};
use tokio::runtime::Runtime;

/// Create a runtime for tests
fn create_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime")
}

/// Small member alphabet so inserts and removes collide often
fn member_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::sample::select(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), Vec::new()]),
        prop::collection::vec(any::<u8>(), 0..16),
    ]
}

fn sign_strategy() -> impl Strategy<Value = Sign> {
    prop_oneof![Just(Sign::Insert), Just(Sign::Remove)]
}

fn ops_strategy() -> impl Strategy<Value = Vec<(Sign, Vec<u8>)>> {
    prop::collection::vec((sign_strategy(), member_strategy()), 0..64)
}

/// Reference model: plain set mutated in order
fn model(ops: &[(Sign, Vec<u8>)]) -> HashSet<Bytes> {
    let mut set = HashSet::new();
    for (sign, member) in ops {
        let member = Bytes::copy_from_slice(member);
        match sign {
            Sign::Insert => {
                set.insert(member);
            }
            Sign::Remove => {
                set.remove(&member);
            }
        }
    }
    set
}

fn encode_ops(ops: &[(Sign, Vec<u8>)]) -> String {
    ops.iter()
        .map(|(sign, member)| encode_batch(&[member], *sign))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Property: chunking a log across appends never changes what it replays to
    #[test]
    fn test_replay_independent_of_chunking(
        ops in ops_strategy(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let whole = encode_ops(&ops);

        let mut bounds: Vec<usize> = cuts.iter().map(|c| c.index(ops.len() + 1)).collect();
        bounds.push(0);
        bounds.push(ops.len());
        bounds.sort_unstable();
        bounds.dedup();
        let chunked: String = bounds
            .windows(2)
            .map(|w| encode_ops(&ops[w[0]..w[1]]))
            .collect();

        prop_assert_eq!(&chunked, &whole);
        let parsed = parse_log(chunked.as_bytes());
        prop_assert_eq!(parsed.malformed, 0);
        prop_assert_eq!(parsed.records.len(), ops.len());
        prop_assert_eq!(replay(&parsed.records).members, model(&ops));
    }

    // Property: parsing an encoded batch gives back the batch in order
    #[test]
    fn test_batch_round_trip(
        members in prop::collection::vec(member_strategy(), 0..32),
        sign in sign_strategy(),
    ) {
        let parsed = parse_log(encode_batch(&members, sign).as_bytes());
        let expected: Vec<DeltaRecord> = members
            .iter()
            .map(|m| DeltaRecord { sign, member: Bytes::copy_from_slice(m) })
            .collect();
        prop_assert_eq!(parsed.records, expected);
    }

    // Property: the compacted log replays to the same membership
    #[test]
    fn test_compaction_preserves_membership(ops in ops_strategy()) {
        let before = replay(&parse_log(encode_ops(&ops).as_bytes()).records);
        let compacted = encode_compacted(&before.members);
        let after = replay(&parse_log(compacted.as_bytes()).records);

        prop_assert_eq!(&after.members, &before.members);
        prop_assert_eq!(after.total_ops, before.members.len());
        prop_assert!(after.density().map_or(true, |d| d >= 1.0));
    }

    // Property: a stored set tracks the reference model through reads and compactions
    #[test]
    fn test_store_backed_set_matches_model(
        ops in ops_strategy(),
        read_every in 1usize..8,
    ) {
        let runtime = create_runtime();
        runtime.block_on(async {
            let set = DeltaSet::new(Arc::new(MemoryStore::default()), CacheConfig::default())
                .expect("Default config is valid");

            for (i, (sign, member)) in ops.iter().enumerate() {
                let applied = match sign {
                    Sign::Insert => set.insert("prop", &[member], None).await,
                    Sign::Remove => set.remove("prop", &[member], None).await,
                };
                applied.expect("Mutation should succeed");

                if i % read_every == 0 {
                    let members = set.members("prop").await.expect("Read should succeed");
                    prop_assert_eq!(members, model(&ops[..=i]));
                }
            }

            let members = set.members("prop").await.expect("Read should succeed");
            prop_assert_eq!(members, model(&ops));
            Ok(())
        })?;
    }
}
