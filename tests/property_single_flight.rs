// tests/property_single_flight.rs

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use playguard::delay::{Delay, DelayStatus};
use playguard::dom::{Fingerprint, HostDocument, MemoryDocument, NodeId};
use playguard::watch::{WatchOptions, Watcher};
use playguard_test_utils::settle;

#[derive(Debug, Clone)]
enum Op {
    /// Start a watch for `div.target` (implicitly cancelling any other).
    Watch,
    Cancel,
    Supersede,
    Insert,
    RemoveLast,
    Unrelated,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Watch),
        1 => Just(Op::Cancel),
        1 => Just(Op::Supersede),
        2 => Just(Op::Insert),
        1 => Just(Op::RemoveLast),
        2 => Just(Op::Unrelated),
    ]
}

fn runtime(paused: bool) -> tokio::runtime::Runtime {
    let mut builder = tokio::runtime::Builder::new_current_thread();
    builder.enable_time();
    if paused {
        builder.start_paused(true);
    }
    builder.build().expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn at_most_one_subscription_is_ever_live(
        ops in proptest::collection::vec(op_strategy(), 1..40),
        eager in any::<bool>(),
    ) {
        let rt = runtime(false);
        rt.block_on(async {
            let doc = MemoryDocument::new();
            let mount = doc.append(doc.document_root(), "div#appMountPoint").unwrap();
            let watcher = Arc::new(Watcher::new(
                Arc::new(doc.clone()),
                WatchOptions { eager_check: eager },
            ));
            let fp = Fingerprint::parse("div.target").unwrap();
            let mut inserted: Vec<NodeId> = Vec::new();
            let mut handles = Vec::new();

            for op in ops {
                match op {
                    Op::Watch => {
                        let watcher = Arc::clone(&watcher);
                        let fp = fp.clone();
                        handles.push(tokio::spawn(async move {
                            watcher.watch(mount, |d| d.query(mount, &fp)).await
                        }));
                    }
                    Op::Cancel => {
                        let had = watcher.has_pending();
                        prop_assert_eq!(watcher.cancel(), had);
                        prop_assert!(!watcher.cancel(), "second cancel is a no-op");
                    }
                    Op::Supersede => {
                        watcher.supersede();
                    }
                    Op::Insert => inserted.push(doc.append(mount, "div.target").unwrap()),
                    Op::RemoveLast => {
                        if let Some(node) = inserted.pop() {
                            doc.remove(node);
                        }
                    }
                    Op::Unrelated => {
                        doc.append(mount, "span.noise").unwrap();
                    }
                }
                settle().await;
                prop_assert!(doc.active_subscriptions() <= 1);
                prop_assert_eq!(doc.active_subscriptions(), usize::from(watcher.has_pending()));
            }

            watcher.supersede();
            for handle in handles {
                let _ = handle.await.unwrap();
            }
            prop_assert_eq!(doc.active_subscriptions(), 0);
            prop_assert!(doc.peak_subscriptions() <= 1);
            Ok(())
        })?;
    }

    #[test]
    fn delay_status_is_pending_exactly_until_the_duration(
        duration_ms in 1u64..10_000,
        elapsed_ms in 0u64..20_000,
    ) {
        let rt = runtime(true);
        rt.block_on(async {
            let delay = Delay::new("prop", Duration::from_millis(duration_ms));
            prop_assert_eq!(delay.status(), DelayStatus::Unset);

            delay.trigger();
            tokio::time::advance(Duration::from_millis(elapsed_ms)).await;
            let expected = if elapsed_ms < duration_ms {
                DelayStatus::Pending
            } else {
                DelayStatus::Passed
            };
            prop_assert_eq!(delay.status(), expected);

            delay.reset();
            prop_assert_eq!(delay.status(), DelayStatus::Unset);
            Ok(())
        })?;
    }
}
