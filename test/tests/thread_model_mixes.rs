use proptest::prelude::*;

use lockstep_shared::{NodeKey, ThreadModel};
use lockstep_test::ClusterBuilder;

fn thread_model() -> impl Strategy<Value = Option<ThreadModel>> {
    prop_oneof![
        Just(None),
        Just(Some(ThreadModel::Async)),
        Just(Some(ThreadModel::DrawSync)),
        Just(Some(ThreadModel::LocalSync)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_any_thread_model_mix_finishes_without_enforcement(
        models in prop::collection::vec(thread_model(), 1..4),
        frames in 1u32..4,
    ) {
        let mut builder = ClusterBuilder::new();
        for (index, model) in models.iter().enumerate() {
            builder = builder.node(index as u32 + 1, *model);
        }
        let mut cluster = builder.build().expect("build cluster");
        cluster.init().expect("init");
        for frame in 1..=frames {
            prop_assert_eq!(cluster.run_frame(frame).expect("run frame"), frame);
        }

        for index in 0..models.len() {
            let counters = cluster
                .counters(NodeKey::new(index as u32 + 1))
                .expect("counters");
            prop_assert_eq!(counters.finished(), frames);
            prop_assert_eq!(counters.unlocked(), frames);
            prop_assert_eq!(counters.enforced_releases(), 0);
        }
        cluster.exit().expect("exit");
    }
}
