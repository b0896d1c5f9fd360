use proptest::prelude::*;
use proptest::strategy::Just;

/// Strategy for generating plugin and registrar ids
pub fn plugin_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

/// Strategy for generating a small universe of known ids
pub fn universe_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(plugin_id_strategy(), 0..8)
}

/// Strategy for generating include/exclude expressions: empty, `*`, or a messy id list
pub fn id_expression_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("*".to_string()),
        prop::collection::vec(
            (plugin_id_strategy(), " {0,2}", prop::bool::ANY),
            0..6
        )
        .prop_map(|items| {
            items
                .into_iter()
                .map(|(id, padding, blank)| {
                    if blank {
                        padding
                    } else {
                        format!("{padding}{id}{padding}")
                    }
                })
                .collect::<Vec<_>>()
                .join(",")
        }),
    ]
}

/// Strategy for generating plugin priorities
pub fn priorities_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-100i32..100, 1..10)
}
