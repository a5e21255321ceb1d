//! Property tests for configuration merging

use proptest::prelude::*;
use std::collections::BTreeMap;
use strata_config::{ConfigMerger, ConfigNode, MergedConfig, OptionValue};

const KEYS: &[&str] = &["x", "y", "namespace", "min-sdk", "kotlin.jvm-target"];
const PLUGINS: &[&str] = &["java", "kotlin", "android.application", "flutter"];

fn arb_value() -> impl Strategy<Value = OptionValue> {
    prop_oneof![
        any::<bool>().prop_map(OptionValue::Bool),
        any::<i64>().prop_map(OptionValue::Integer),
        "[a-z0-9.]{0,8}".prop_map(OptionValue::String),
        prop::collection::vec("[a-z]{1,6}".prop_map(OptionValue::String), 0..3)
            .prop_map(OptionValue::List),
    ]
}

fn arb_options() -> impl Strategy<Value = BTreeMap<String, OptionValue>> {
    prop::collection::btree_map(prop::sample::select(KEYS).prop_map(str::to_string), arb_value(), 0..4)
}

/// One module declaration: options, plugins, plugin-scoped options and
/// sometimes an explicit build directory
fn arb_node(index: usize) -> impl Strategy<Value = ConfigNode> {
    (
        arb_options(),
        prop::collection::vec(prop::sample::select(PLUGINS), 0..3),
        prop::collection::btree_map(prop::sample::select(PLUGINS), arb_options(), 0..2),
        any::<bool>(),
    )
        .prop_map(move |(options, plugins, scoped, explicit_dir)| {
            let mut node = ConfigNode::new(format!("m{}", index));
            if index > 0 {
                node = node.with_parent(format!("m{}", index - 1));
            }
            for (key, value) in options {
                node = node.with_option(key, value);
            }
            for plugin in plugins {
                node = node.with_plugin(plugin);
            }
            for (plugin, options) in scoped {
                for (key, value) in options {
                    node = node.with_plugin_option(plugin, key, value);
                }
            }
            if explicit_dir {
                node = node.with_build_dir(format!("/out/m{}", index));
            }
            node
        })
}

fn arb_chain() -> impl Strategy<Value = Vec<ConfigNode>> {
    (1usize..5).prop_flat_map(|len| (0..len).map(arb_node).collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn merging_a_config_onto_itself_changes_nothing(chain in arb_chain()) {
        let merger = ConfigMerger::new();
        let refs: Vec<&ConfigNode> = chain.iter().collect();
        let merged = merger
            .merge_chain(&MergedConfig::root("/work/build"), &refs)
            .unwrap();

        let again = merger.merge(&merged, &ConfigNode::from(&merged)).unwrap();
        prop_assert_eq!(&again, &merged);
    }

    #[test]
    fn child_options_always_win(chain in arb_chain()) {
        let merger = ConfigMerger::new();
        let refs: Vec<&ConfigNode> = chain.iter().collect();
        let merged = merger
            .merge_chain(&MergedConfig::root("/work/build"), &refs)
            .unwrap();

        let last = chain.last().unwrap();
        for (key, value) in &last.options {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        prop_assert_eq!(merged.lineage.len(), chain.len());
    }
}
