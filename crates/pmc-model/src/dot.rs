//! Visualization of sparse models in DOT format
//!
//! This module provides the trait [`ToDOT`] for converting models into the
//! [DOT format](https://graphviz.org/doc/info/lang.html), which can be
//! visualized using tools like [Graphviz](https://graphviz.org/).
//!
//! States are drawn as circles labeled with their index and their labels,
//! initial states with a double circle. Transitions of an MDP are annotated
//! with the choice they belong to.

use pmc_display_utils::{indent_all, join_iterator};

use crate::models::{ModelType, SparseModel};

/// Define the font type for labels and nodes in the graph
const GRAPH_OPTIONS: &str = "\
rankdir=LR \
fontname=\"Helvetica,Arial,sans-serif\" \
node [fontname=\"Helvetica,Arial,sans-serif\"] \
edge [fontname=\"Helvetica,Arial,sans-serif\"];";

/// Options to mark initial states
const INITIAL_STATE_OPTIONS: &str = "shape = doublecircle";
/// Options for states
const STATE_OPTIONS: &str = "shape = circle";

/// Objects implementing this trait can be visualized as a graph with graphviz
///
/// This trait is only available if the `dot` feature is enabled.
pub trait ToDOT {
    /// Get the underlying graph in DOT format
    fn get_dot_graph(&self) -> String;
}

/// Encode a set of nodes sharing the same options
fn get_node_encoding(nodes: impl Iterator<Item = String>, node_options: &str) -> String {
    let mut nodes = join_iterator(nodes, ";\n");
    if !nodes.is_empty() {
        nodes = format!("node [{node_options}];\n{nodes};");
        nodes = indent_all(nodes);
        nodes += "\n";
    }
    nodes
}

impl<T: SparseModel> ToDOT for T {
    fn get_dot_graph(&self) -> String {
        let initial = self.initial_states();

        let node = |s: usize| {
            let labels = self.labels_of_state(s);
            if labels.is_empty() {
                format!("s{s} [label = \"{s}\"]")
            } else {
                format!(
                    "s{s} [label = \"{s}\\n{}\"]",
                    join_iterator(labels.into_iter(), ", ")
                )
            }
        };

        let init_states = get_node_encoding(
            (0..self.nr_states())
                .filter(|s| initial.contains(s))
                .map(node),
            INITIAL_STATE_OPTIONS,
        );
        let states = get_node_encoding(
            (0..self.nr_states())
                .filter(|s| !initial.contains(s))
                .map(node),
            STATE_OPTIONS,
        );

        let is_mdp = self.model_type() == ModelType::Mdp;
        let edges = self
            .transition_matrix()
            .iter_entries()
            .map(|(src, choice, entry)| {
                let label = if is_mdp {
                    format!("{choice}: {}", entry.value())
                } else {
                    entry.value().to_string()
                };
                format!("s{src} -> s{} [label = \"{label}\"]", entry.column())
            });
        let mut transitions = join_iterator(edges, ";\n");
        if !transitions.is_empty() {
            transitions += ";";
            transitions = indent_all(transitions);
            transitions += "\n";
        }

        format!(
            "digraph {} {{\n{}\n{}{}{}}}",
            self.model_type(),
            indent_all(GRAPH_OPTIONS),
            init_states,
            states,
            transitions
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{BuilderOptions, ModelBuilder, RawTransition},
        labeling::StateLabeling,
    };

    use super::*;

    #[test]
    fn test_dot_dtmc() {
        let mut labeling = StateLabeling::new();
        labeling.declare_label("init").unwrap();
        labeling.add_label_to_state("init", 0).unwrap();

        let model = ModelBuilder::new(BuilderOptions::default())
            .with_transitions(vec![
                RawTransition::new(0, 0, 0, 0.5),
                RawTransition::new(0, 0, 1, 0.5),
                RawTransition::new(1, 0, 1, 1.0),
            ])
            .unwrap()
            .with_labeling(labeling)
            .build()
            .unwrap();

        let expected = "digraph DTMC {\n    rankdir=LR fontname=\"Helvetica,Arial,sans-serif\" node [fontname=\"Helvetica,Arial,sans-serif\"] edge [fontname=\"Helvetica,Arial,sans-serif\"];\n    node [shape = doublecircle];\n    s0 [label = \"0\\ninit\"];\n    node [shape = circle];\n    s1 [label = \"1\"];\n    s0 -> s0 [label = \"0.5\"];\n    s0 -> s1 [label = \"0.5\"];\n    s1 -> s1 [label = \"1\"];\n}";
        assert_eq!(model.get_dot_graph(), expected);
    }

    #[test]
    fn test_dot_mdp_annotates_choices() {
        let model = ModelBuilder::new(BuilderOptions::default())
            .with_transitions(vec![
                RawTransition::new(0, 0, 0, 1.0),
                RawTransition::new(0, 1, 1, 1.0),
                RawTransition::new(1, 0, 1, 1.0),
            ])
            .unwrap()
            .build()
            .unwrap();

        let dot = model.get_dot_graph();
        assert!(dot.starts_with("digraph MDP {"));
        assert!(dot.contains("s0 -> s1 [label = \"1: 1\"]"));
    }
}
