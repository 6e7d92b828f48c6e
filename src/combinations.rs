//! Combination generation for loop inputs
//!
//! Inputs are normalized into sequences, then expanded into their Cartesian
//! product in lexicographic order: the first input varies slowest, the last
//! input varies fastest.

use serde_json::Value;

/// Wrap any non-array input into a one-element sequence.
pub fn normalize_inputs(inputs: &[Value]) -> Vec<Vec<Value>> {
    inputs
        .iter()
        .map(|input| match input {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        })
        .collect()
}

/// Full Cartesian product of `sequences`.
///
/// No sequences yields no combinations. Any empty sequence also yields no
/// combinations.
pub fn cartesian_product(sequences: &[Vec<Value>]) -> Vec<Vec<Value>> {
    if sequences.is_empty() {
        return Vec::new();
    }

    let mut combos: Vec<Vec<Value>> = vec![Vec::with_capacity(sequences.len())];
    for sequence in sequences {
        let mut next = Vec::with_capacity(combos.len() * sequence.len());
        for prefix in &combos {
            for item in sequence {
                let mut combo = prefix.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        combos = next;
    }
    combos
}
