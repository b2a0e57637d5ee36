//! Character-bigram cosine similarity.
//!
//! Good enough to rank short Korean case summaries without an embedding
//! model. Whitespace is ignored so spacing differences do not matter.

use std::collections::HashMap;

type Profile = HashMap<(char, char), u32>;

fn profile(text: &str) -> Profile {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    let mut counts = Profile::new();
    if chars.len() == 1 {
        // Single character: score it as a degenerate bigram.
        counts.insert((chars[0], chars[0]), 1);
        return counts;
    }
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity in `[0, 1]`. Empty input scores 0.
pub fn bigram_cosine(a: &str, b: &str) -> f64 {
    let pa = profile(a);
    let pb = profile(b);
    if pa.is_empty() || pb.is_empty() {
        return 0.0;
    }

    let dot: f64 = pa
        .iter()
        .filter_map(|(k, va)| pb.get(k).map(|vb| f64::from(*va) * f64::from(*vb)))
        .sum();
    let norm = |p: &Profile| p.values().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
    (dot / (norm(&pa) * norm(&pb))).clamp(0.0, 1.0)
}
