//! Similarity ranking and filtering.
//!
//! [`rank`] is the one ranking routine used everywhere: the in-memory and
//! SQLite section stores run it over their rows, and the chat pipeline runs it
//! over older conversation turns.

use docent_core::{Result, RetrievalOptions, Scorable, Scored, similarity};

/// Score, sort and filter `candidates` against `options.target`.
///
/// 1. Every candidate is scored; a dimension mismatch aborts the whole call.
/// 2. Candidates are stable-sorted by descending similarity, so ties keep
///    their input order.
/// 3. A single scan keeps candidates meeting both the threshold and the
///    minimum content length, stopping at `max_count`.
///
/// The cutoff is greedy: it happens during the scan, never as a later
/// truncation of a fully filtered list.
pub fn rank<T>(candidates: &[T], options: &RetrievalOptions<'_>) -> Result<Vec<Scored<T>>>
where
    T: Scorable + Clone,
{
    if options.max_count == 0 || candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut scored = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| similarity(options.target, c.embedding()).map(|s| (idx, s)))
        .collect::<Result<Vec<_>>>()?;

    // Stable: equal scores keep input order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut out = Vec::with_capacity(options.max_count.min(scored.len()));
    for (idx, sim) in scored {
        let candidate = &candidates[idx];
        if !options.accepts(sim, candidate.content()) {
            continue;
        }
        out.push(Scored { item: candidate.clone(), similarity: sim });
        if out.len() == options.max_count {
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::Error;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        text: &'static str,
        emb: Vec<f32>,
    }

    impl Scorable for Doc {
        fn embedding(&self) -> &[f32] {
            &self.emb
        }
        fn content(&self) -> &str {
            self.text
        }
    }

    fn doc(text: &'static str, score: f32) -> Doc {
        // With target [1, 0] the similarity is just the first component.
        Doc { text, emb: vec![score, 0.0] }
    }

    fn opts(target: &[f32], threshold: f32, max: usize, min_len: usize) -> RetrievalOptions<'_> {
        RetrievalOptions {
            target,
            similarity_threshold: threshold,
            max_count: max,
            min_content_length: min_len,
        }
    }

    fn texts(ranked: &[Scored<Doc>]) -> Vec<&'static str> {
        ranked.iter().map(|s| s.item.text).collect()
    }

    #[test]
    fn sorts_filters_and_caps() {
        let target = [1.0, 0.0];
        let docs = vec![doc("a", 0.9), doc("b", 0.4), doc("c", 0.95)];
        let ranked = rank(&docs, &opts(&target, 0.5, 2, 0)).unwrap();
        assert_eq!(texts(&ranked), vec!["c", "a"]);
    }

    #[test]
    fn output_is_non_increasing_and_bounded() {
        let target = [1.0, 0.0];
        let docs: Vec<Doc> = [0.1, 0.8, 0.35, 0.99, 0.6, 0.7, 0.31]
            .iter()
            .map(|s| doc("some content", *s))
            .collect();
        let ranked = rank(&docs, &opts(&target, 0.3, 4, 5)).unwrap();
        assert_eq!(ranked.len(), 4);
        for pair in ranked.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert!(ranked.iter().all(|s| s.similarity >= 0.3));
    }

    #[test]
    fn ties_keep_input_order() {
        let target = [1.0, 0.0];
        let docs = vec![doc("first", 0.5), doc("second", 0.5), doc("third", 0.5)];
        let ranked = rank(&docs, &opts(&target, 0.0, 10, 0)).unwrap();
        assert_eq!(texts(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn short_content_is_skipped_but_scan_continues() {
        let target = [1.0, 0.0];
        let docs = vec![doc("tiny", 0.99), doc("long enough", 0.5)];
        let ranked = rank(&docs, &opts(&target, 0.3, 1, 6)).unwrap();
        assert_eq!(texts(&ranked), vec!["long enough"]);
    }

    #[test]
    fn empty_and_zero_count() {
        let target = [1.0, 0.0];
        assert!(rank::<Doc>(&[], &opts(&target, 0.0, 5, 0)).unwrap().is_empty());
        let docs = vec![doc("a", 0.9)];
        assert!(rank(&docs, &opts(&target, 0.0, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn all_below_threshold_is_empty() {
        let target = [1.0, 0.0];
        let docs = vec![doc("a", 0.1), doc("b", 0.2)];
        assert!(rank(&docs, &opts(&target, 0.3, 10, 0)).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_propagates() {
        let target = [1.0, 0.0, 0.0];
        let docs = vec![doc("a", 0.9)];
        let err = rank(&docs, &opts(&target, 0.0, 10, 0)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
