//! Subsequence ranking for the built-in selection prompt.
//!
//! Lower scores rank first. Consecutive runs and matches at path-segment
//! boundaries are rewarded; gaps and late positions are penalised; a match
//! that falls inside the final path segment gets an extra bonus so
//! `main` prefers `src/main.rs` over `main_helpers/mod.rs`.

/// Scores `query` against `label`; `None` when not every query character
/// appears in order.
#[must_use]
pub fn fuzzy_score(query: &str, label: &str) -> Option<f64> {
    let query: Vec<char> = query.to_lowercase().chars().collect();
    if query.is_empty() {
        return Some(0.0);
    }
    let text: Vec<char> = label.to_lowercase().chars().collect();
    if query.len() > text.len() {
        return None;
    }

    let basename_start = text
        .iter()
        .rposition(|ch| *ch == '/' || *ch == '\\')
        .map_or(0, |pos| pos + 1);

    let mut matched = 0usize;
    let mut score = 0.0f64;
    let mut previous: Option<usize> = None;
    let mut run = 0u32;

    for (position, ch) in text.iter().enumerate() {
        if matched == query.len() {
            break;
        }
        if *ch != query[matched] {
            continue;
        }

        match previous {
            Some(last) if last + 1 == position => {
                run += 1;
                score -= f64::from(run) * 5.0;
            }
            Some(last) => {
                run = 0;
                score += (position - last - 1) as f64 * 2.0;
            }
            None => run = 0,
        }

        let at_boundary = position == 0
            || matches!(text[position - 1], '/' | '\\' | '-' | '_' | '.' | ':' | ' ');
        if at_boundary {
            score -= 10.0;
        }
        if position >= basename_start {
            score -= 3.0;
        }
        score += position as f64 * 0.1;

        previous = Some(position);
        matched += 1;
    }

    (matched == query.len()).then_some(score)
}

/// Indices of `labels` matching every whitespace-separated token of
/// `query`, best first. Ties keep their original order.
#[must_use]
pub fn rank_labels(query: &str, labels: &[String]) -> Vec<usize> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return (0..labels.len()).collect();
    }

    let mut ranked: Vec<(usize, f64)> = labels
        .iter()
        .enumerate()
        .filter_map(|(index, label)| {
            tokens
                .iter()
                .try_fold(0.0, |total, token| {
                    fuzzy_score(token, label).map(|score| total + score)
                })
                .map(|score| (index, score))
        })
        .collect();

    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().map(|(index, _)| index).collect()
}
