//! Best-effort schema inference: `candidates -> scored guesses -> best pick`.
//!
//! Delimiter sniffing and date-column selection both score a fixed candidate
//! list and keep the highest score. Ties keep the earliest candidate, so the
//! candidate order doubles as a preference order.

/// One candidate with its score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredGuess<T> {
    /// The guessed value.
    pub candidate: T,
    /// Its score; higher is better.
    pub score: f64,
}

/// Score every candidate in order.
pub fn score_candidates<T, I, F>(candidates: I, mut score: F) -> Vec<ScoredGuess<T>>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> f64,
{
    candidates
        .into_iter()
        .map(|candidate| {
            let score = score(&candidate);
            ScoredGuess { candidate, score }
        })
        .collect()
}

/// Highest-scoring guess strictly above `floor`; the first one wins ties.
pub fn best_guess<T>(guesses: Vec<ScoredGuess<T>>, floor: f64) -> Option<ScoredGuess<T>> {
    let mut best: Option<ScoredGuess<T>> = None;
    for guess in guesses {
        if guess.score.is_nan() || guess.score <= floor {
            continue;
        }
        match &best {
            Some(current) if current.score >= guess.score => {}
            _ => best = Some(guess),
        }
    }
    best
}

/// Index of the first header whose lowercased name contains any needle.
pub fn first_matching_column<S: AsRef<str>>(headers: &[S], needles: &[String]) -> Option<usize> {
    headers.iter().position(|header| {
        let lowered = header.as_ref().to_lowercase();
        needles.iter().any(|needle| lowered.contains(needle.as_str()))
    })
}

/// Indices of every header whose lowercased name contains any needle.
pub fn matching_columns<S: AsRef<str>>(headers: &[S], needles: &[String]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            let lowered = header.as_ref().to_lowercase();
            needles.iter().any(|needle| lowered.contains(needle.as_str()))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Round a ratio to a percentage with two decimals.
pub fn percent_2dp(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let pct = numerator as f64 / denominator as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
