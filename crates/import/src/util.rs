use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Runs of word characters, or runs of punctuation; whitespace separates tokens.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").expect("token pattern is valid"));

/// Case-folds `field`, drops apostrophes, and splits it into a token set.
pub fn tokenize(field: &str) -> HashSet<String> {
    let standardized = field.replace('\'', "").to_lowercase();
    TOKEN_PATTERN
        .find_iter(&standardized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard distance `1 - |a ∩ b| / |a ∪ b|`, in `[0.0, 1.0]`.
/// Two empty sets are identical (distance 0).
pub fn jaccard_distance(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    (union - intersection) as f64 / union as f64
}

/// All `r`-element combinations of `0..n`, in lexicographic order.
pub fn combinations(n: usize, r: usize) -> Vec<Vec<usize>> {
    if r == 0 || r > n {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..r).collect();
    loop {
        result.push(indices.clone());

        // Rightmost position that can still advance.
        let Some(i) = (0..r).rev().find(|&i| indices[i] != i + n - r) else {
            return result;
        };
        indices[i] += 1;
        for j in i + 1..r {
            indices[j] = indices[j - 1] + 1;
        }
    }
}
