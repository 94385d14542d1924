//! Evenly spaced commit sampling

/// Indices of an evenly spaced sample of `total` items
///
/// Always keeps the first and last index. Indices are unique and ascending.
/// A `max` of 0 or 1 keeps only the first index.
pub fn sample_indices(total: usize, max: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    if total <= max {
        return (0..total).collect();
    }
    if max <= 1 {
        return vec![0];
    }

    let step = (total - 1) as f64 / (max - 1) as f64;
    let mut indices = Vec::with_capacity(max);
    indices.push(0);
    for i in 1..max - 1 {
        indices.push((i as f64 * step).round() as usize);
    }
    indices.push(total - 1);

    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Evenly spaced sample of `items`, in their original order
///
/// Items are expected oldest-first, so the sample spans oldest to newest.
pub fn sample<T: Clone>(items: &[T], max: usize) -> Vec<T> {
    if items.len() <= max {
        return items.to_vec();
    }
    sample_indices(items.len(), max)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}
