/// §4.2 Storage / §5: batch insert cap — `min(65535/5, config.memory_batch_cap)`.
/// 65535 is SQLite's per-statement bound-parameter limit; 5 is the column
/// count per bound row.
pub const SQLITE_PARAM_LIMIT: usize = 65_535;
pub const COLUMNS_PER_MEMORY_ROW: usize = 5;

pub fn effective_batch_cap(config_cap: usize) -> usize {
    (SQLITE_PARAM_LIMIT / COLUMNS_PER_MEMORY_ROW).min(config_cap)
}

/// Truncate a batch to the effective cap, discarding the tail.
pub fn truncate_batch<T>(mut batch: Vec<T>, config_cap: usize) -> Vec<T> {
    let cap = effective_batch_cap(config_cap);
    batch.truncate(cap);
    batch
}

pub const MIN_CONTENT_CHARS_FOR_EMBEDDING: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_cap_matches_spec_constant() {
        assert_eq!(effective_batch_cap(13_000), 13_000);
        assert_eq!(effective_batch_cap(999_999), 13_107);
    }

    #[test]
    fn truncate_batch_discards_tail() {
        let batch: Vec<i32> = (0..20).collect();
        let truncated = truncate_batch(batch, 5);
        assert_eq!(truncated.len(), 5);
        assert_eq!(truncated, vec![0, 1, 2, 3, 4]);
    }
}
