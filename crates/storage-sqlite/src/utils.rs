//! Helpers for staying under SQLite's bound-parameter limit.

/// Maximum number of items bound into a single `IN (...)` list.
///
/// SQLite builds may cap bound parameters at 999 (SQLITE_MAX_VARIABLE_NUMBER),
/// so lists are split well below that.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Parameter budget for one multi-row `INSERT`.
pub const SQLITE_MAX_INSERT_PARAMS: usize = 999;

/// Splits a slice into chunks usable in an `IN (...)` clause.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Splits rows for multi-row inserts where each row binds `params_per_row`
/// values.
pub fn chunk_rows_for_insert<T>(rows: &[T], params_per_row: usize) -> impl Iterator<Item = &[T]> {
    let per_chunk = (SQLITE_MAX_INSERT_PARAMS / params_per_row.max(1)).max(1);
    rows.chunks(per_chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_for_sqlite_empty() {
        let items: Vec<i32> = vec![];
        assert_eq!(chunk_for_sqlite(&items).count(), 0);
    }

    #[test]
    fn test_chunk_for_sqlite_over_limit() {
        let items: Vec<i32> = (0..1200).collect();
        let chunks: Vec<_> = chunk_for_sqlite(&items).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), SQLITE_MAX_PARAMS_CHUNK);
        assert_eq!(chunks[2].len(), 200);
    }

    #[test]
    fn test_insert_chunks_respect_param_budget() {
        let rows: Vec<i32> = (0..1000).collect();
        let chunks: Vec<_> = chunk_rows_for_insert(&rows, 7).collect();
        assert!(chunks.iter().all(|c| c.len() * 7 <= SQLITE_MAX_INSERT_PARAMS));
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 1000);
    }

    #[test]
    fn test_insert_chunks_with_wide_rows() {
        let rows: Vec<i32> = (0..3).collect();
        assert_eq!(chunk_rows_for_insert(&rows, 5000).count(), 3);
    }
}
