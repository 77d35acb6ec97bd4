use itertools::Itertools;

/// Drops every record that is equal to the record immediately before it.
///
/// Equality is over the whole record, not just its identity key, and only
/// neighbours are compared: a repeat separated by a different record survives.
pub fn dedup_consecutive<T: PartialEq>(records: Vec<T>) -> Vec<T> {
    records.into_iter().dedup().collect()
}
