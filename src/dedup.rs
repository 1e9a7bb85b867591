use crate::models::RawRow;

fn field(row: &RawRow, index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}

/// Stable sort by date text followed by description text, so rows that
/// share both end up next to each other.
pub fn sort_for_dedup(rows: &mut [RawRow], date_index: usize, description_index: usize) {
    rows.sort_by_cached_key(|row| {
        let mut key = field(row, date_index).to_string();
        key.push_str(field(row, description_index));
        key
    });
}

/// Suffix repeated raw rows so each one gets a distinct description.
///
/// The first row of a run is left alone. Its copies get `" 1"`, `" 2"`,
/// `" 4"`, ... appended: the counter doubles after every copy. Equality is
/// checked on the untouched source row.
pub fn disambiguate(rows: &mut [RawRow], description_index: usize) -> usize {
    let mut previous: Option<RawRow> = None;
    let mut duplicate_index: u64 = 1;
    let mut renamed = 0usize;

    for row in rows.iter_mut() {
        if previous.as_deref() == Some(row.as_slice()) {
            if let Some(description) = row.get_mut(description_index) {
                description.push_str(&format!(" {duplicate_index}"));
                renamed += 1;
            }
            duplicate_index = duplicate_index.saturating_add(duplicate_index);
        } else {
            previous = Some(row.clone());
            duplicate_index = 1;
        }
    }
    renamed
}
