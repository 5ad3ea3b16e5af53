use crate::models::{CsvTable, SortState};
use std::cmp::Ordering;

/// Rows of `table` matching `filter_text` in any cell, sorted by the active column.
pub fn reprocess(table: &CsvTable, filter_text: &str, sort: &SortState<usize>) -> Vec<Vec<String>> {
    let needle = filter_text.to_lowercase();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .filter(|row| needle.is_empty() || row.iter().any(|cell| cell.to_lowercase().contains(&needle)))
        .cloned()
        .collect();

    if sort.is_neutral() {
        return rows;
    }
    let Some(column) = sort.key.filter(|column| *column < table.headers.len()) else {
        return rows;
    };

    merge_sort_by(rows, &mut |a: &Vec<String>, b: &Vec<String>| {
        let ordering = match (a.get(column), b.get(column)) {
            (Some(left), Some(right)) => compare_cells(left, right),
            _ => Ordering::Equal,
        };
        sort.direction.apply(ordering)
    })
}

/// Numeric when both cells parse as numbers, text otherwise. Decided per pair.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        _ => a.cmp(b),
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|value| !value.is_nan())
}

// Mixed columns make `compare_cells` non-transitive ("9" < "10" < "1x" < "9"),
// which `slice::sort_by` may reject with a panic. Plain stable merge sort
// accepts any comparator.
fn merge_sort_by<T, F>(items: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort_by(left, compare);
    let right = merge_sort_by(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        let next = if compare(r, l) == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    merged
}
