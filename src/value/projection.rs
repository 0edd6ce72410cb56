//! Ordering and aggregate helpers used by value projections

use std::cmp::Ordering;

use super::Data;

/// Natural ordering: case-insensitive, with digit runs compared numerically
///
/// `"item2"` sorts before `"item10"`; ties fall back to a case-sensitive
/// comparison so the ordering is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_digits(&mut left);
                let rn = take_digits(&mut right);
                let ord = compare_digit_runs(&ln, &rn);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Ordering used by `sort_asc`/`sort_desc`
///
/// Numbers compare numerically, everything else by natural string order.
pub fn compare_data(a: &Data, b: &Data) -> Ordering {
    match (a, b) {
        (Data::Number(x), Data::Number(y)) => x.total_cmp(y),
        _ => natural_cmp(&a.to_text(), &b.to_text()),
    }
}

/// Numeric items of an array, skipping anything that does not coerce
pub fn numbers(items: &[Data]) -> Vec<f64> {
    items
        .iter()
        .map(Data::to_number)
        .filter(|n| !n.is_nan())
        .collect()
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_cmp_numeric_runs() {
        assert_eq!(natural_cmp("item2", "item10"), Ordering::Less);
        assert_eq!(natural_cmp("item010", "item9"), Ordering::Greater);
        assert_eq!(natural_cmp("Apple", "banana"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_is_total() {
        assert_ne!(natural_cmp("a", "A"), Ordering::Equal);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_compare_data_orders_nan_consistently() {
        let mut items = vec![
            Data::Number(2.0),
            Data::Number(f64::NAN),
            Data::Number(-1.0),
            Data::Number(10.0),
        ];
        items.sort_by(compare_data);
        let numbers: Vec<f64> = items
            .iter()
            .filter_map(|d| match d {
                Data::Number(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(&numbers[..3], &[-1.0, 2.0, 10.0]);
        assert!(numbers[3].is_nan());
        assert_eq!(compare_data(&Data::Number(f64::NAN), &Data::Number(1.0)), Ordering::Greater);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
