use serde_json::Value;
use std::collections::BTreeSet;

use super::adapter::{self, EntityFields, SortKey};

/// Sentinel filter value meaning "no filter".
pub const ALL: &str = "Semua";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub pt: String,
    pub prodi: String,
    pub jenjang: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            pt: ALL.to_string(),
            prodi: ALL.to_string(),
            jenjang: ALL.to_string(),
        }
    }
}

impl Filters {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.pt == ALL && self.prodi == ALL && self.jenjang == ALL
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn field_matches(item: &Value, field: &str, wanted: &str) -> bool {
    // Exact, case-sensitive equality; the selectable values are drawn from
    // the result set itself so casing always lines up.
    wanted == ALL
        || item
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| v == wanted)
}

/// Filter then sort: the synchronous half of the derived pipeline, re-run
/// eagerly from the raw result set and the current UI state.
#[must_use]
pub fn process(
    items: &[Value],
    filters: &Filters,
    fields: EntityFields,
    sort: Option<&SortKey>,
) -> Vec<Value> {
    let mut processed: Vec<Value> = items
        .iter()
        .filter(|item| {
            field_matches(item, fields.institution, &filters.pt)
                && field_matches(item, fields.program, &filters.prodi)
                && field_matches(item, fields.level, &filters.jenjang)
        })
        .cloned()
        .collect();

    if let Some(sort) = sort {
        processed.sort_by(|a, b| adapter::compare(a, b, sort));
    }

    processed
}

/// Distinct values of `field` across the *unfiltered* result set, sorted.
/// Options must always reflect the data actually available, never a stale
/// set from a previous query.
#[must_use]
pub fn filter_options(items: &[Value], field: &str) -> Vec<String> {
    let distinct: BTreeSet<&str> = items
        .iter()
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .filter(|v| !v.is_empty())
        .collect();

    distinct.into_iter().map(String::from).collect()
}

#[must_use]
pub fn total_pages(result_count: usize, page_size: usize) -> usize {
    result_count.div_ceil(page_size)
}

/// One-based page slice; out-of-range pages are empty.
#[must_use]
pub fn page_slice(items: &[Value], current_page: usize, page_size: usize) -> &[Value] {
    let start = current_page.saturating_sub(1) * page_size;
    let end = (start + page_size).min(items.len());
    if start >= items.len() {
        &[]
    } else {
        &items[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::pddikti::Resource;
    use serde_json::json;

    fn students(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "nama": format!("Mahasiswa {:02}", i),
                    "nim": format!("{:08}", n - i),
                    "nama_pt": if i % 2 == 0 { "Universitas A" } else { "Institut B" },
                    "nama_prodi": "Informatika",
                    "jenjang": "S1",
                })
            })
            .collect()
    }

    #[test]
    fn test_default_filters_pass_everything() {
        let items = students(7);
        let fields = crate::page::adapter::fields(Resource::Mahasiswa);
        let processed = process(&items, &Filters::default(), fields, None);
        assert_eq!(processed.len(), 7);
    }

    #[test]
    fn test_filter_is_exact_and_case_sensitive() {
        let items = students(6);
        let fields = crate::page::adapter::fields(Resource::Mahasiswa);

        let mut filters = Filters::default();
        filters.pt = "Universitas A".to_string();
        assert_eq!(process(&items, &filters, fields, None).len(), 3);

        filters.pt = "universitas a".to_string();
        assert!(process(&items, &filters, fields, None).is_empty());
    }

    #[test]
    fn test_filters_combine_with_and() {
        let items = students(6);
        let fields = crate::page::adapter::fields(Resource::Mahasiswa);

        let filters = Filters {
            pt: "Institut B".to_string(),
            prodi: "Informatika".to_string(),
            jenjang: "S2".to_string(),
        };
        assert!(process(&items, &filters, fields, None).is_empty());

        let filters = Filters {
            jenjang: "S1".to_string(),
            ..filters
        };
        assert_eq!(process(&items, &filters, fields, None).len(), 3);
    }

    #[test]
    fn test_filter_options_are_distinct_and_drawn_from_results() {
        let items = students(6);
        let options = filter_options(&items, "nama_pt");
        assert_eq!(options, vec!["Institut B", "Universitas A"]);

        // Options track the current result set, not previous ones
        let options = filter_options(&items[..1], "nama_pt");
        assert_eq!(options, vec!["Universitas A"]);

        assert!(filter_options(&[], "nama_pt").is_empty());
    }

    #[test]
    fn test_sort_orders_by_named_comparator() {
        let items = students(5);
        let fields = crate::page::adapter::fields(Resource::Mahasiswa);

        let sort = crate::page::adapter::parse_sort(Resource::Mahasiswa, "nim-asc").unwrap();
        let processed = process(&items, &Filters::default(), fields, Some(&sort));

        let nims: Vec<&str> = processed
            .iter()
            .map(|v| v["nim"].as_str().unwrap())
            .collect();
        let mut sorted = nims.clone();
        sorted.sort_unstable();
        assert_eq!(nims, sorted);
    }

    #[test]
    fn test_pagination_invariants() {
        // 25 items, page size 10: 3 pages of 10/10/5, concatenation exact
        let items = students(25);
        let fields = crate::page::adapter::fields(Resource::Mahasiswa);
        let sort = crate::page::adapter::parse_sort(Resource::Mahasiswa, "nama-asc").unwrap();
        let processed = process(&items, &Filters::default(), fields, Some(&sort));

        assert_eq!(total_pages(processed.len(), 10), 3);
        assert_eq!(page_slice(&processed, 1, 10).len(), 10);
        assert_eq!(page_slice(&processed, 2, 10).len(), 10);
        assert_eq!(page_slice(&processed, 3, 10).len(), 5);
        assert!(page_slice(&processed, 4, 10).is_empty());

        let rejoined: Vec<Value> = (1..=3)
            .flat_map(|p| page_slice(&processed, p, 10).to_vec())
            .collect();
        assert_eq!(rejoined, processed);

        let names: Vec<&str> = page_slice(&processed, 1, 10)
            .iter()
            .map(|v| v["nama"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_total_pages_zero_iff_empty() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
