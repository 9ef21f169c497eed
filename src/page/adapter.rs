use serde_json::Value;
use std::cmp::Ordering;

use crate::clients::pddikti::Resource;

/// Field names the filter pipeline reads off an entity. Upstream records are
/// untyped bags of strings and the field carrying a given fact differs per
/// resource, so the pipeline never touches field names directly.
#[derive(Debug, Clone, Copy)]
pub struct EntityFields {
    pub institution: &'static str,
    pub program: &'static str,
    pub level: &'static str,
}

#[must_use]
pub const fn fields(resource: Resource) -> EntityFields {
    match resource {
        Resource::Mahasiswa | Resource::Dosen | Resource::Pt => EntityFields {
            institution: "nama_pt",
            program: "nama_prodi",
            level: "jenjang",
        },
        // Program records carry their institution in `pt` and their own name
        // in `nama`.
        Resource::Prodi => EntityFields {
            institution: "pt",
            program: "nama",
            level: "jenjang",
        },
    }
}

#[must_use]
pub const fn institution_field(resource: Resource) -> &'static str {
    fields(resource).institution
}

/// Sortable fields per resource, matched against the field half of a
/// `sort_by` string such as `"nama-asc"` or `"nim-desc"`.
#[must_use]
pub const fn sort_fields(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::Mahasiswa => &["nama", "nim"],
        Resource::Dosen => &["nama", "nidn"],
        Resource::Prodi | Resource::Pt => &["nama", "kode"],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub ascending: bool,
}

/// Parses `"<field>-<asc|desc>"` against the resource's sortable fields.
/// Unknown fields or directions yield `None` (no sort applied).
#[must_use]
pub fn parse_sort(resource: Resource, sort_by: &str) -> Option<SortKey> {
    let (field, direction) = sort_by.rsplit_once('-')?;

    let ascending = match direction {
        "asc" => true,
        "desc" => false,
        _ => return None,
    };

    sort_fields(resource)
        .iter()
        .find(|f| **f == field)
        .map(|f| SortKey {
            field: f,
            ascending,
        })
}

/// Case-insensitive string comparison on the sort field; entities missing the
/// field sort last regardless of direction.
#[must_use]
pub fn compare(a: &Value, b: &Value, sort: &SortKey) -> Ordering {
    let field_of = |v: &Value| {
        v.get(sort.field)
            .and_then(Value::as_str)
            .map(str::to_lowercase)
    };

    match (field_of(a), field_of(b)) {
        (Some(a), Some(b)) => {
            if sort.ascending {
                a.cmp(&b)
            } else {
                b.cmp(&a)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sort_known_fields() {
        let sort = parse_sort(Resource::Mahasiswa, "nama-asc").unwrap();
        assert_eq!(sort.field, "nama");
        assert!(sort.ascending);

        let sort = parse_sort(Resource::Mahasiswa, "nim-desc").unwrap();
        assert_eq!(sort.field, "nim");
        assert!(!sort.ascending);

        assert!(parse_sort(Resource::Dosen, "nidn-asc").is_some());
        assert!(parse_sort(Resource::Pt, "kode-desc").is_some());
    }

    #[test]
    fn test_parse_sort_rejects_foreign_fields() {
        // nim is a student field, not a lecturer one
        assert!(parse_sort(Resource::Dosen, "nim-asc").is_none());
        assert!(parse_sort(Resource::Mahasiswa, "nama-sideways").is_none());
        assert!(parse_sort(Resource::Mahasiswa, "nama").is_none());
    }

    #[test]
    fn test_compare_is_case_insensitive() {
        let sort = parse_sort(Resource::Mahasiswa, "nama-asc").unwrap();
        let a = json!({"nama": "budi"});
        let b = json!({"nama": "Agus"});
        assert_eq!(compare(&a, &b, &sort), Ordering::Greater);
    }

    #[test]
    fn test_compare_missing_field_sorts_last() {
        let sort = parse_sort(Resource::Mahasiswa, "nama-desc").unwrap();
        let named = json!({"nama": "Agus"});
        let anonymous = json!({"nim": "123"});
        assert_eq!(compare(&named, &anonymous, &sort), Ordering::Less);
        assert_eq!(compare(&anonymous, &named, &sort), Ordering::Greater);
    }

    #[test]
    fn test_prodi_institution_field() {
        assert_eq!(institution_field(Resource::Prodi), "pt");
        assert_eq!(institution_field(Resource::Mahasiswa), "nama_pt");
    }
}
