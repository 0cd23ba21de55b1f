//! Flattens one hierarchical record into tabular rows, one per method,
//! carrying the section and top-level context on every row.

use crate::formats::{MethodRow, StainRecord};

/// CSV column order; must stay in sync with the `MethodRow` field order.
pub const CSV_COLUMNS: [&str; 13] = [
    "row_id",
    "stain_title",
    "section",
    "method_index",
    "materials",
    "steps",
    "method_notes",
    "method_cautions",
    "intro_notes",
    "top_cautions",
    "source_archive_url",
    "source_original_url",
    "extra",
];

/// One row per method across all sections. `row_id` is
/// `"{sequence_index}-{ordinal}"` where the ordinal restarts at 1 for
/// every record and counts methods across section boundaries;
/// `method_index` restarts per section.
pub fn flatten(record: &StainRecord, sequence_index: usize) -> Vec<MethodRow> {
    let intro = record.intro_notes.join(" | ");
    let top_cautions = record.cautions.join(" | ");
    let extra = record.extra.join(" | ");

    let mut rows = Vec::new();
    let mut ordinal = 0_usize;

    for section in &record.sections {
        for (idx, method) in section.methods.iter().enumerate() {
            ordinal += 1;
            rows.push(MethodRow {
                row_id: format!("{sequence_index}-{ordinal}"),
                stain_title: record.title.clone(),
                section: section.section_name.clone(),
                method_index: idx + 1,
                materials: method.materials.join(" ; "),
                steps: method.steps.join(" || "),
                method_notes: method.notes.join(" | "),
                method_cautions: method.cautions.join(" | "),
                intro_notes: intro.clone(),
                top_cautions: top_cautions.clone(),
                source_archive_url: record.source_archive_url.clone(),
                source_original_url: record.source_original_url.clone(),
                extra: if extra.is_empty() {
                    method.extra.clone()
                } else {
                    extra.clone()
                },
            });
        }
    }

    rows
}

/// Fallback row for a record that somehow yields no methods, so the stain
/// still shows up in the tabular export.
pub fn minimal_row(record: &StainRecord, sequence_index: usize) -> MethodRow {
    let intro = record.intro_notes.join(" | ");
    let top_cautions = record.cautions.join(" | ");

    MethodRow {
        row_id: format!("{sequence_index}-1"),
        stain_title: record.title.clone(),
        section: String::new(),
        method_index: 1,
        materials: String::new(),
        steps: String::new(),
        method_notes: intro.clone(),
        method_cautions: top_cautions.clone(),
        intro_notes: intro,
        top_cautions,
        source_archive_url: record.source_archive_url.clone(),
        source_original_url: record.source_original_url.clone(),
        extra: record.extra.join(" | "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Method, Section};

    fn method(steps: &[&str]) -> Method {
        Method {
            steps: steps.iter().map(|s| (*s).to_owned()).collect(),
            ..Method::default()
        }
    }

    fn record() -> StainRecord {
        StainRecord {
            title: "Red Wine".to_owned(),
            intro_notes: vec!["Act fast.".to_owned(), "Blot, never rub.".to_owned()],
            cautions: vec!["Caution: no heat.".to_owned()],
            sections: vec![
                Section {
                    section_name: "Fresh Stain".to_owned(),
                    methods: vec![method(&["Blot.", "Rinse."]), method(&["Use salt."])],
                },
                Section {
                    section_name: "Dried Stain".to_owned(),
                    methods: vec![method(&["Soak overnight."])],
                },
            ],
            extra: Vec::new(),
            source_archive_url: "https://web.archive.org/web/20201127204719/x".to_owned(),
            source_original_url: "https://web.extension.illinois.edu/stain/x".to_owned(),
        }
    }

    #[test]
    fn one_row_per_method_across_sections() {
        let rows = flatten(&record(), 4);
        assert_eq!(rows.len(), 3);

        let row_ids: Vec<&str> = rows.iter().map(|r| r.row_id.as_str()).collect();
        assert_eq!(row_ids, vec!["4-1", "4-2", "4-3"]);

        // method_index restarts per section.
        let method_indexes: Vec<usize> = rows.iter().map(|r| r.method_index).collect();
        assert_eq!(method_indexes, vec![1, 2, 1]);

        assert_eq!(rows[0].steps, "Blot. || Rinse.");
        assert_eq!(rows[0].intro_notes, "Act fast. | Blot, never rub.");
        assert_eq!(rows[2].section, "Dried Stain");
        assert!(rows.iter().all(|r| r.stain_title == "Red Wine"));
        assert!(rows.iter().all(|r| r.top_cautions == "Caution: no heat."));
    }

    #[test]
    fn field_separators_are_field_specific() {
        let mut rec = record();
        rec.sections[0].methods[0].materials =
            vec!["Cold water".to_owned(), "Salt".to_owned()];
        rec.sections[0].methods[0].notes = vec!["A".to_owned(), "B".to_owned()];

        let row = &flatten(&rec, 1)[0];
        assert_eq!(row.materials, "Cold water ; Salt");
        assert_eq!(row.method_notes, "A | B");
    }

    #[test]
    fn minimal_row_carries_top_level_context() {
        let mut rec = record();
        rec.sections.clear();

        let row = minimal_row(&rec, 2);
        assert_eq!(row.row_id, "2-1");
        assert_eq!(row.method_index, 1);
        assert!(row.materials.is_empty());
        assert!(row.steps.is_empty());
        assert_eq!(row.method_notes, "Act fast. | Blot, never rub.");
        assert_eq!(row.method_cautions, "Caution: no heat.");
    }
}
