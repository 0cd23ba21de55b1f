use serde::{Deserialize, Serialize};

/// One fully parsed stain detail page. Immutable once built; a pure
/// function of the page HTML plus its two source URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StainRecord {
    pub title: String,
    pub intro_notes: Vec<String>,
    pub cautions: Vec<String>,
    pub sections: Vec<Section>,
    /// Reserved; always empty in the current extraction logic.
    pub extra: Vec<String>,
    pub source_archive_url: String,
    pub source_original_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub section_name: String,
    pub methods: Vec<Method>,
}

/// One self-contained way to treat a stain. A section may offer several
/// as alternatives ("Method A, Or Method B").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub materials: Vec<String>,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
    pub cautions: Vec<String>,
    pub extra: String,
}

/// A link from the index page to one stain detail page. Produced by the
/// canonicalizer, consumed once by the fetch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLink {
    pub name: String,
    pub archive_url: String,
    pub original_url: String,
}

/// One flattened CSV row (one per method). Serde field names are the
/// exact output column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodRow {
    pub row_id: String,
    pub stain_title: String,
    pub section: String,
    pub method_index: usize,
    pub materials: String,
    pub steps: String,
    pub method_notes: String,
    pub method_cautions: String,
    pub intro_notes: String,
    pub top_cautions: String,
    pub source_archive_url: String,
    pub source_original_url: String,
    pub extra: String,
}
