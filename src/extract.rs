use serde::Deserialize;

use crate::record::{Attribute, ProductRecord};

/// A source the model consulted while grounding its answer. Display-only:
/// never merged into the record, no effect on serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// A label/value pair as returned by the model, before id assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedAttribute {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

/// Partial record extracted from raw text.
///
/// `None` means the key was missing from the model's JSON and the
/// corresponding record field must be left untouched on merge — a missing
/// key never turns into an empty-string overwrite. Present fields replace
/// the record field wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub sku: Option<String>,
    pub attributes: Option<Vec<ExtractedAttribute>>,
    pub additional_info: Option<String>,
    #[serde(skip)]
    pub sources: Vec<Source>,
}

/// Overwrite-merge an extraction into the record.
///
/// Each present field replaces the record field wholesale: a present
/// attribute list discards every existing row, including manually added
/// ones. Mapped attributes get fresh ids in the order the model returned
/// them. Infallible, so the all-or-nothing guarantee reduces to "only call
/// this after the extraction fully succeeded".
pub fn apply(record: &mut ProductRecord, extraction: &Extraction) {
    if let Some(sku) = &extraction.sku {
        record.sku = sku.clone();
    }
    if let Some(attrs) = &extraction.attributes {
        let mapped: Vec<Attribute> = attrs
            .iter()
            .map(|a| Attribute {
                id: record.fresh_id(),
                label: a.label.clone(),
                value: a.value.clone(),
            })
            .collect();
        record.attributes = mapped;
    }
    if let Some(info) = &extraction.additional_info {
        record.additional_info = info.clone();
    }
}

// ── Tests ──
