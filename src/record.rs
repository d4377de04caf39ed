use serde::{Deserialize, Serialize};

/// Opaque attribute identifier. Unique within a record, stable across edits,
/// never rendered into the output.
pub type AttrId = u64;

/// One labeled specification row of the product table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttrId,
    pub label: String,
    pub value: String,
}

/// Which half of an attribute row an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrField {
    Label,
    Value,
}

/// Seed rows for a fresh record (book-like product). Values start empty.
const SEED_LABELS: [&str; 7] = [
    "Tác giả",
    "Nhà xuất bản",
    "Năm xuất bản",
    "Trọng lượng (gr)",
    "Kích thước",
    "Số trang",
    "Hình thức",
];

/// The single editable entity for one product. Attribute order is insertion
/// order and determines row order in the serialized table.
///
/// JSON shape (interchange format, also what the extraction schema mirrors):
/// `{"sku": "...", "attributes": [{"id", "label", "value"}], "additionalInfo": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub additional_info: String,
    /// Id allocator. Not persisted; `fresh_id` self-heals after deserialize.
    #[serde(skip)]
    next_id: AttrId,
}

/// Value identity over the three data fields; the id allocator is
/// bookkeeping and does not participate.
impl PartialEq for ProductRecord {
    fn eq(&self, other: &Self) -> bool {
        self.sku == other.sku
            && self.attributes == other.attributes
            && self.additional_info == other.additional_info
    }
}

impl Eq for ProductRecord {}

impl Default for ProductRecord {
    fn default() -> Self {
        let attributes = SEED_LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| Attribute {
                id: i as AttrId + 1,
                label: (*label).to_string(),
                value: String::new(),
            })
            .collect();
        ProductRecord {
            sku: String::new(),
            attributes,
            additional_info: String::new(),
            next_id: SEED_LABELS.len() as AttrId + 1,
        }
    }
}

impl ProductRecord {
    /// Allocate an id guaranteed not to collide with any existing attribute.
    /// Monotonic within a session; recovers from a deserialized record where
    /// the counter was not persisted.
    pub fn fresh_id(&mut self) -> AttrId {
        let floor = self
            .attributes
            .iter()
            .map(|a| a.id.saturating_add(1))
            .max()
            .unwrap_or(1);
        let id = self.next_id.max(floor);
        self.next_id = id.saturating_add(1);
        id
    }

    /// Wholesale replacement. Any string is accepted, including empty.
    pub fn set_sku(&mut self, value: &str) {
        self.sku = value.to_string();
    }

    /// Wholesale replacement. Any string is accepted, including empty.
    pub fn set_additional_info(&mut self, value: &str) {
        self.additional_info = value.to_string();
    }

    /// Append a new empty row at the end of the sequence.
    pub fn add_attribute(&mut self) -> AttrId {
        let id = self.fresh_id();
        self.attributes.push(Attribute {
            id,
            label: String::new(),
            value: String::new(),
        });
        id
    }

    /// Replace the label or value of the matching row. Returns false (and
    /// changes nothing) when the id is absent.
    pub fn update_attribute(&mut self, id: AttrId, field: AttrField, value: &str) -> bool {
        match self.attributes.iter_mut().find(|a| a.id == id) {
            Some(attr) => {
                match field {
                    AttrField::Label => attr.label = value.to_string(),
                    AttrField::Value => attr.value = value.to_string(),
                }
                true
            }
            None => false,
        }
    }

    /// Remove the matching row. Removing an absent id is a no-op.
    pub fn remove_attribute(&mut self, id: AttrId) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.id != id);
        self.attributes.len() < before
    }

    /// Restore the default seed, discarding all current content. Destructive;
    /// callers must gate this behind explicit user confirmation.
    pub fn reset(&mut self) {
        *self = ProductRecord::default();
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_shape() {
        let r = ProductRecord::default();
        assert_eq!(r.sku, "");
        assert_eq!(r.additional_info, "");
        assert_eq!(r.attributes.len(), 7);
        assert_eq!(r.attributes[0].label, "Tác giả");
        assert_eq!(r.attributes[6].label, "Hình thức");
        assert!(r.attributes.iter().all(|a| a.value.is_empty()));
    }

    #[test]
    fn seed_ids_unique() {
        let r = ProductRecord::default();
        let mut ids: Vec<_> = r.attributes.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn add_appends_at_end() {
        let mut r = ProductRecord::default();
        let id = r.add_attribute();
        assert_eq!(r.attributes.len(), 8);
        let last = r.attributes.last().unwrap();
        assert_eq!(last.id, id);
        assert!(last.label.is_empty() && last.value.is_empty());
        assert!(r.attributes[..7].iter().all(|a| a.id != id));
    }

    #[test]
    fn update_hits_and_misses() {
        let mut r = ProductRecord::default();
        let id = r.attributes[0].id;
        assert!(r.update_attribute(id, AttrField::Value, "Tô Hoài"));
        assert_eq!(r.attributes[0].value, "Tô Hoài");
        assert!(r.update_attribute(id, AttrField::Label, "Tác giả sách"));
        assert_eq!(r.attributes[0].label, "Tác giả sách");
        assert!(!r.update_attribute(9999, AttrField::Value, "x"));
    }

    #[test]
    fn remove_is_noop_on_missing_id() {
        let mut r = ProductRecord::default();
        let snapshot = r.clone();
        assert!(!r.remove_attribute(9999));
        assert_eq!(r, snapshot);
    }

    #[test]
    fn remove_preserves_order() {
        let mut r = ProductRecord::default();
        let id = r.attributes[2].id;
        assert!(r.remove_attribute(id));
        assert_eq!(r.attributes.len(), 6);
        assert_eq!(r.attributes[1].label, "Nhà xuất bản");
        assert_eq!(r.attributes[2].label, "Trọng lượng (gr)");
    }

    #[test]
    fn reset_restores_seed() {
        let mut r = ProductRecord::default();
        r.set_sku("BK-001");
        r.set_additional_info("Dòng 1\nDòng 2");
        r.add_attribute();
        r.remove_attribute(r.attributes[0].id);
        r.reset();
        assert_eq!(r, ProductRecord::default());
    }

    #[test]
    fn fresh_ids_never_collide_after_deserialize() {
        // next_id is skipped in the JSON, so a loaded record starts at 0.
        let json = r#"{"sku":"","attributes":[{"id":5,"label":"a","value":"b"}],"additionalInfo":""}"#;
        let mut r: ProductRecord = serde_json::from_str(json).unwrap();
        let id = r.fresh_id();
        assert!(id > 5);
        let next = r.fresh_id();
        assert!(next > id);
    }

    #[test]
    fn fresh_id_total_at_id_ceiling() {
        // A hand-crafted load can carry an id at the u64 ceiling; the
        // allocator must saturate instead of overflowing.
        let json = format!(
            r#"{{"sku":"","attributes":[{{"id":{},"label":"a","value":"b"}}],"additionalInfo":""}}"#,
            u64::MAX
        );
        let mut r: ProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(r.fresh_id(), u64::MAX);
        assert_eq!(r.fresh_id(), u64::MAX);
    }

    #[test]
    fn json_roundtrip_uses_camel_case() {
        let mut r = ProductRecord::default();
        r.set_additional_info("mô tả");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"additionalInfo\":\"mô tả\""));
        assert!(!json.contains("next_id"));
        let back: ProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
