use anyhow::{bail, Result};

use crate::extract::{self, Extraction, Source};
use crate::html;
use crate::record::{AttrField, AttrId, ProductRecord};

/// One editing session: owns the record and keeps the serialized HTML in
/// sync with every mutation, so a reader never observes stale output.
///
/// The session has exactly one writer. Extraction is the only suspending
/// operation; `begin_extraction` / `finish_extraction` bracket it and the
/// busy flag rejects a second trigger while one is pending.
pub struct Session {
    record: ProductRecord,
    html: String,
    extracting: bool,
    sources: Vec<Source>,
}

impl Session {
    pub fn new() -> Self {
        Session::with_record(ProductRecord::default())
    }

    pub fn with_record(record: ProductRecord) -> Self {
        let html = html::render(&record);
        Session {
            record,
            html,
            extracting: false,
            sources: Vec::new(),
        }
    }

    pub fn record(&self) -> &ProductRecord {
        &self.record
    }

    /// Current serialized output. Always reflects the latest mutation.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Citations from the last successful extraction. Display-only.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn is_extracting(&self) -> bool {
        self.extracting
    }

    pub fn set_sku(&mut self, value: &str) {
        self.record.set_sku(value);
        self.recompute();
    }

    pub fn set_additional_info(&mut self, value: &str) {
        self.record.set_additional_info(value);
        self.recompute();
    }

    pub fn add_attribute(&mut self) -> AttrId {
        let id = self.record.add_attribute();
        self.recompute();
        id
    }

    pub fn update_attribute(&mut self, id: AttrId, field: AttrField, value: &str) -> bool {
        let hit = self.record.update_attribute(id, field, value);
        if hit {
            self.recompute();
        }
        hit
    }

    pub fn remove_attribute(&mut self, id: AttrId) -> bool {
        let hit = self.record.remove_attribute(id);
        if hit {
            self.recompute();
        }
        hit
    }

    /// Wipe the record back to the default seed. Destructive and
    /// irreversible; callers must obtain explicit user confirmation first.
    pub fn reset(&mut self) {
        self.record.reset();
        self.sources.clear();
        self.recompute();
    }

    /// Mark an extraction as in flight and clear stale citations. Errors if
    /// one is already pending; that is how re-triggering is ignored while
    /// the first call runs.
    pub fn begin_extraction(&mut self) -> Result<()> {
        if self.extracting {
            bail!("Một yêu cầu trích xuất đang chạy, vui lòng chờ.");
        }
        self.extracting = true;
        self.sources.clear();
        Ok(())
    }

    /// Merge a finished extraction. On success the partial result is
    /// overwrite-merged and citations are stored; a late success still
    /// merges (last write wins, no conflict detection). On failure the
    /// record is untouched, the citation list stays empty, and the error is
    /// handed back for the caller to report.
    pub fn finish_extraction(&mut self, result: Result<Extraction>) -> Result<()> {
        self.extracting = false;
        let extraction = result?;
        extract::apply(&mut self.record, &extraction);
        self.sources = extraction.sources;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.html = html::render(&self.record);
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

// ── Tests ──
