use std::fmt::Write;

use crate::record::ProductRecord;

// Fixed column widths shared by every row of the table.
const LABEL_CELL: &str = "<td style=\"width:167px\">";
const VALUE_CELL: &str = "<td style=\"width:235px\">";

/// Serialize a record to the listing HTML snippet.
///
/// The output shape is a byte-exact contract with the e-commerce listing
/// editor: the `<p>####</p>` marker, the fixed table dimensions, and the
/// literal "Mã Hàng" first row must all be reproduced character for
/// character. Sku, labels, values and the description are inserted verbatim
/// with no HTML escaping; the snippet is hand-curated and the consuming
/// editor expects raw passthrough.
///
/// Total over any record state: never fails, deterministic, idempotent.
pub fn render(record: &ProductRecord) -> String {
    let mut rows = String::new();
    for attr in &record.attributes {
        // write! to a String is infallible
        let _ = write!(
            rows,
            "<tr>{}{}</td>{}{}</td></tr>",
            LABEL_CELL, attr.label, VALUE_CELL, attr.value
        );
    }

    let info = if record.additional_info.is_empty() {
        String::new()
    } else {
        record.additional_info.replace('\n', "<br/>")
    };

    format!(
        "<p>&nbsp;</p><p>####</p>\
         <table cellpadding=\"0\" cellspacing=\"0\" border=\"1\" \
         style=\"border-collapse:collapse; height:350px; width:409px\"><tbody>\
         <tr>{}Mã Hàng</td>{}{}</td></tr>\
         {}</tbody></table><p>&nbsp;<p>&nbsp;</p>{}</p>",
        LABEL_CELL, VALUE_CELL, record.sku, rows, info
    )
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AttrField, ProductRecord};

    fn book_record() -> ProductRecord {
        let mut r = ProductRecord::default();
        r.attributes.truncate(1); // keep only "Tác giả"
        r.set_sku("BK-001");
        r.update_attribute(r.attributes[0].id, AttrField::Value, "Tô Hoài");
        r.set_additional_info("Dòng 1\nDòng 2");
        r
    }

    #[test]
    fn deterministic() {
        let r = book_record();
        assert_eq!(render(&r), render(&r));
    }

    #[test]
    fn empty_record_exact_output() {
        let mut r = ProductRecord::default();
        r.attributes.clear();
        assert_eq!(
            render(&r),
            "<p>&nbsp;</p><p>####</p>\
             <table cellpadding=\"0\" cellspacing=\"0\" border=\"1\" \
             style=\"border-collapse:collapse; height:350px; width:409px\"><tbody>\
             <tr><td style=\"width:167px\">Mã Hàng</td><td style=\"width:235px\"></td></tr>\
             </tbody></table><p>&nbsp;<p>&nbsp;</p></p>"
        );
    }

    #[test]
    fn book_example() {
        let r = book_record();
        let html = render(&r);
        assert_eq!(html.matches("<tr>").count(), 2);
        assert!(html.contains("<td style=\"width:167px\">Mã Hàng</td><td style=\"width:235px\">BK-001</td>"));
        assert!(html.contains("<td style=\"width:167px\">Tác giả</td><td style=\"width:235px\">Tô Hoài</td>"));
        assert!(html.ends_with("Dòng 1<br/>Dòng 2</p>"));
    }

    #[test]
    fn one_row_per_attribute_plus_sku() {
        let mut r = ProductRecord::default();
        assert_eq!(render(&r).matches("<tr>").count(), 1 + 7);
        r.add_attribute();
        assert_eq!(render(&r).matches("<tr>").count(), 1 + 8);
        r.attributes.clear();
        assert_eq!(render(&r).matches("<tr>").count(), 1);
    }

    #[test]
    fn rows_follow_sequence_order() {
        let r = ProductRecord::default();
        let html = render(&r);
        let mut last = html.find("Mã Hàng").unwrap();
        for attr in &r.attributes {
            let pos = html.find(&format!(">{}</td>", attr.label)).unwrap();
            assert!(pos > last);
            last = pos;
        }
    }

    #[test]
    fn removed_attribute_leaves_no_trace() {
        let mut r = ProductRecord::default();
        let id = r.add_attribute();
        r.update_attribute(id, AttrField::Label, "Độc nhất");
        r.update_attribute(id, AttrField::Value, "giá trị độc nhất");
        assert!(render(&r).contains("Độc nhất"));
        r.remove_attribute(id);
        let html = render(&r);
        assert!(!html.contains("Độc nhất"));
        assert!(!html.contains("giá trị độc nhất"));
    }

    #[test]
    fn no_escaping_is_applied() {
        let mut r = ProductRecord::default();
        r.attributes.clear();
        r.set_sku("<b>&amp;</b>");
        r.set_additional_info("a < b & c");
        let html = render(&r);
        assert!(html.contains("<b>&amp;</b>"));
        assert!(html.contains("a < b & c"));
    }

    #[test]
    fn newlines_become_line_breaks_only_in_info() {
        let mut r = ProductRecord::default();
        r.attributes.clear();
        r.set_additional_info("một\nhai\nba");
        let html = render(&r);
        assert!(html.ends_with("một<br/>hai<br/>ba</p>"));
        assert!(!html.contains('\n'));
    }
}
