//! Legacy VML drawing parts (`xl/drawings/vmlDrawing*.vml`).
//!
//! Comment boxes are anchored through a VML shape per commented cell; this
//! is the fallback vector format every spreadsheet consumer still expects
//! alongside a comments part. Write-only: the reader never interprets VML.

use crate::cell_ref::CellRef;
use crate::namespaces::{VML, VML_EXCEL, VML_OFFICE};
use crate::sax::{self, Emitter};
use crate::Result;

/// Build a VML drawing anchoring one hidden note box per commented cell.
///
/// Shape ids are derived from the cell position so output is deterministic.
pub fn write_vml_drawing(comment_refs: &[CellRef]) -> Result<Vec<u8>> {
    let mut em = Emitter::bare();
    em.start(sax::element(
        "xml",
        &[
            ("xmlns:v", VML),
            ("xmlns:o", VML_OFFICE),
            ("xmlns:x", VML_EXCEL),
        ],
    ))?;

    em.start(sax::element("o:shapelayout", &[("v:ext", "edit")]))?;
    em.empty(sax::element(
        "o:idmap",
        &[("v:ext", "edit"), ("data", "1")],
    ))?;
    em.end("o:shapelayout")?;

    em.start(sax::element(
        "v:shapetype",
        &[
            ("id", "_x0000_t202"),
            ("coordsize", "21600,21600"),
            ("o:spt", "202"),
            ("path", "m,l,21600r21600,l21600,xe"),
        ],
    ))?;
    em.empty(sax::element("v:stroke", &[("joinstyle", "miter")]))?;
    em.empty(sax::element(
        "v:path",
        &[("gradientshapeok", "t"), ("o:connecttype", "rect")],
    ))?;
    em.end("v:shapetype")?;

    for (i, cell) in comment_refs.iter().enumerate() {
        write_note_shape(&mut em, i, cell)?;
    }

    em.end("xml")?;
    Ok(em.into_bytes())
}

fn write_note_shape(em: &mut Emitter, index: usize, cell: &CellRef) -> Result<()> {
    let shape_id = format!("_x0000_s{}", 1025 + index);
    let col = cell.col - 1;
    let row = cell.row - 1;
    // Anchor one column to the right of the cell, two rows tall.
    let anchor = format!(
        "{}, 15, {}, 2, {}, 15, {}, 15",
        col + 1,
        row,
        col + 3,
        row + 2
    );

    em.start(sax::element(
        "v:shape",
        &[
            ("id", &shape_id),
            ("type", "#_x0000_t202"),
            (
                "style",
                "position:absolute;margin-left:59.25pt;margin-top:1.5pt;width:108pt;height:59.25pt;z-index:1;visibility:hidden",
            ),
            ("fillcolor", "#ffffe1"),
            ("o:insetmode", "auto"),
        ],
    ))?;
    em.empty(sax::element("v:fill", &[("color2", "#ffffe1")]))?;
    em.empty(sax::element(
        "v:shadow",
        &[("on", "t"), ("color", "black"), ("obscured", "t")],
    ))?;
    em.empty(sax::element("v:path", &[("o:connecttype", "none")]))?;
    em.empty(sax::element(
        "v:textbox",
        &[("style", "mso-direction-alt:auto")],
    ))?;

    em.start(sax::element("x:ClientData", &[("ObjectType", "Note")]))?;
    em.empty(sax::element("x:MoveWithCells", &[]))?;
    em.empty(sax::element("x:SizeWithCells", &[]))?;
    em.leaf("x:Anchor", &anchor)?;
    em.leaf("x:AutoFill", "False")?;
    em.leaf("x:Row", &row.to_string())?;
    em.leaf("x:Column", &col.to_string())?;
    em.end("x:ClientData")?;

    em.end("v:shape")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vml_has_one_shape_per_comment() {
        let refs = vec![
            CellRef::parse("B2").unwrap(),
            CellRef::parse("D5").unwrap(),
        ];
        let bytes = write_vml_drawing(&refs).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert_eq!(xml.matches("<v:shape ").count(), 2);
        assert!(xml.contains("_x0000_s1025"));
        assert!(xml.contains("_x0000_s1026"));
        // Zero-based anchor coordinates for B2.
        assert!(xml.contains("<x:Row>1</x:Row>"));
        assert!(xml.contains("<x:Column>1</x:Column>"));
    }

    #[test]
    fn test_vml_has_no_xml_declaration() {
        let bytes = write_vml_drawing(&[CellRef::parse("A1").unwrap()]).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.starts_with("<xml "));
    }

    #[test]
    fn test_vml_is_deterministic() {
        let refs = vec![CellRef::parse("A1").unwrap()];
        assert_eq!(
            write_vml_drawing(&refs).unwrap(),
            write_vml_drawing(&refs).unwrap()
        );
    }
}
