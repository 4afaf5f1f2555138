//! Grid sections
//!
//! Turns every page into `rows x columns` section pages. A section page is a
//! copy of the source page dictionary that shares its content streams and
//! resources; only `/MediaBox` and `/CropBox` change, so nothing is re-rendered.
//!
//! Sections are ordered row by row from the top of the page as displayed,
//! left to right within a row, so `/Rotate` decides which edge of the media
//! box is "top".

use crate::document::{catalog_id, flatten_page, numeric, page_ids, visible_box};
use crate::error::{Result, SplitError};
use crate::params::GridSections;
use lopdf::{Dictionary, Document, Object};

/// Rectangles `[llx, lly, urx, ury]` for each section of `rect`, in reading
/// order for a page displayed with `rotation` degrees clockwise
pub fn section_boxes(rect: [f32; 4], grid: &GridSections, rotation: i64) -> Vec<[f32; 4]> {
    let [llx, lly, urx, ury] = rect;
    let rows = grid.rows();
    let columns = grid.columns();

    // Number of bands along the user-space x and y axes
    let (x_bands, y_bands) = match rotation {
        90 | 270 => (rows, columns),
        _ => (columns, rows),
    };
    let cell_width = (urx - llx) / x_bands as f32;
    let cell_height = (ury - lly) / y_bands as f32;

    let mut boxes = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        for column in 0..columns {
            // Band indices count up from the lower-left corner of user space
            let (x, y) = match rotation {
                90 => (row, column),
                180 => (columns - 1 - column, row),
                270 => (rows - 1 - row, columns - 1 - column),
                _ => (column, rows - 1 - row),
            };
            let left = llx + x as f32 * cell_width;
            let bottom = lly + y as f32 * cell_height;
            boxes.push([left, bottom, left + cell_width, bottom + cell_height]);
        }
    }
    boxes
}

/// Clockwise display rotation of a flattened page: 0, 90, 180 or 270
pub(crate) fn page_rotation(page: &Dictionary) -> i64 {
    let degrees = page
        .get(b"Rotate")
        .ok()
        .and_then(numeric)
        .map(|d| d as i64)
        .unwrap_or(0)
        .rem_euclid(360);
    if degrees % 90 == 0 {
        degrees
    } else {
        0
    }
}

/// Build a document whose pages are the sections of `source`'s pages
pub fn build_section_document(source: &Document, grid: &GridSections) -> Result<Document> {
    let mut doc = source.clone();
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page_id in page_ids(source) {
        let page = flatten_page(source, page_id)?;
        let rect = visible_box(source, &page);
        let rotation = page_rotation(&page);

        for cell in section_boxes(rect, grid, rotation) {
            let mut section = page.clone();
            section.set("MediaBox", rect_object(cell));
            section.set("CropBox", rect_object(cell));
            // Annotations sit in the parent page's coordinate space
            section.remove(b"Annots");
            section.set("Parent", Object::Reference(pages_id));
            kids.push(Object::Reference(doc.add_object(section)));
        }
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = catalog_id(&doc)?;
    match doc.objects.get_mut(&catalog_id) {
        Some(Object::Dictionary(ref mut catalog)) => {
            catalog.set("Pages", Object::Reference(pages_id));
        }
        _ => return Err(SplitError::OperationError("Invalid catalog".into())),
    }

    tracing::debug!(
        "Sectioned document into {} pages ({} per page)",
        doc.get_pages().len(),
        grid.fan_out()
    );

    Ok(doc)
}

fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|v| Object::Real(*v)).collect())
}
