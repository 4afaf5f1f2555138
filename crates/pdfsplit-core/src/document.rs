//! In-memory document view
//!
//! Everything the split-point calculator needs to know about a source PDF,
//! gathered once from the parsed `lopdf::Document`.

use crate::error::{Result, SplitError};
use crate::outline::{read_outline, Bookmark};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Fixed per-page allowance added to content size when estimating output size
pub const DEFAULT_PAGE_OVERHEAD_BYTES: u64 = 2048;

/// Attributes a page may inherit from its ancestors in the page tree
pub(crate) const INHERITABLE_ATTRIBUTES: [&[u8]; 4] =
    [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on chains of indirect references (a -> b -> c ...)
const MAX_REFERENCE_DEPTH: usize = 32;

/// Page-oriented summary of a source document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Estimated serialized size of each page, in page order
    pub page_sizes: Vec<u64>,
    /// Flattened outline in document order; `None` when the PDF has no outline
    pub bookmarks: Option<Vec<Bookmark>>,
}

impl DocumentInfo {
    /// Info for a document with `page_count` pages of unknown size and no outline
    pub fn with_page_count(page_count: usize) -> Self {
        Self {
            page_count,
            page_sizes: vec![0; page_count],
            bookmarks: None,
        }
    }

    pub fn from_document(doc: &Document, page_overhead_bytes: u64) -> Self {
        let pages = page_ids(doc);
        let page_sizes = pages
            .iter()
            .map(|&id| content_size(doc, id) + page_overhead_bytes)
            .collect();

        Self {
            page_count: pages.len(),
            page_sizes,
            bookmarks: read_outline(doc, &pages),
        }
    }
}

/// Parse PDF bytes
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| SplitError::ParseError(e.to_string()))
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize> {
    Ok(load_document(bytes)?.get_pages().len())
}

/// Page object ids in page order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Byte length of a page's content streams as stored in the file
fn content_size(doc: &Document, page_id: ObjectId) -> u64 {
    doc.get_page_contents(page_id)
        .into_iter()
        .filter_map(|id| match doc.get_object(id) {
            Ok(Object::Stream(stream)) => Some(stream.content.len() as u64),
            _ => None,
        })
        .sum()
}

/// Follow indirect references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_DEPTH {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Look up `key` in `dict` and follow references
pub(crate) fn get_resolved<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

pub(crate) fn numeric(object: &Object) -> Option<f32> {
    match *object {
        Object::Integer(i) => Some(i as f32),
        Object::Real(r) => Some(r),
        _ => None,
    }
}

pub(crate) fn is_name(object: &Object, expected: &[u8]) -> bool {
    matches!(object, Object::Name(name) if name.as_slice() == expected)
}

/// True for `/Type /Page` and `/Type /Pages` dictionaries
pub(crate) fn is_page_tree_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    dict.get(b"Type")
        .map(|t| is_name(t, b"Page") || is_name(t, b"Pages"))
        .unwrap_or(false)
}

/// Object id of the document catalog
pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .map_err(|_| SplitError::OperationError("No Root in trailer".into()))?
        .as_reference()
        .map_err(|_| SplitError::OperationError("Root is not a reference".into()))
}

pub(crate) fn catalog(doc: &Document) -> Option<&Dictionary> {
    let id = catalog_id(doc).ok()?;
    doc.get_dictionary(id).ok()
}

/// Copy of a page dictionary with inherited attributes made explicit
///
/// The returned dictionary no longer carries `/Parent`.
pub(crate) fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|_| SplitError::OperationError(format!("Page {:?} is not a dictionary", page_id)))?
        .clone();

    let mut visited = HashSet::from([page_id]);
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(parent_id) = parent {
        if !visited.insert(parent_id) {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE_ATTRIBUTES {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    page.remove(b"Parent");
    Ok(page)
}

/// Visible page rectangle as `[llx, lly, urx, ury]`
///
/// Uses the crop box when present, otherwise the media box, otherwise US Letter.
pub(crate) fn visible_box(doc: &Document, page: &Dictionary) -> [f32; 4] {
    const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

    let read = |key: &[u8]| -> Option<[f32; 4]> {
        let values = match get_resolved(doc, page, key)? {
            Object::Array(values) => values,
            _ => return None,
        };
        if values.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = numeric(resolve(doc, value)?)?;
        }
        Some([
            rect[0].min(rect[2]),
            rect[1].min(rect[3]),
            rect[0].max(rect[2]),
            rect[1].max(rect[3]),
        ])
    };

    read(b"CropBox").or_else(|| read(b"MediaBox")).unwrap_or(LETTER)
}
