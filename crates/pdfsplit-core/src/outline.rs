//! Outline (bookmark) extraction
//!
//! Flattens the outline tree into document order. Malformed outlines are
//! common: items may point back at an ancestor, reference missing objects or
//! carry destinations that do not resolve to a page. Such items are skipped
//! with a warning instead of failing the split.

use crate::document::{catalog, get_resolved, is_name, resolve, resolve_dict};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};

/// Named destinations may point at dictionaries that name other destinations
const MAX_DESTINATION_DEPTH: usize = 4;

/// One outline entry that resolves to a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// Nesting depth, 1 for top-level entries
    pub level: u32,
    /// 0-based index of the destination page
    pub page_index: usize,
}

/// Read the outline of `doc`, returning `None` when the document has none
///
/// `pages` are the page object ids in page order.
pub fn read_outline(doc: &Document, pages: &[ObjectId]) -> Option<Vec<Bookmark>> {
    let catalog = catalog(doc)?;
    let outlines = resolve_dict(doc, catalog.get(b"Outlines").ok()?)?;
    let first = outlines.get(b"First").and_then(Object::as_reference).ok()?;

    let page_lookup: HashMap<ObjectId, usize> = pages
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    let mut bookmarks = Vec::new();
    let mut visited = HashSet::new();
    // Pre-order walk: a node's children come before its next sibling
    let mut stack = vec![(first, 1u32)];

    while let Some((id, level)) = stack.pop() {
        if !visited.insert(id) {
            tracing::warn!("Skipping outline item {:?}: cycle in outline tree", id);
            continue;
        }
        let Ok(node) = doc.get_dictionary(id) else {
            tracing::warn!("Skipping outline item {:?}: not a dictionary", id);
            continue;
        };

        if let Ok(next) = node.get(b"Next").and_then(Object::as_reference) {
            stack.push((next, level));
        }
        if let Ok(child) = node.get(b"First").and_then(Object::as_reference) {
            stack.push((child, level + 1));
        }

        let title = get_resolved(doc, node, b"Title")
            .and_then(|t| match t {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            })
            .unwrap_or_default();

        match destination_page(doc, node, &page_lookup) {
            Some(page_index) => bookmarks.push(Bookmark {
                title,
                level,
                page_index,
            }),
            None => tracing::warn!("Outline item \"{}\" has no resolvable destination", title),
        }
    }

    Some(bookmarks)
}

fn destination_page(
    doc: &Document,
    node: &Dictionary,
    page_lookup: &HashMap<ObjectId, usize>,
) -> Option<usize> {
    let dest = match get_resolved(doc, node, b"Dest") {
        Some(dest) => dest,
        None => {
            let action = resolve_dict(doc, node.get(b"A").ok()?)?;
            if !action.get(b"S").map(|s| is_name(s, b"GoTo")).unwrap_or(false) {
                return None;
            }
            get_resolved(doc, action, b"D")?
        }
    };
    resolve_destination(doc, dest, page_lookup, 0)
}

fn resolve_destination(
    doc: &Document,
    dest: &Object,
    page_lookup: &HashMap<ObjectId, usize>,
    depth: usize,
) -> Option<usize> {
    if depth > MAX_DESTINATION_DEPTH {
        return None;
    }

    match dest {
        // [page /XYZ left top zoom] and friends
        Object::Array(items) => match items.first()? {
            Object::Reference(id) => page_lookup.get(id).copied(),
            Object::Integer(index) => usize::try_from(*index)
                .ok()
                .filter(|index| *index < page_lookup.len()),
            _ => None,
        },
        Object::Dictionary(dict) => {
            resolve_destination(doc, get_resolved(doc, dict, b"D")?, page_lookup, depth + 1)
        }
        Object::Name(name) | Object::String(name, _) => {
            let target = named_destination(doc, name)?;
            resolve_destination(doc, resolve(doc, target)?, page_lookup, depth + 1)
        }
        Object::Reference(_) => {
            resolve_destination(doc, resolve(doc, dest)?, page_lookup, depth + 1)
        }
        _ => None,
    }
}

/// Look a name up in the catalog's `/Dests` dictionary or `/Names` tree
fn named_destination<'a>(doc: &'a Document, name: &[u8]) -> Option<&'a Object> {
    let catalog = catalog(doc)?;

    if let Some(Object::Dictionary(dests)) = get_resolved(doc, catalog, b"Dests") {
        if let Ok(target) = dests.get(name) {
            return Some(target);
        }
    }

    let names = resolve_dict(doc, catalog.get(b"Names").ok()?)?;
    let tree = names.get(b"Dests").ok()?;
    search_name_tree(doc, tree, name)
}

fn search_name_tree<'a>(doc: &'a Document, root: &'a Object, name: &[u8]) -> Option<&'a Object> {
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Object::Reference(id) = node {
            if !visited.insert(*id) {
                continue;
            }
        }
        let Some(node) = resolve_dict(doc, node) else {
            continue;
        };

        if let Some(Object::Array(entries)) = get_resolved(doc, node, b"Names") {
            for pair in entries.chunks_exact(2) {
                if matches!(&pair[0], Object::String(key, _) if key.as_slice() == name) {
                    return Some(&pair[1]);
                }
            }
        }
        if let Some(Object::Array(kids)) = get_resolved(doc, node, b"Kids") {
            stack.extend(kids.iter());
        }
    }

    None
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or PDFDocEncoding)
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    // PDFDocEncoding agrees with Latin-1 for printable characters
    bytes.iter().map(|&b| b as char).collect()
}
