//! Sub-document materialization
//!
//! Builds a fresh document from selected pages using "Construction by Whitelist":
//! 1. Flatten each selected page's inherited attributes
//! 2. Copy every object reachable from those pages, renumbering as we go
//! 3. Build a new page tree and catalog around the copied pages
//!
//! Page-tree nodes that are not part of the output (other pages, the old
//! `/Pages` root) are never copied; references to them become `null`.

use crate::document::{flatten_page, is_page_tree_node, page_ids};
use crate::error::{Result, SplitError};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Copy the source `/Info` dictionary (title, author, dates ...)
    pub include_metadata: bool,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
        }
    }
}

/// Copy the pages at `page_indices` (0-based, in the given order) into a new
/// document and serialize it
pub fn materialize(
    source: &Document,
    page_indices: &[usize],
    options: &MaterializeOptions,
) -> Result<Vec<u8>> {
    let mut output = build_document(source, page_indices, options)?;

    output.compress();

    let mut buffer = Vec::new();
    output
        .save_to(&mut buffer)
        .map_err(|e| SplitError::SerializationError(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Build the output document without serializing it
pub fn build_document(
    source: &Document,
    page_indices: &[usize],
    options: &MaterializeOptions,
) -> Result<Document> {
    let source_pages = page_ids(source);
    let page_count = source_pages.len();

    if let Some(&index) = page_indices.iter().find(|&&index| index >= page_count) {
        return Err(SplitError::PageIndexOutOfRange { index, page_count });
    }

    let mut output = Document::with_version(source.version.as_str());
    let pages_id = output.new_object_id();
    let mut copier = ObjectCopier::new(source, &mut output);

    // Reserve ids up front so references between selected pages (links,
    // annotation /P entries) resolve to the copies
    let new_page_ids: Vec<ObjectId> = page_indices
        .iter()
        .map(|&index| copier.reserve_page(source_pages[index]))
        .collect();

    for (&index, &new_id) in page_indices.iter().zip(&new_page_ids) {
        let flattened = flatten_page(source, source_pages[index])?;
        let mut page = copier.copy_dictionary(&flattened);
        page.set("Parent", Object::Reference(pages_id));
        copier.insert(new_id, Object::Dictionary(page));
    }

    let info = if options.include_metadata {
        source
            .trailer
            .get(b"Info")
            .ok()
            .map(|info| copier.copy_object(info))
    } else {
        None
    };

    copier.finish();

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(new_page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(new_page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    output.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = output.add_object(catalog);
    output.trailer.set("Root", Object::Reference(catalog_id));

    match info {
        Some(info @ Object::Reference(_)) => output.trailer.set("Info", info),
        Some(Object::Dictionary(dict)) => {
            let info_id = output.add_object(dict);
            output.trailer.set("Info", Object::Reference(info_id));
        }
        _ => {}
    }

    tracing::debug!(
        "Materialized {} pages into {} objects",
        new_page_ids.len(),
        output.objects.len()
    );

    Ok(output)
}

/// Copies objects from one document into another, renumbering references
///
/// Referenced objects are queued and copied by [`ObjectCopier::finish`], so
/// arbitrarily deep or cyclic object graphs are handled without recursion.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
    pending: Vec<ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// New id for a selected page; the first copy of a page wins the mapping
    fn reserve_page(&mut self, source_id: ObjectId) -> ObjectId {
        let new_id = self.target.new_object_id();
        self.id_map.entry(source_id).or_insert(new_id);
        new_id
    }

    fn insert(&mut self, id: ObjectId, object: Object) {
        self.target.objects.insert(id, object);
    }

    fn map_reference(&mut self, id: ObjectId) -> Object {
        if let Some(new_id) = self.id_map.get(&id) {
            return Object::Reference(*new_id);
        }

        match self.source.get_object(id) {
            Ok(object) if is_page_tree_node(object) => Object::Null,
            Ok(_) => {
                let new_id = self.target.new_object_id();
                self.id_map.insert(id, new_id);
                self.pending.push(id);
                Object::Reference(new_id)
            }
            // Dangling reference
            Err(_) => Object::Null,
        }
    }

    fn copy_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.map_reference(*id),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_object(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(&stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_object(value));
        }
        copy
    }

    /// Copy everything still queued
    fn finish(&mut self) {
        let source = self.source;
        while let Some(old_id) = self.pending.pop() {
            let Some(&new_id) = self.id_map.get(&old_id) else {
                continue;
            };
            let copied = match source.get_object(old_id) {
                Ok(object) => self.copy_object(object),
                Err(_) => Object::Null,
            };
            self.insert(new_id, copied);
        }
    }
}
