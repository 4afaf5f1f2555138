//! PDF fixtures for integration tests

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Build a PDF with one page per entry of `texts`, optionally with a flat
/// outline of `(title, page index)` entries
pub fn build_pdf(texts: &[String], outline: &[(&str, usize)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources = Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]);

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for text in texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_ids.push(page_id);
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        ("Resources", Object::Dictionary(resources)),
        (
            "MediaBox",
            Object::Array(
                [0, 0, 612, 792].iter().map(|v| Object::Integer(*v)).collect(),
            ),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    if !outline.is_empty() {
        catalog.set("Outlines", Object::Reference(add_flat_outline(&mut doc, &page_ids, outline)));
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn add_flat_outline(doc: &mut Document, page_ids: &[ObjectId], entries: &[(&str, usize)]) -> ObjectId {
    let root_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    for (i, (title, page)) in entries.iter().enumerate() {
        let mut item = Dictionary::from_iter(vec![
            (
                "Title",
                Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
            ),
            ("Parent", Object::Reference(root_id)),
            (
                "Dest",
                Object::Array(vec![
                    Object::Reference(page_ids[*page]),
                    Object::Name(b"Fit".to_vec()),
                ]),
            ),
        ]);
        if i > 0 {
            item.set("Prev", Object::Reference(item_ids[i - 1]));
        }
        if i + 1 < item_ids.len() {
            item.set("Next", Object::Reference(item_ids[i + 1]));
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    let root = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Outlines".to_vec())),
        ("First", Object::Reference(item_ids[0])),
        ("Last", Object::Reference(item_ids[item_ids.len() - 1])),
        ("Count", Object::Integer(item_ids.len() as i64)),
    ]);
    doc.objects.insert(root_id, Object::Dictionary(root));
    root_id
}

/// PDF whose pages read "Page 1", "Page 2", ...
pub fn numbered_pdf(num_pages: usize) -> Vec<u8> {
    let texts: Vec<String> = (1..=num_pages).map(|i| format!("Page {}", i)).collect();
    build_pdf(&texts, &[])
}

/// Text drawn on each page, in page order
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("")
        })
        .collect()
}
