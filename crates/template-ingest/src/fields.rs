//! PDF form field extraction.
//!
//! Walks a document's AcroForm dictionary looking for native interactive
//! input fields (text boxes, checkboxes, choice widgets, signature fields)
//! and reports them with page-relative positions. Encrypted documents are
//! reported distinctly so callers can tell "protected" apart from "no
//! fields found".

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::IngestError;

/// Normalized type of an interactive form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Checkbox,
    Radio,
    Select,
    Signature,
}

/// Widget position on a page, as fractions of the page box with a
/// top-left origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldArea {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// One interactive field found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub areas: Vec<FieldArea>,
}

/// Result of scanning one document for fields.
///
/// `had_fields = false` is a successful outcome: the document opened fine
/// and simply carries no recognizable input fields.
#[derive(Debug, Clone)]
pub struct FieldExtraction {
    pub fields: Vec<ExtractedField>,
    pub had_fields: bool,
}

/// Field flags (`Ff`) bits.
const FF_REQUIRED: i64 = 1 << 1;
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;

/// Ancestor chain bound when resolving inherited field attributes.
const MAX_PARENT_DEPTH: usize = 8;

const LETTER_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Scan a document for native interactive input fields.
pub fn extract_fields(bytes: &[u8]) -> Result<FieldExtraction, IngestError> {
    let doc = load_document(bytes)?;

    let field_refs = acroform_field_refs(&doc);
    if field_refs.is_empty() {
        return Ok(FieldExtraction {
            fields: Vec::new(),
            had_fields: false,
        });
    }

    let annot_pages = annotation_page_index(&doc);
    let page_boxes = page_boxes(&doc);

    let mut fields = Vec::new();
    for id in field_refs {
        if let Some(field) = read_field(&doc, id, &annot_pages, &page_boxes) {
            fields.push(field);
        }
    }

    let had_fields = !fields.is_empty();
    Ok(FieldExtraction { fields, had_fields })
}

fn load_document(bytes: &[u8]) -> Result<Document, IngestError> {
    match Document::load_mem(bytes) {
        Ok(doc) => {
            if doc.trailer.get(b"Encrypt").is_ok() {
                return Err(IngestError::DocumentEncrypted);
            }
            Ok(doc)
        }
        Err(e) => {
            let message = e.to_string();
            if message.to_ascii_lowercase().contains("crypt") {
                Err(IngestError::DocumentEncrypted)
            } else {
                Err(IngestError::InvalidDocument(message))
            }
        }
    }
}

fn acroform_field_refs(doc: &Document) -> Vec<ObjectId> {
    let Ok(catalog) = doc.catalog() else {
        return Vec::new();
    };
    let Some(acro_form) = catalog.get(b"AcroForm").ok().and_then(|o| resolve_dict(doc, o)) else {
        return Vec::new();
    };
    let Some(list) = acro_form.get(b"Fields").ok().and_then(|o| resolve_array(doc, o)) else {
        return Vec::new();
    };

    list.iter().filter_map(|o| o.as_reference().ok()).collect()
}

/// Map every page annotation back to its 1-indexed page number, so widget
/// rectangles can be attributed to pages.
fn annotation_page_index(doc: &Document) -> HashMap<ObjectId, u32> {
    let mut index = HashMap::new();

    for (page_num, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Some(annots) = page.get(b"Annots").ok().and_then(|o| resolve_array(doc, o)) else {
            continue;
        };
        for annot in annots {
            if let Ok(id) = annot.as_reference() {
                index.insert(id, page_num);
            }
        }
    }

    index
}

fn page_boxes(doc: &Document) -> HashMap<u32, [f64; 4]> {
    doc.get_pages()
        .iter()
        .map(|(&num, &id)| (num, page_box(doc, id)))
        .collect()
}

/// Page box as `[llx, lly, width, height]`, falling back through the page
/// tree parent and then to US Letter.
fn page_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return LETTER_BOX;
    };

    let media_box = page
        .get(b"MediaBox")
        .ok()
        .or_else(|| {
            let parent = page.get(b"Parent").ok().and_then(|o| resolve_dict(doc, o))?;
            parent.get(b"MediaBox").ok()
        })
        .and_then(|o| resolve_array(doc, o));

    let Some(rect) = media_box else {
        return LETTER_BOX;
    };
    if rect.len() != 4 {
        return LETTER_BOX;
    }

    let mut v = [0.0f64; 4];
    for (i, obj) in rect.iter().enumerate() {
        match number(doc, obj) {
            Some(n) => v[i] = n,
            None => return LETTER_BOX,
        }
    }

    [v[0], v[1], v[2] - v[0], v[3] - v[1]]
}

fn read_field(
    doc: &Document,
    id: ObjectId,
    annot_pages: &HashMap<ObjectId, u32>,
    page_boxes: &HashMap<u32, [f64; 4]>,
) -> Option<ExtractedField> {
    let dict = doc.get_dictionary(id).ok()?;

    let name = field_name(doc, dict)?;
    let flags = inherited_i64(doc, dict, b"Ff").unwrap_or(0);
    let field_type = field_kind(doc, dict, flags)?;

    let mut areas = Vec::new();
    collect_widget_areas(doc, id, dict, annot_pages, page_boxes, &mut areas);

    Some(ExtractedField {
        name,
        field_type,
        required: flags & FF_REQUIRED != 0,
        areas,
    })
}

fn field_kind(doc: &Document, dict: &Dictionary, flags: i64) -> Option<FieldType> {
    let ft = inherited_name(doc, dict, b"FT")?;

    match ft.as_slice() {
        b"Tx" => Some(FieldType::Text),
        b"Ch" => Some(FieldType::Select),
        b"Sig" => Some(FieldType::Signature),
        b"Btn" => {
            if flags & FF_PUSHBUTTON != 0 {
                // Pushbuttons carry no data and are not schema fields.
                None
            } else if flags & FF_RADIO != 0 {
                Some(FieldType::Radio)
            } else {
                Some(FieldType::Checkbox)
            }
        }
        _ => None,
    }
}

fn field_name(doc: &Document, dict: &Dictionary) -> Option<String> {
    let obj = dict.get(b"T").ok()?;
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };

    match obj {
        Object::String(bytes, _) => {
            let name = decode_text_string(bytes);
            let trimmed = name.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

fn collect_widget_areas(
    doc: &Document,
    id: ObjectId,
    dict: &Dictionary,
    annot_pages: &HashMap<ObjectId, u32>,
    page_boxes: &HashMap<u32, [f64; 4]>,
    areas: &mut Vec<FieldArea>,
) {
    // A field dictionary with a Rect is its own widget annotation.
    if dict.has(b"Rect") {
        if let Some(area) = widget_area(doc, id, dict, annot_pages, page_boxes) {
            areas.push(area);
        }
        return;
    }

    let Some(kids) = dict.get(b"Kids").ok().and_then(|o| resolve_array(doc, o)) else {
        return;
    };
    for kid in kids {
        let Ok(kid_id) = kid.as_reference() else {
            continue;
        };
        let Ok(kid_dict) = doc.get_dictionary(kid_id) else {
            continue;
        };
        if let Some(area) = widget_area(doc, kid_id, kid_dict, annot_pages, page_boxes) {
            areas.push(area);
        }
    }
}

fn widget_area(
    doc: &Document,
    id: ObjectId,
    dict: &Dictionary,
    annot_pages: &HashMap<ObjectId, u32>,
    page_boxes: &HashMap<u32, [f64; 4]>,
) -> Option<FieldArea> {
    let rect = dict.get(b"Rect").ok().and_then(|o| resolve_array(doc, o))?;
    if rect.len() != 4 {
        return None;
    }

    let mut v = [0.0f64; 4];
    for (i, obj) in rect.iter().enumerate() {
        v[i] = number(doc, obj)?;
    }

    let page = annot_pages.get(&id).copied().unwrap_or(1);
    let &[bx, by, bw, bh] = page_boxes.get(&page).unwrap_or(&LETTER_BOX);
    if bw <= 0.0 || bh <= 0.0 {
        return None;
    }

    let (llx, urx) = (v[0].min(v[2]), v[0].max(v[2]));
    let (lly, ury) = (v[1].min(v[3]), v[1].max(v[3]));

    // PDF rectangles are bottom-left origin; areas are top-left fractions.
    Some(FieldArea {
        page,
        x: (llx - bx) / bw,
        y: (by + bh - ury) / bh,
        w: (urx - llx) / bw,
        h: (ury - lly) / bh,
    })
}

fn inherited_i64(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    let mut current = Some(dict);
    for _ in 0..MAX_PARENT_DEPTH {
        let d = current?;
        if let Some(value) = d.get(key).ok().and_then(|o| o.as_i64().ok()) {
            return Some(value);
        }
        current = d.get(b"Parent").ok().and_then(|o| resolve_dict(doc, o));
    }
    None
}

fn inherited_name(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<u8>> {
    let mut current = Some(dict);
    for _ in 0..MAX_PARENT_DEPTH {
        let d = current?;
        if let Some(value) = d.get(key).ok().and_then(|o| o.as_name().ok()) {
            return Some(value.to_vec());
        }
        current = d.get(b"Parent").ok().and_then(|o| resolve_dict(doc, o));
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        other => other.as_dict().ok(),
    }
}

fn resolve_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok(),
        other => other.as_array().ok(),
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        Object::Reference(id) => number(doc, doc.get_object(*id).ok()?),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when BOM-prefixed, else UTF-8, else
/// Latin-1.
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}
