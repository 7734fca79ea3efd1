//! Ingestion of partitioner elements into [`Block`]s.
//!
//! Elements arrive as loosely-typed JSON objects (Unstructured-style:
//! `category`/`type`, `text`, and `page_number` plus optional coordinates,
//! either flat or nested under `metadata`). A bad element is
//! reported as [`DocChunkError::MalformedBlock`] and skipped; the rest of the
//! document still goes through.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use docchunk_shared::{Block, BlockType, DocChunkError, Result};

use crate::normalize::normalize;

/// Blocks that made it through ingestion, plus one error per skipped element.
#[derive(Debug, Default)]
pub struct ParsedElements {
    pub blocks: Vec<Block>,
    pub skipped: Vec<DocChunkError>,
    /// Elements seen, including skipped ones.
    pub total: usize,
}

/// Parse a JSON document holding either an array of elements or an object
/// with an `elements` array.
///
/// Only a document that is not JSON at all, or has no element list, is an
/// error; individual bad elements end up in [`ParsedElements::skipped`].
pub fn parse_elements_json(input: &str) -> Result<ParsedElements> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| DocChunkError::parse(format!("invalid element JSON: {e}")))?;

    let elements = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("elements") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DocChunkError::parse(
                    "expected an array of elements or an object with an `elements` array",
                ));
            }
        },
        _ => {
            return Err(DocChunkError::parse(
                "expected an array of elements or an object with an `elements` array",
            ));
        }
    };

    Ok(parse_elements(&elements))
}

/// Convert elements to blocks in input order.
///
/// `index_in_page` counts accepted blocks per page from 0; block ids keep the
/// element's position in the input so skipped elements leave a visible gap.
pub fn parse_elements(elements: &[Value]) -> ParsedElements {
    let mut parsed = ParsedElements {
        total: elements.len(),
        ..ParsedElements::default()
    };
    let mut next_in_page: HashMap<u32, u32> = HashMap::new();

    for (index, element) in elements.iter().enumerate() {
        match element_parts(index, element) {
            Ok(parts) => {
                let slot = next_in_page.entry(parts.page).or_insert(0);
                let index_in_page = *slot;
                *slot += 1;

                parsed.blocks.push(Block {
                    id: format!("block_{index}"),
                    page: parts.page,
                    index_in_page,
                    block_type: parts.block_type,
                    normalized_text: normalize(&parts.text),
                    raw_text: parts.text,
                    bbox: parts.bbox,
                });
            }
            Err(err) => {
                warn!(index, error = %err, "skipping malformed element");
                parsed.skipped.push(err);
            }
        }
    }

    parsed
}

struct ElementParts {
    page: u32,
    block_type: BlockType,
    text: String,
    bbox: Option<[f64; 4]>,
}

fn element_parts(index: usize, element: &Value) -> Result<ElementParts> {
    let Value::Object(fields) = element else {
        return Err(DocChunkError::malformed(index, "element is not an object"));
    };

    let block_type = fields
        .get("category")
        .or_else(|| fields.get("type"))
        .and_then(Value::as_str)
        .map_or(BlockType::Other, BlockType::from_category);

    let text = match fields.get("text") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => return Err(DocChunkError::malformed(index, "text is not a string")),
        None => return Err(DocChunkError::malformed(index, "missing text")),
    };

    let page = lookup(fields, "page_number")
        .or_else(|| lookup(fields, "page"))
        .ok_or_else(|| DocChunkError::malformed(index, "missing page number"))?;
    let page = page_number(page)
        .ok_or_else(|| DocChunkError::malformed(index, format!("invalid page number {page}")))?;

    let bbox = ["bbox", "coordinates", "bounding_box"]
        .iter()
        .find_map(|key| lookup(fields, key))
        .and_then(bbox_from_value);

    Ok(ElementParts {
        page,
        block_type,
        text,
        bbox,
    })
}

/// A top-level field, falling back to the same key under `metadata`.
fn lookup<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields
        .get(key)
        .or_else(|| fields.get("metadata")?.as_object()?.get(key))
}

/// A page number >= 1, given as an integer or a numeric string.
fn page_number(value: &Value) -> Option<u32> {
    let page = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(page).ok().filter(|p| *p >= 1)
}

/// `[x1, y1, x2, y2]` from an array, an `{x1, y1, x2, y2}` /
/// `{left, top, right, bottom}` object, or a `{points: [[x, y], ...]}`
/// polygon (first and third corner).
fn bbox_from_value(value: &Value) -> Option<[f64; 4]> {
    match value {
        Value::Object(map) if map.contains_key("points") => {
            let points = map.get("points")?.as_array()?;
            if points.len() < 4 {
                return None;
            }
            let corner = |i: usize| -> Option<(f64, f64)> {
                let point = points[i].as_array()?;
                Some((point.first()?.as_f64()?, point.get(1)?.as_f64()?))
            };
            let (x1, y1) = corner(0)?;
            let (x2, y2) = corner(2)?;
            Some([x1, y1, x2, y2])
        }
        Value::Array(items) if items.len() >= 4 => {
            let mut out = [0.0; 4];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = item.as_f64()?;
            }
            Some(out)
        }
        Value::Object(map) => {
            let coord = |a: &str, b: &str| map.get(a).or_else(|| map.get(b)).and_then(Value::as_f64);
            Some([
                coord("x1", "left")?,
                coord("y1", "top")?,
                coord("x2", "right")?,
                coord("y2", "bottom")?,
            ])
        }
        _ => None,
    }
}
