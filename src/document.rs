//! Borrowed views over serialized document trees.
//!
//! A document tree is a JSON object of the shape `{"root": {"children": [...]}}`
//! where every node carries a `type` tag and optionally its own `children`.
//! Only two node types carry reference semantics; everything else is opaque
//! and must survive a populate pass untouched.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::types::{ENTRY_REFERENCE_TYPE, MEDIA_REFERENCE_TYPE};

/// Classification of a single tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeView<'a> {
    MediaReference {
        document_id: &'a str,
        attrs: &'a Map<String, Value>,
    },
    EntryReference {
        document_id: &'a str,
        content_type: &'a str,
        attrs: &'a Map<String, Value>,
    },
    /// Any other node type, including reference-typed nodes that lack their
    /// identifying attributes.
    Opaque {
        node_type: &'a str,
        attrs: &'a Map<String, Value>,
    },
}

impl<'a> NodeView<'a> {
    /// Classifies a node. Returns `None` for values that are not objects or
    /// carry no string `type`; such nodes are skipped entirely.
    pub fn classify(value: &'a Value) -> Option<Self> {
        let attrs = value.as_object()?;
        let node_type = attrs.get("type")?.as_str()?;

        let view = match node_type {
            MEDIA_REFERENCE_TYPE => match non_empty_str(attrs, "documentId") {
                Some(document_id) => NodeView::MediaReference { document_id, attrs },
                None => NodeView::Opaque { node_type, attrs },
            },
            ENTRY_REFERENCE_TYPE => {
                match (
                    non_empty_str(attrs, "documentId"),
                    non_empty_str(attrs, "contentType"),
                ) {
                    (Some(document_id), Some(content_type)) => NodeView::EntryReference {
                        document_id,
                        content_type,
                        attrs,
                    },
                    _ => NodeView::Opaque { node_type, attrs },
                }
            }
            _ => NodeView::Opaque { node_type, attrs },
        };
        Some(view)
    }

    pub fn attrs(&self) -> &'a Map<String, Value> {
        match self {
            NodeView::MediaReference { attrs, .. }
            | NodeView::EntryReference { attrs, .. }
            | NodeView::Opaque { attrs, .. } => attrs,
        }
    }

    /// The node's child sequence, if it has one.
    pub fn children(&self) -> Option<&'a Vec<Value>> {
        self.attrs().get("children").and_then(Value::as_array)
    }
}

fn non_empty_str<'a>(attrs: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Returns the top-level children of a well-formed tree.
///
/// A tree is well formed only when it is an object whose `root` is an object
/// holding a `children` array.
pub fn root_children(tree: &Value) -> Option<&Vec<Value>> {
    tree.get("root")?.get("children")?.as_array()
}

/// How a document tree is stored inside its entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// The field holds the tree as a JSON object.
    Inline,
    /// The field holds the tree as a JSON-encoded string.
    Text,
}

/// A document tree read out of an entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentField<'a> {
    pub tree: Cow<'a, Value>,
    pub encoding: FieldEncoding,
    entity: &'a Map<String, Value>,
    field: &'a str,
}

impl DocumentField<'_> {
    /// Returns a shallow copy of the entity with the field replaced by
    /// `tree`, encoded the same way the original field was.
    pub fn replace(&self, tree: Value) -> Value {
        let stored = match self.encoding {
            FieldEncoding::Inline => tree,
            FieldEncoding::Text => Value::String(tree.to_string()),
        };
        let mut entity = self.entity.clone();
        entity.insert(self.field.to_string(), stored);
        Value::Object(entity)
    }
}

/// Reads the document tree stored at `entity[field]`.
///
/// Returns `None` when the entity is not an object, or the field is absent,
/// not decodable, or does not hold a well-formed tree. Callers treat `None`
/// as "nothing to do".
pub fn read_document_field<'a>(entity: &'a Value, field: &'a str) -> Option<DocumentField<'a>> {
    let object = entity.as_object()?;
    let (tree, encoding) = match object.get(field)? {
        Value::String(text) => {
            let tree: Value = serde_json::from_str(text).ok()?;
            (Cow::Owned(tree), FieldEncoding::Text)
        }
        tree @ Value::Object(_) => (Cow::Borrowed(tree), FieldEncoding::Inline),
        _ => return None,
    };
    root_children(&tree)?;
    Some(DocumentField {
        tree,
        encoding,
        entity: object,
        field,
    })
}
