use lexical_populate::extraction::{extract_references, ReferenceExtractor};
use lexical_populate::types::*;
use serde_json::{json, Value};

fn media(id: &str) -> Value {
    json!({"type": "media-reference", "documentId": id, "src": format!("/{id}.png")})
}

fn entry(id: &str, content_type: &str) -> Value {
    json!({"type": "entry-reference", "documentId": id, "contentType": content_type, "title": "old"})
}

fn paragraph(children: Vec<Value>) -> Value {
    json!({"type": "paragraph", "children": children})
}

fn tree(children: Vec<Value>) -> Value {
    json!({"root": {"type": "root", "children": children}})
}

/// Builds `levels` nested paragraphs with `leaf` at the bottom.
fn nested(levels: usize, leaf: Value) -> Value {
    (0..levels).fold(leaf, |inner, _| paragraph(vec![inner]))
}

#[test]
fn test_null_and_empty_trees_yield_nothing() {
    for input in [Value::Null, json!({}), json!({"root": {}}), json!({"root": {"children": 3}})] {
        let set = extract_references(&input);
        assert!(set.media().is_empty(), "media for {input}");
        assert!(set.entries().is_empty(), "entries for {input}");
    }
}

#[test]
fn test_finds_nested_references_in_preorder() {
    let doc = tree(vec![
        paragraph(vec![json!({"type": "text", "text": "hi"}), entry("e1", "api::post.post")]),
        media("m2"),
        paragraph(vec![paragraph(vec![media("m1")])]),
        entry("e2", "api::page.page"),
    ]);

    let set = extract_references(&doc);
    assert_eq!(set.media_ids(), vec!["m2".to_string(), "m1".to_string()]);
    assert_eq!(
        set.entries(),
        &[
            EntryReference::new("e1", "api::post.post"),
            EntryReference::new("e2", "api::page.page"),
        ]
    );
}

#[test]
fn test_duplicates_are_collapsed() {
    let doc = tree(vec![
        media("m1"),
        paragraph(vec![media("m1"), entry("e1", "api::post.post")]),
        entry("e1", "api::post.post"),
        media("m1"),
    ]);

    let set = extract_references(&doc);
    assert_eq!(set.media().len(), 1);
    assert_eq!(set.entries().len(), 1);
}

#[test]
fn test_same_id_different_content_type_are_distinct() {
    let doc = tree(vec![entry("x", "api::post.post"), entry("x", "api::page.page")]);
    let set = extract_references(&doc);
    assert_eq!(set.entries().len(), 2);
    assert!(set.contains_entry("x", "api::post.post"));
    assert!(set.contains_entry("x", "api::page.page"));
}

#[test]
fn test_references_without_ids_are_ignored() {
    let doc = tree(vec![
        json!({"type": "media-reference"}),
        json!({"type": "media-reference", "documentId": 7}),
        json!({"type": "entry-reference", "documentId": "e1"}),
        json!({"type": "entry-reference", "documentId": "", "contentType": "api::post.post"}),
        json!({"documentId": "m9"}),
    ]);
    assert!(extract_references(&doc).is_empty());
}

#[test]
fn test_children_of_reference_nodes_are_walked() {
    let mut wrapper = media("m1");
    wrapper["children"] = json!([entry("e1", "api::post.post")]);
    let set = extract_references(&tree(vec![wrapper]));
    assert!(set.contains_media("m1"));
    assert!(set.contains_entry("e1", "api::post.post"));
}

#[test]
fn test_extract_does_not_modify_input() {
    let doc = tree(vec![media("m1"), paragraph(vec![entry("e1", "api::post.post")])]);
    let before = doc.clone();
    let _ = extract_references(&doc);
    assert_eq!(doc, before);
}

#[test]
fn test_depth_limit_stops_descent() {
    // Reference sits at depth 4: three paragraphs then the leaf.
    let doc = tree(vec![nested(3, media("deep"))]);

    let shallow = ReferenceExtractor::new(3);
    assert!(shallow.extract(&doc).is_empty());

    let deep_enough = ReferenceExtractor::new(4);
    assert!(deep_enough.extract(&doc).contains_media("deep"));
}

#[test]
fn test_pathologically_deep_tree_does_not_overflow() {
    let doc = tree(vec![nested(1_000, media("bottom"))]);
    let set = ReferenceExtractor::default().extract(&doc);
    assert!(set.is_empty());
}

#[test]
fn test_extract_field_accepts_string_encoded_documents() {
    let doc = tree(vec![media("m1")]);
    let inline = json!({"documentId": "p1", "content": doc.clone()});
    let encoded = json!({"documentId": "p1", "content": doc.to_string()});
    let extractor = ReferenceExtractor::default();

    assert_eq!(extractor.extract_field(&inline, "content").media_ids(), vec!["m1"]);
    assert_eq!(extractor.extract_field(&encoded, "content").media_ids(), vec!["m1"]);
    assert!(extractor.extract_field(&inline, "body").is_empty());
    assert!(extractor
        .extract_field(&json!({"content": "not json"}), "content")
        .is_empty());
}

#[test]
fn test_reference_set_serializes_as_two_lists() {
    let set = extract_references(&tree(vec![media("m1"), entry("e1", "api::post.post")]));
    let value = serde_json::to_value(&set).unwrap();
    assert_eq!(
        value,
        json!({
            "media": [{"documentId": "m1"}],
            "entries": [{"documentId": "e1", "contentType": "api::post.post"}],
        })
    );
}
