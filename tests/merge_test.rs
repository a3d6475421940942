use lexical_populate::merge::TreeMerger;
use lexical_populate::types::*;
use serde_json::{json, Value};

fn tree(children: Vec<Value>) -> Value {
    json!({"root": {"type": "root", "direction": "ltr", "children": children}})
}

fn first_child(tree: &Value) -> &Value {
    &tree["root"]["children"][0]
}

fn resolved_entry(id: &str, content_type: &str, raw: Value) -> ResolvedEntry {
    ResolvedEntry {
        document_id: id.to_string(),
        content_type: content_type.to_string(),
        title: raw.get("title").and_then(Value::as_str).map(str::to_string),
        published_at: raw.get("publishedAt").and_then(Value::as_str).map(str::to_string),
        updated_at: raw.get("updatedAt").and_then(Value::as_str).map(str::to_string),
        locale: raw.get("locale").and_then(Value::as_str).map(str::to_string),
        raw,
    }
}

#[test]
fn test_media_hit_refreshes_src_and_metadata() {
    let doc = tree(vec![json!({"type": "media-reference", "documentId": "m1", "src": "/old.png"})]);
    let mut media = ResolvedMedia::new("m1", "/new.png");
    media.thumbnail_url = Some("/new-thumb.png".to_string());
    media.alternative_text = Some("A cat".to_string());
    media.width = Some(640);

    let merged = TreeMerger::default().merge(&doc, &[media], &[]);
    let node = first_child(&merged.tree);
    assert_eq!(node["src"], "/new-thumb.png");
    assert_eq!(node["metadata"]["url"], "/new.png");
    assert_eq!(node["metadata"]["alternativeText"], "A cat");
    assert_eq!(node["metadata"]["width"], 640);
    assert_eq!(merged.stats.media_resolved, 1);
    assert_eq!(merged.stats.misses, 0);
}

#[test]
fn test_media_without_thumbnail_uses_url() {
    let doc = tree(vec![json!({"type": "media-reference", "documentId": "m1", "src": "/old.png"})]);
    let merged = TreeMerger::default().merge(&doc, &[ResolvedMedia::new("m1", "/full.png")], &[]);
    assert_eq!(first_child(&merged.tree)["src"], "/full.png");
}

#[test]
fn test_media_miss_leaves_node_unchanged() {
    let doc = tree(vec![json!({"type": "media-reference", "documentId": "m1", "src": "/old.png"})]);
    let merged = TreeMerger::default().merge(&doc, &[], &[]);
    assert_eq!(merged.tree, doc);
    assert_eq!(first_child(&merged.tree)["src"], "/old.png");
    assert_eq!(merged.stats.misses, 1);
}

#[test]
fn test_entry_hit_sets_title_status_and_data() {
    let doc = tree(vec![json!({
        "type": "entry-reference",
        "documentId": "e1",
        "contentType": "api::post.post",
        "title": "Stale"
    })]);
    let raw = json!({
        "documentId": "e1",
        "title": "Fresh",
        "publishedAt": "2024-01-01T00:00:00Z",
        "locale": "en",
        "slug": "fresh"
    });
    let entry = resolved_entry("e1", "api::post.post", raw.clone());

    let merged = TreeMerger::default().merge(&doc, &[], &[entry]);
    let node = first_child(&merged.tree);
    assert_eq!(node["title"], "Fresh");
    assert_eq!(node["metadata"]["title"], "Fresh");
    assert_eq!(node["metadata"]["status"], "published");
    assert_eq!(node["metadata"]["locale"], "en");
    assert_eq!(node["data"], raw);
    assert_eq!(merged.stats.entries_resolved, 1);
}

#[test]
fn test_entry_without_title_keeps_prior_title() {
    let doc = tree(vec![json!({
        "type": "entry-reference",
        "documentId": "e1",
        "contentType": "api::post.post",
        "title": "Existing"
    })]);
    // Record matched, but no candidate title field holds a value.
    let entry = resolved_entry("e1", "api::post.post", json!({"documentId": "e1", "headline": "Hello"}));

    let merged = TreeMerger::default().merge(&doc, &[], &[entry]);
    let node = first_child(&merged.tree);
    assert_eq!(node["title"], "Existing");
    assert_eq!(node["metadata"]["status"], "draft");
    assert_eq!(node["data"]["headline"], "Hello");
}

#[test]
fn test_entry_match_requires_content_type() {
    let doc = tree(vec![json!({
        "type": "entry-reference",
        "documentId": "e1",
        "contentType": "api::post.post",
        "title": "Stale"
    })]);
    let entry = resolved_entry("e1", "api::page.page", json!({"documentId": "e1", "title": "Wrong"}));

    let merged = TreeMerger::default().merge(&doc, &[], &[entry]);
    assert_eq!(first_child(&merged.tree)["title"], "Stale");
    assert_eq!(merged.stats.misses, 1);
}

#[test]
fn test_custom_metadata_keys_survive() {
    let doc = tree(vec![json!({
        "type": "media-reference",
        "documentId": "m1",
        "src": "/old.png",
        "metadata": {"url": "/old.png", "focalPoint": [0.5, 0.5]}
    })]);
    let merged = TreeMerger::default().merge(&doc, &[ResolvedMedia::new("m1", "/new.png")], &[]);
    let metadata = &first_child(&merged.tree)["metadata"];
    assert_eq!(metadata["url"], "/new.png");
    assert_eq!(metadata["focalPoint"], json!([0.5, 0.5]));
}

#[test]
fn test_merge_is_idempotent() {
    let doc = tree(vec![
        json!({"type": "paragraph", "children": [
            {"type": "media-reference", "documentId": "m1", "src": "/old.png"},
            {"type": "entry-reference", "documentId": "e1", "contentType": "api::post.post"}
        ]}),
        json!({"type": "media-reference", "documentId": "missing", "src": "/gone.png"}),
    ]);
    let media = vec![ResolvedMedia::new("m1", "/new.png")];
    let entries = vec![resolved_entry("e1", "api::post.post", json!({"documentId": "e1", "name": "N"}))];
    let merger = TreeMerger::default();

    let once = merger.merge(&doc, &media, &entries);
    let twice = merger.merge(&once.tree, &media, &entries);
    assert_eq!(once.tree, twice.tree);
}

#[test]
fn test_tree_without_references_passes_through() {
    let doc = tree(vec![
        json!({"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "Title"}]}),
        json!({"type": "list", "children": [{"type": "listitem", "value": 1, "children": []}]}),
        json!("stray string"),
        json!({"no_type": true}),
    ]);
    let media = vec![ResolvedMedia::new("m1", "/new.png")];
    let merged = TreeMerger::default().merge(&doc, &media, &[]);
    assert_eq!(merged.tree, doc);
    assert_eq!(merged.stats, MergeStats::default());
}

#[test]
fn test_merge_does_not_modify_input() {
    let doc = tree(vec![json!({"type": "media-reference", "documentId": "m1", "src": "/old.png"})]);
    let before = doc.clone();
    let merged = TreeMerger::default().merge(&doc, &[ResolvedMedia::new("m1", "/new.png")], &[]);
    assert_eq!(doc, before);
    assert_ne!(merged.tree, doc);
}

#[test]
fn test_malformed_trees_are_returned_unchanged() {
    let media = vec![ResolvedMedia::new("m1", "/new.png")];
    for input in [Value::Null, json!({}), json!({"root": {"children": {}}}), json!([1, 2])] {
        let merged = TreeMerger::default().merge(&input, &media, &[]);
        assert_eq!(merged.tree, input);
    }
}

#[test]
fn test_node_positions_are_preserved() {
    let doc = tree(vec![
        json!({"type": "text", "text": "a"}),
        json!({"type": "media-reference", "documentId": "m1"}),
        json!({"type": "text", "text": "b"}),
    ]);
    let merged = TreeMerger::default().merge(&doc, &[ResolvedMedia::new("m1", "/x.png")], &[]);
    let children = merged.tree["root"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(children[0]["text"], "a");
    assert_eq!(children[1]["documentId"], "m1");
    assert_eq!(children[2]["text"], "b");
    assert_eq!(merged.tree["root"]["direction"], "ltr");
}

#[test]
fn test_depth_limited_subtree_is_copied() {
    let leaf = json!({"type": "media-reference", "documentId": "m1", "src": "/old.png"});
    let doc = tree(vec![json!({"type": "paragraph", "children": [leaf]})]);
    let merged = TreeMerger::new(1).merge(&doc, &[ResolvedMedia::new("m1", "/new.png")], &[]);
    assert_eq!(merged.tree, doc);
    assert!(merged.stats.depth_limited);
}
