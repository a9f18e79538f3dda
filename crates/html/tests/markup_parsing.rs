use html::{NodeKey, parse_markup};

#[test]
fn wrappers_are_flattened_and_case_is_normalized() -> anyhow::Result<()> {
    let doc = parse_markup(
        r#"<Scene id="root"><canvas></canvas><Perspective-Camera active></Perspective-Camera></Scene>"#,
    )?;
    let top = doc.element_children(NodeKey::ROOT);
    assert_eq!(top.len(), 1);
    assert_eq!(doc.tag(top[0]).as_deref(), Some("scene"));
    let kids: Vec<Option<String>> = doc
        .element_children(top[0])
        .into_iter()
        .map(|kid| doc.tag(kid))
        .collect();
    assert_eq!(kids, vec![Some("canvas".to_owned()), Some("perspective-camera".to_owned())]);
    Ok(())
}

#[test]
fn style_elements_keep_raw_text() -> anyhow::Result<()> {
    let doc = parse_markup("<style>.box > .x { --a: (1, 2); }</style><scene></scene>")?;
    let style = doc.get_elements_by_tag_name("style")[0];
    assert_eq!(doc.text_content(style), ".box > .x { --a: (1, 2); }");
    assert!(doc.pending_updates().is_empty());
    Ok(())
}

#[test]
fn append_markup_returns_top_level_keys() -> anyhow::Result<()> {
    let mut doc = parse_markup(r#"<scene id="s"></scene>"#)?;
    let scene = doc.get_element_by_id("s").ok_or_else(|| anyhow::anyhow!("scene"))?;
    let added = doc.append_markup(scene, r#"<mesh class="a"></mesh><mesh class="b"></mesh>"#)?;
    assert_eq!(added.len(), 2);
    assert_eq!(doc.element_children(scene), added);
    assert_eq!(doc.pending_updates().len(), 4);
    Ok(())
}

#[test]
fn json_snapshot_is_deterministic() -> anyhow::Result<()> {
    let doc = parse_markup(r#"<mesh id="m" class="c"></mesh>"#)?;
    let value = doc.to_json_value();
    assert_eq!(value["children"][0]["tag"], "mesh");
    assert_eq!(value["children"][0]["attrs"]["class"], "c");
    assert!(doc.to_json_string().contains("\"id\": \"m\""));
    Ok(())
}
