use css::{PseudoState, RuleDB, SelectorKey, StyleSheetSet, selector_keys};
use html::parse_markup;

fn style_sources(doc: &html::Document) -> Vec<(css::NodeKey, String)> {
    doc.get_elements_by_tag_name("style")
        .iter()
        .map(|node| (*node, doc.text_content(*node)))
        .collect()
}

#[test]
fn document_styles_feed_the_index() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = parse_markup(
        r#"
        <style>
            mesh { --visible: true; }
            .wheel { --rotation-x: 0; --transition: 200ms ease; }
            .wheel:hover { --scale: (1.2, 1.2, 1.2); }
            #hub:always { --rotation-z: #axle-rotation-z; }
            @robot { url: "robot.glb"; }
        </style>
        <scene><mesh id="hub" class="wheel"></mesh></scene>
        "#,
    )?;
    let mut set = StyleSheetSet::new();
    assert!(set.sync(style_sources(&doc)));
    let mut db = RuleDB::default();
    set.rebuild_into(&mut db);

    let hub = doc.get_element_by_id("hub").ok_or_else(|| anyhow::anyhow!("hub"))?;
    let keys = selector_keys("mesh", &doc.classes(hub), doc.id(hub));
    assert_eq!(
        keys,
        vec![
            SelectorKey::Tag("mesh".into()),
            SelectorKey::Class("wheel".into()),
            SelectorKey::Id("hub".into())
        ]
    );
    assert!(db.has_interaction_rule(&keys));
    assert!(db.has_always_rule(&keys));
    assert_eq!(db.rules_for(&keys[1], Some(PseudoState::Hover)).len(), 1);
    assert_eq!(db.assets()[0].name, "robot");

    // Editing the style text changes the set; the rebuilt index drops the hover rule.
    let style = doc.get_elements_by_tag_name("style")[0];
    doc.set_text(style, ".wheel { --rotation-x: 1; }")?;
    assert!(set.sync(style_sources(&doc)));
    set.rebuild_into(&mut db);
    assert!(!db.has_interaction_rule(&keys));
    assert!(db.assets().is_empty());
    Ok(())
}
