use serde_json::json;
use tree_reconciler::dom::{DomApi, DomOp, MemoryDom, NodeId};
use tree_reconciler::{
    h, Content, DuplicateKeys, Key, PatchTarget, Reconciler, ReconcilerConfig, ReconcilerError,
    VNode, VNodeData, SVG_NAMESPACE,
};

type Node = VNode<NodeId>;

/// `<main><{tag}></{tag}></main>`; returns (main, anchor) with an empty journal.
fn mount(r: &mut Reconciler<MemoryDom>, tag: &str) -> (NodeId, NodeId) {
    let dom = r.api_mut();
    let root = dom.create_element("main").unwrap();
    let anchor = dom.create_element(tag).unwrap();
    dom.append_child(&root, &anchor).unwrap();
    dom.take_journal();
    (root, anchor)
}

fn host(node: &Node) -> NodeId {
    *node.host_ref().unwrap()
}

fn list(keys: &[i64]) -> Node {
    h(
        "ul",
        (),
        keys.iter()
            .map(|k| h("li", VNodeData::keyed(*k), k.to_string()))
            .collect::<Vec<_>>(),
    )
}

fn journal(r: &mut Reconciler<MemoryDom>) -> Vec<DomOp> {
    r.api_mut().take_journal()
}

fn creates(ops: &[DomOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, DomOp::CreateElement { .. }))
        .count()
}

fn inserts(ops: &[DomOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, DomOp::InsertBefore { .. }))
        .count()
}

#[test]
fn first_patch_reuses_matching_anchor() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "div");

    let tree = r
        .patch(PatchTarget::Anchor(anchor), h("div", (), vec![h("span", (), "hi")]))
        .unwrap();

    assert_eq!(host(&tree), anchor);
    assert_eq!(
        serde_json::to_value(journal(&mut r)).unwrap(),
        json!([
            { "op": "create_element", "node": 2, "tag": "span" },
            { "op": "create_text", "node": 3, "text": "hi" },
            { "op": "append_child", "parent": 2, "node": 3 },
            { "op": "insert_before", "parent": 1, "node": 2, "reference": null },
        ])
    );
    assert_eq!(r.to_html(root).unwrap(), "<main><div><span>hi</span></div></main>");
}

#[test]
fn anchor_selector_includes_id_and_classes() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "div");
    r.api_mut().set_attribute(&anchor, "id", "app").unwrap();
    r.api_mut().set_attribute(&anchor, "class", "a b").unwrap();
    journal(&mut r);

    let tree = r.patch(PatchTarget::Anchor(anchor), h("div#app.a.b", (), "ok")).unwrap();

    assert_eq!(host(&tree), anchor);
    assert_eq!(creates(&journal(&mut r)), 0);
    assert_eq!(
        r.to_html(root).unwrap(),
        r#"<main><div id="app" class="a b">ok</div></main>"#
    );
}

#[test]
fn mismatched_root_is_inserted_before_old_is_removed() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "div");
    let footer = r.api_mut().create_element("footer").unwrap();
    r.api_mut().append_child(&root, &footer).unwrap();
    journal(&mut r);

    let tree = r.patch(PatchTarget::Anchor(anchor), h("section#app", (), ())).unwrap();

    let created = host(&tree);
    assert_ne!(created, anchor);
    assert_eq!(
        journal(&mut r),
        vec![
            DomOp::CreateElement {
                node: created,
                tag: "section".into(),
                namespace: None
            },
            DomOp::SetAttribute {
                node: created,
                name: "id".into(),
                value: "app".into()
            },
            DomOp::InsertBefore {
                parent: root,
                node: created,
                reference: Some(footer)
            },
            DomOp::RemoveChild {
                parent: root,
                node: anchor
            },
        ]
    );
    assert_eq!(
        r.to_html(root).unwrap(),
        r#"<main><section id="app"></section><footer></footer></main>"#
    );
}

#[test]
fn same_node_keeps_host_reference_across_patches() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "p");

    let first = r.patch(PatchTarget::Anchor(anchor), h("p", (), "one")).unwrap();
    let second = r.patch(first, h("p", (), "two")).unwrap();
    assert_eq!(host(&second), anchor);
    assert_eq!(r.api().text_content(anchor), "two");
}

#[test]
fn reversing_keyed_children_moves_without_creating() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let before = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 3, 4, 5])).unwrap();
    let hosts: Vec<NodeId> = before.children().unwrap().iter().map(host).collect();
    journal(&mut r);

    let after = r.patch(before, list(&[5, 4, 3, 2, 1])).unwrap();

    let ops = journal(&mut r);
    assert!(ops.iter().all(|op| matches!(op, DomOp::InsertBefore { .. })));
    let reversed: Vec<NodeId> = after.children().unwrap().iter().map(host).collect();
    assert_eq!(reversed, hosts.into_iter().rev().collect::<Vec<_>>());
    assert_eq!(
        r.to_html(root).unwrap(),
        "<main><ul><li>5</li><li>4</li><li>3</li><li>2</li><li>1</li></ul></main>"
    );
}

#[test]
fn rotating_keyed_children_reuses_every_host() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "ul");
    let before = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 3])).unwrap();
    let hosts: Vec<NodeId> = before.children().unwrap().iter().map(host).collect();
    journal(&mut r);

    r.patch(before, list(&[3, 1, 2])).unwrap();

    assert_eq!(
        journal(&mut r),
        vec![DomOp::InsertBefore {
            parent: anchor,
            node: hosts[2],
            reference: Some(hosts[0])
        }]
    );
    assert_eq!(r.api().child_nodes(anchor), &[hosts[2], hosts[0], hosts[1]]);
}

#[test]
fn shuffled_keys_create_only_new_children() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let before = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 3, 4, 5])).unwrap();
    journal(&mut r);

    let after = r.patch(before, list(&[3, 5, 1, 6, 2])).unwrap();

    let ops = journal(&mut r);
    assert_eq!(creates(&ops), 1);
    assert_eq!(
        ops.iter()
            .filter(|op| matches!(op, DomOp::RemoveChild { .. }))
            .count(),
        1
    );
    assert_eq!(after.children().unwrap()[3].key(), Some(&Key::Int(6)));
    assert_eq!(
        r.to_html(root).unwrap(),
        "<main><ul><li>3</li><li>5</li><li>1</li><li>6</li><li>2</li></ul></main>"
    );
}

#[test]
fn appending_creates_exactly_one_child() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "ul");
    let before = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 3])).unwrap();
    journal(&mut r);

    let after = r.patch(before, list(&[1, 2, 3, 4])).unwrap();

    let ops = journal(&mut r);
    assert_eq!(creates(&ops), 1);
    assert_eq!(inserts(&ops), 1);
    assert_eq!(
        ops.last(),
        Some(&DomOp::InsertBefore {
            parent: anchor,
            node: host(&after.children().unwrap()[3]),
            reference: None
        })
    );
}

#[test]
fn prepending_inserts_before_first_kept_child() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let before = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 3])).unwrap();
    let first = host(&before.children().unwrap()[0]);
    journal(&mut r);

    let after = r.patch(before, list(&[0, 1, 2, 3])).unwrap();

    let ops = journal(&mut r);
    assert_eq!(creates(&ops), 1);
    assert_eq!(inserts(&ops), 1);
    assert_eq!(
        ops.last(),
        Some(&DomOp::InsertBefore {
            parent: anchor,
            node: host(&after.children().unwrap()[0]),
            reference: Some(first)
        })
    );
    assert_eq!(
        r.to_html(root).unwrap(),
        "<main><ul><li>0</li><li>1</li><li>2</li><li>3</li></ul></main>"
    );
}

#[test]
fn removing_from_the_middle_detaches_one_child() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let before = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 3])).unwrap();
    let middle = host(&before.children().unwrap()[1]);
    journal(&mut r);

    r.patch(before, list(&[1, 3])).unwrap();

    assert_eq!(
        journal(&mut r),
        vec![DomOp::RemoveChild {
            parent: anchor,
            node: middle
        }]
    );
    assert_eq!(r.to_html(root).unwrap(), "<main><ul><li>1</li><li>3</li></ul></main>");
}

#[test]
fn text_and_children_swap_through_text_content() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "div");
    let tree = r.patch(PatchTarget::Anchor(anchor), h("div", (), "hello")).unwrap();
    journal(&mut r);

    let tree = r.patch(tree, h("div", (), vec![h("b", (), "x")])).unwrap();
    assert_eq!(
        serde_json::to_value(journal(&mut r)).unwrap(),
        json!([
            { "op": "set_text_content", "node": 1, "text": "" },
            { "op": "create_element", "node": 3, "tag": "b" },
            { "op": "create_text", "node": 4, "text": "x" },
            { "op": "append_child", "parent": 3, "node": 4 },
            { "op": "insert_before", "parent": 1, "node": 3, "reference": null },
        ])
    );

    r.patch(tree, h("div", (), "bye")).unwrap();
    assert_eq!(
        serde_json::to_value(journal(&mut r)).unwrap(),
        json!([
            { "op": "remove_child", "parent": 1, "node": 3 },
            { "op": "set_text_content", "node": 1, "text": "bye" },
        ])
    );
    assert_eq!(r.to_html(root).unwrap(), "<main><div>bye</div></main>");
}

#[test]
fn unchanged_text_issues_no_operations() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "div");
    let tree = r
        .patch(
            PatchTarget::Anchor(anchor),
            h("div", (), vec![h("i", (), "same"), VNode::text("leaf")]),
        )
        .unwrap();
    journal(&mut r);

    let tree = r.patch(tree, h("div", (), vec![h("i", (), "same"), VNode::text("leaf")])).unwrap();
    assert!(journal(&mut r).is_empty());

    r.patch(tree, h("div", (), vec![h("i", (), "same"), VNode::text("changed")])).unwrap();
    assert_eq!(journal(&mut r).len(), 1);
}

#[test]
fn clearing_content_removes_children() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let tree = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2])).unwrap();
    r.patch(tree, h("ul", (), ())).unwrap();
    assert_eq!(r.to_html(root).unwrap(), "<main><ul></ul></main>");
}

#[test]
fn comments_are_patched_in_place() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "div");
    let tree = r
        .patch(PatchTarget::Anchor(anchor), h("div", (), vec![h("!", (), "before")]))
        .unwrap();
    let comment = host(&tree.children().unwrap()[0]);
    journal(&mut r);

    let tree = r.patch(tree, h("div", (), vec![h("!", (), "after")])).unwrap();

    assert_eq!(host(&tree.children().unwrap()[0]), comment);
    assert_eq!(
        journal(&mut r),
        vec![DomOp::SetTextContent {
            node: comment,
            text: "after".into()
        }]
    );
    assert_eq!(r.to_html(root).unwrap(), "<main><div><!--after--></div></main>");
}

#[test]
fn namespace_is_inherited_except_below_foreign_object() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "div");
    let tree = r
        .patch(
            PatchTarget::Anchor(anchor),
            h(
                "div",
                (),
                vec![
                    h(
                        "svg",
                        (),
                        vec![
                            h("circle", (), ()),
                            h("foreignObject", (), vec![h("p", (), ())]),
                        ],
                    ),
                    h(
                        "math",
                        VNodeData::new().ns("http://www.w3.org/1998/Math/MathML"),
                        vec![VNode::element("mi", VNodeData::new(), Content::Empty)],
                    ),
                ],
            ),
        )
        .unwrap();

    let dom = r.api();
    let ns_of = |path: &[usize]| dom.namespace(host(tree.descendant(path).unwrap()));
    assert_eq!(ns_of(&[0]), Some(SVG_NAMESPACE));
    assert_eq!(ns_of(&[0, 0]), Some(SVG_NAMESPACE));
    assert_eq!(ns_of(&[0, 1]), Some(SVG_NAMESPACE));
    assert_eq!(ns_of(&[0, 1, 0]), None);
    assert_eq!(ns_of(&[1, 0]), Some("http://www.w3.org/1998/Math/MathML"));
    assert_eq!(ns_of(&[]), None);
}

#[test]
fn children_added_during_patch_inherit_namespace() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "div");
    let tree = r
        .patch(
            PatchTarget::Anchor(anchor),
            h("div", (), vec![h("svg", (), vec![h("g", (), ())])]),
        )
        .unwrap();

    let bare = |sel: &str, children: Vec<Node>| -> Node {
        let content = if children.is_empty() {
            Content::Empty
        } else {
            Content::Children(children)
        };
        VNode::element(sel, VNodeData::new(), content)
    };
    let svg = VNode::element(
        "svg",
        VNodeData::new().ns(SVG_NAMESPACE),
        Content::Children(vec![bare(
            "g",
            vec![
                bare("circle", vec![]),
                bare("foreignObject", vec![bare("p", vec![])]),
            ],
        )]),
    );
    let tree = r.patch(tree, h("div", (), vec![svg])).unwrap();

    let dom = r.api();
    let ns_of = |path: &[usize]| dom.namespace(host(tree.descendant(path).unwrap()));
    assert_eq!(ns_of(&[0, 0, 0]), Some(SVG_NAMESPACE));
    assert_eq!(ns_of(&[0, 0, 1]), Some(SVG_NAMESPACE));
    assert_eq!(ns_of(&[0, 0, 1, 0]), None);
}

#[test]
fn key_hit_with_other_selector_is_recreated() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let keyed = |sel: &str, key: i64, text: &str| -> Node { h(sel, VNodeData::keyed(key), text) };
    let before = r
        .patch(
            PatchTarget::Anchor(anchor),
            h("ul", (), vec![keyed("a", 1, "a"), keyed("b", 2, "b"), keyed("c", 3, "c")]),
        )
        .unwrap();
    let old: Vec<NodeId> = before.children().unwrap().iter().map(host).collect();
    journal(&mut r);

    let after = r
        .patch(
            before,
            h("ul", (), vec![keyed("x", 9, "x"), keyed("i", 2, "b2"), keyed("a", 1, "a")]),
        )
        .unwrap();

    let new: Vec<NodeId> = after.children().unwrap().iter().map(host).collect();
    assert_ne!(new[1], old[1]);
    assert_eq!(new[2], old[0]);
    let ops = journal(&mut r);
    assert_eq!(creates(&ops), 2);
    assert!(ops.contains(&DomOp::RemoveChild {
        parent: anchor,
        node: old[1]
    }));
    assert_eq!(r.api().child_nodes(anchor), new.as_slice());
    assert_eq!(
        r.to_html(root).unwrap(),
        "<main><ul><x>x</x><i>b2</i><a>a</a></ul></main>"
    );
}

#[test]
fn rejecting_duplicate_keys_fails_the_pass() {
    let config = ReconcilerConfig {
        duplicate_keys: DuplicateKeys::Reject,
        ..ReconcilerConfig::default()
    };
    let mut r = Reconciler::with_config(vec![], MemoryDom::new(), config);
    let (_, anchor) = mount(&mut r, "ul");

    let err = r.patch(PatchTarget::Anchor(anchor), list(&[1, 2, 1])).unwrap_err();
    assert!(matches!(err, ReconcilerError::DuplicateKey { key: Key::Int(1) }));
}

#[test]
fn first_wins_tolerates_duplicate_keys() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (root, anchor) = mount(&mut r, "ul");
    let before = r
        .patch(
            PatchTarget::Anchor(anchor),
            h(
                "ul",
                (),
                vec![
                    h("li", VNodeData::keyed(1), "1"),
                    h("li", VNodeData::keyed(2), "2a"),
                    h("li", VNodeData::keyed(2), "2b"),
                ],
            ),
        )
        .unwrap();

    r.patch(
        before,
        h(
            "ul",
            (),
            vec![h("li", VNodeData::keyed(2), "x"), h("li", VNodeData::keyed(1), "1")],
        ),
    )
    .unwrap();
    assert_eq!(r.to_html(root).unwrap(), "<main><ul><li>x</li><li>1</li></ul></main>");
}

#[test]
fn unpatched_tree_has_no_host_reference() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let err = r.patch(h("div", (), ()), h("div", (), ())).unwrap_err();
    assert!(matches!(err, ReconcilerError::MissingHostRef { .. }));
}

#[test]
fn element_posing_as_comment_is_a_shape_mismatch() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "div");
    let tree = r
        .patch(PatchTarget::Anchor(anchor), h("div", (), vec![h("!", (), "c")]))
        .unwrap();

    let impostor = VNode::element("!", VNodeData::new(), Content::Empty);
    let err = r.patch(tree, h("div", (), vec![impostor])).unwrap_err();
    assert!(matches!(err, ReconcilerError::ShapeMismatch { .. }));
}

#[test]
fn invalid_tag_surfaces_adapter_error() {
    let mut r = Reconciler::<MemoryDom>::new(vec![]);
    let (_, anchor) = mount(&mut r, "div");
    let err = r
        .patch(PatchTarget::Anchor(anchor), h("div", (), vec![h("1nope", (), ())]))
        .unwrap_err();
    assert!(matches!(err, ReconcilerError::Dom(_)));
}
