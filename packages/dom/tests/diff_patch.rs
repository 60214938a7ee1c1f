use aerial_common::{IdGenerator, SequentialIds, Uid};
use std::collections::HashSet;
use aerial_css::{CssRule, StyleSheet};
use aerial_dom::{apply_mutations, diff_node, to_html, Mutation, PatchPolicy, SyntheticNode};

/// Small deterministic generator so the property checks below are repeatable
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> usize {
        (self.next() % n) as usize
    }
}

const TAGS: &[&str] = &["div", "p", "span"];
const WORDS: &[&str] = &["a", "b", "c", "hello"];

fn random_tree(rng: &mut Lcg, ids: &mut dyn IdGenerator, depth: usize) -> SyntheticNode {
    let mut node = SyntheticNode::element(ids, TAGS[rng.below(TAGS.len() as u64)]);
    let mut names = vec!["class", "id", "title"];
    if rng.below(2) == 0 {
        names.reverse();
    }
    for name in names {
        if rng.below(2) == 0 {
            node = node.with_attribute(name, WORDS[rng.below(WORDS.len() as u64)]);
        }
    }

    let children = if depth == 0 { 0 } else { rng.below(5) };
    for _ in 0..children {
        let child = match rng.below(4) {
            0 => SyntheticNode::text(ids, WORDS[rng.below(WORDS.len() as u64)]),
            1 => SyntheticNode::comment(ids, WORDS[rng.below(WORDS.len() as u64)]),
            _ => random_tree(rng, ids, depth - 1),
        };
        node = node.with_child(child);
    }
    node
}

fn round_trip(old: &SyntheticNode, new: &SyntheticNode, ids: &mut dyn IdGenerator) -> Vec<Mutation> {
    let mut patched = old.clone();
    let mutations = diff_node(old, new);
    apply_mutations(&mut patched, &mutations, ids, PatchPolicy::Abort).unwrap();

    assert!(patched.same_structure(new), "{} != {}", to_html(&patched), to_html(new));
    assert_eq!(to_html(&patched), to_html(new));
    assert!(diff_node(&patched, new).is_empty());
    mutations
}

#[test]
fn test_diff_of_same_tree_is_empty() {
    let mut rng = Lcg(7);
    let mut ids = SequentialIds::from_seed("same");
    for _ in 0..20 {
        let tree = random_tree(&mut rng, &mut ids, 3);
        assert!(diff_node(&tree, &tree).is_empty());
        assert!(diff_node(&tree, &tree.clone()).is_empty());
    }
}

#[test]
fn test_random_round_trips() {
    let mut rng = Lcg(42);
    let mut ids = SequentialIds::from_seed("rt");
    for _ in 0..100 {
        let old = SyntheticNode::element(&mut ids, "body")
            .with_child(random_tree(&mut rng, &mut ids, 3))
            .with_child(random_tree(&mut rng, &mut ids, 2));
        let new = SyntheticNode::element(&mut ids, "body")
            .with_child(random_tree(&mut rng, &mut ids, 2))
            .with_child(random_tree(&mut rng, &mut ids, 3))
            .with_child(random_tree(&mut rng, &mut ids, 1));
        round_trip(&old, &new, &mut ids);
    }
}

#[test]
fn test_empty_span_gains_text() {
    let mut ids = SequentialIds::new("file:///span.html");
    let old = SyntheticNode::element(&mut ids, "span");
    let new = SyntheticNode::element(&mut ids, "span").with_child(SyntheticNode::text(&mut ids, "a"));

    let mutations = round_trip(&old, &new, &mut ids);
    assert_eq!(mutations.len(), 1);
    assert!(matches!(mutations[0], Mutation::InsertChild { index: 0, .. }));

    let mut patched = old.clone();
    apply_mutations(&mut patched, &mutations, &mut ids, PatchPolicy::Abort).unwrap();
    assert_eq!(to_html(&patched), "<span>a</span>");
}

#[test]
fn test_single_attribute_change_is_one_mutation() {
    let mut ids = SequentialIds::from_seed("attr");
    let build = |ids: &mut SequentialIds, title: &str| {
        SyntheticNode::element(ids, "div")
            .with_attribute("class", "card")
            .with_attribute("title", title)
            .with_child(SyntheticNode::element(ids, "p").with_child(SyntheticNode::text(ids, "body")))
    };
    let old = build(&mut ids, "one");
    let new = build(&mut ids, "two");

    let mutations = round_trip(&old, &new, &mut ids);
    assert_eq!(mutations.len(), 1);
    assert!(matches!(&mutations[0], Mutation::SetAttribute { name, .. } if name == "title"));
}

#[test]
fn test_attribute_reorder_is_kept() {
    let mut ids = SequentialIds::from_seed("order");
    let old = SyntheticNode::element(&mut ids, "a")
        .with_attribute("href", "/")
        .with_attribute("class", "nav");
    let new = SyntheticNode::element(&mut ids, "a")
        .with_attribute("class", "nav")
        .with_attribute("href", "/")
        .with_attribute("title", "home");

    let mutations = round_trip(&old, &new, &mut ids);
    assert_eq!(mutations.len(), 2);
    assert!(matches!(&mutations[1], Mutation::SetAttribute { name, index: Some(2), .. } if name == "title"));
}

#[test]
fn test_reparse_with_same_seed_keeps_identities_unique() {
    let uri = "file:///index.html";
    let list = |ids: &mut SequentialIds, names: &[&str]| {
        SyntheticNode::element(ids, "ul").with_children(
            names
                .iter()
                .map(|name| SyntheticNode::element(ids, *name))
                .collect::<Vec<_>>(),
        )
    };
    let old = list(&mut SequentialIds::new(uri), &["li", "li"]);
    let new = list(&mut SequentialIds::new(uri), &["p", "li", "li"]);

    let mutations = round_trip(&old, &new, &mut SequentialIds::new(uri));
    assert!(mutations.iter().any(|m| matches!(m, Mutation::InsertChild { .. })));

    let mut patched = old.clone();
    apply_mutations(&mut patched, &mutations, &mut SequentialIds::new(uri), PatchPolicy::Abort).unwrap();
    let uids = patched.uids();
    let unique: HashSet<&Uid> = uids.iter().collect();
    assert_eq!(uids.len(), 4);
    assert_eq!(unique.len(), uids.len());
}

#[test]
fn test_reorder_is_moves_only_and_keeps_identity() {
    let mut ids = SequentialIds::from_seed("mv");
    let names = ["h1", "p", "ul", "img", "footer", "nav"];
    let old = SyntheticNode::element(&mut ids, "main").with_children(
        names.iter().map(|name| SyntheticNode::element(&mut ids, *name)).collect::<Vec<_>>(),
    );
    let order = [5, 0, 3, 1, 2, 4];
    let new = SyntheticNode::element(&mut ids, "main").with_children(
        order
            .iter()
            .map(|&i| SyntheticNode::element(&mut ids, names[i]))
            .collect::<Vec<_>>(),
    );

    let mut patched = old.clone();
    let mutations = diff_node(&old, &new);
    apply_mutations(&mut patched, &mutations, &mut ids, PatchPolicy::Abort).unwrap();

    assert!(mutations.iter().all(|m| matches!(m, Mutation::MoveChild { .. })));
    // LIS of [5, 0, 3, 1, 2, 4] is 0 1 2 4
    assert_eq!(mutations.len(), 2);

    let expected: Vec<&Uid> = order.iter().map(|&i| &old.children().unwrap()[i].id).collect();
    let actual: Vec<&Uid> = patched.children().unwrap().iter().map(|n| &n.id).collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_style_element_round_trip() {
    let mut ids = SequentialIds::from_seed("css");
    let page = |ids: &mut SequentialIds, color: &str, media: &str| {
        SyntheticNode::document(ids).with_child(
            SyntheticNode::element(ids, "head").with_child(
                SyntheticNode::element(ids, "style").with_style_sheet(
                    StyleSheet::new(ids)
                        .with_rule(CssRule::style(ids, "a").with_declaration("color", color))
                        .with_rule(CssRule::media(ids, media).with_rule(CssRule::style(ids, "b"))),
                ),
            ),
        )
    };

    let old = page(&mut ids, "red", "screen");
    let new = page(&mut ids, "blue", "print");
    let mutations = round_trip(&old, &new, &mut ids);

    assert!(mutations.iter().all(|m| matches!(m, Mutation::StyleSheet { .. })));
    assert_eq!(mutations.len(), 3);
}

#[test]
fn test_tree_serializes_losslessly() {
    let mut rng = Lcg(3);
    let mut ids = SequentialIds::from_seed("json");
    let tree = SyntheticNode::document(&mut ids).with_child(random_tree(&mut rng, &mut ids, 3));

    let json = serde_json::to_string(&tree).unwrap();
    let back: SyntheticNode = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);

    let mutations = diff_node(&tree, &SyntheticNode::document(&mut ids));
    let json = serde_json::to_string(&mutations).unwrap();
    let back: Vec<Mutation> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, mutations);
}
