use narwhal::rng::XorShift64Star;
use narwhal::{Node, RegionTree, apply_repulsion, build_region_tree};

fn random_nodes(seed: u64, count: usize, extent: f64) -> Vec<Node> {
    let mut rng = XorShift64Star::new(seed);
    (0..count)
        .map(|_| {
            let mass = 1.0 + (rng.next_f64_unit() * 3.0).floor();
            Node::new(
                mass,
                rng.next_f64_signed() * extent,
                rng.next_f64_signed() * extent,
            )
        })
        .collect()
}

fn direct(nodes: &[Node], coefficient: f64) -> Vec<Node> {
    let mut out = nodes.to_vec();
    apply_repulsion(&mut out, coefficient);
    out
}

fn barnes_hut(nodes: &[Node], theta: f64, coefficient: f64) -> Vec<Node> {
    let mut out = nodes.to_vec();
    let tree = build_region_tree(&out);
    tree.apply_force_on_nodes(&mut out, theta, coefficient);
    out
}

fn check_region_invariants(tree: &RegionTree, node_count: usize) {
    let mut leaf_members = vec![0usize; node_count];
    for region in tree.regions() {
        if region.members.len() > 1 {
            assert!(
                region.children.len() >= 2,
                "interior region with {} members has {} children",
                region.members.len(),
                region.children.len()
            );
            for &c in &region.children {
                assert!(tree.region(c).members.len() < region.members.len());
            }
        } else {
            assert!(region.children.is_empty());
            for &m in &region.members {
                leaf_members[m] += 1;
            }
        }
    }
    assert!(
        leaf_members.iter().all(|&c| c == 1),
        "every node should end up in exactly one leaf"
    );
}

#[test]
fn theta_zero_matches_direct_repulsion() {
    let nodes = random_nodes(7, 120, 50.0);
    let exact = direct(&nodes, 2.0);
    let approx = barnes_hut(&nodes, 0.0, 2.0);
    for (i, (e, a)) in exact.iter().zip(&approx).enumerate() {
        let diff = (e.displacement - a.displacement).norm();
        let scale = e.displacement.norm().max(1.0);
        assert!(diff <= 1e-9 * scale, "node {i}: diff {diff}");
    }
}

#[test]
fn small_theta_converges_to_direct_repulsion() {
    let nodes = random_nodes(11, 80, 10.0);
    let exact = direct(&nodes, 1.0);
    let total_error = |theta: f64| -> f64 {
        barnes_hut(&nodes, theta, 1.0)
            .iter()
            .zip(&exact)
            .map(|(a, e)| (a.displacement - e.displacement).norm())
            .sum()
    };
    let magnitude: f64 = exact.iter().map(|n| n.displacement.norm()).sum();

    assert!(total_error(1e-6) <= 1e-9 * magnitude);
    assert!(total_error(0.25) <= 0.1 * magnitude);
}

#[test]
fn region_invariants_hold_for_random_layouts() {
    for seed in 1..20u64 {
        let nodes = random_nodes(seed, 64, 100.0);
        let tree = build_region_tree(&nodes);
        check_region_invariants(&tree, nodes.len());
    }
}

#[test]
fn coincident_and_collinear_nodes_terminate() {
    let mut nodes = vec![Node::new(1.0, 3.0, 3.0); 10];
    nodes.extend((0..10).map(|i| Node::new(1.0, i as f64, 0.0)));
    let tree = build_region_tree(&nodes);
    check_region_invariants(&tree, nodes.len());

    let mut applied = nodes.clone();
    tree.apply_force_on_nodes(&mut applied, 1.2, 1.0);
    assert!(
        applied
            .iter()
            .all(|n| n.displacement.iter().all(|v| v.is_finite()))
    );
}

#[test]
fn far_region_is_treated_as_one_body() {
    // A tight cluster far away from a probe node is approximated by its center of mass.
    let mut nodes = vec![
        Node::new(1.0, 0.0, 0.0),
        Node::new(1.0, 100.0, 10.5),
        Node::new(1.0, 100.0, 9.5),
    ];
    let tree = build_region_tree(&nodes);
    let cluster = tree
        .region(RegionTree::ROOT)
        .children
        .iter()
        .map(|&c| tree.region(c))
        .find(|r| r.members.len() == 2)
        .expect("cluster region");
    assert_eq!(cluster.size, 1.0);

    tree.apply_force(&mut nodes, 0, 1.2, 1.0);

    // Mass 2 at (100, 10): factor = 2 / 10100.
    let factor = 2.0 / 10100.0;
    assert!((nodes[0].displacement.x + 100.0 * factor).abs() < 1e-12);
    assert!((nodes[0].displacement.y + 10.0 * factor).abs() < 1e-12);
    assert_eq!(nodes[1].displacement.x, 0.0);
}
