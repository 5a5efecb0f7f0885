use stage_core::kurbo::{Point, Rect};
use stage_core::*;
use std::time::Instant;

fn grid(n: usize) -> SceneGraph {
    let mut sg = SceneGraph::new();
    let root = sg.root_id();
    for i in 0..n {
        let x = (i % 250) as f64 * 12.0;
        let y = (i / 250) as f64 * 12.0;
        sg.add_node(root, Node::rect(NodeId::intern(&format!("r{i}")), x, y, 10.0, 10.0))
            .expect("insert failed");
    }
    sg
}

#[test]
#[ignore] // Run manually with `cargo test --test perf_benchmark -- --nocapture --ignored`
fn benchmark_hit_testing() {
    let sg = grid(50_000);

    let start = Instant::now();
    for i in 0..1_000 {
        let p = Point::new((i % 250) as f64 * 12.0 + 5.0, 5.0);
        let _ = sg.query_at(p, HitMode::Pick);
    }
    println!("1,000 picks over 50,000 nodes in {:?}", start.elapsed());

    let start = Instant::now();
    let hits = sg.query_rect(Rect::new(0.0, 0.0, 600.0, 600.0));
    println!("marquee hit {} nodes in {:?}", hits.len(), start.elapsed());
}

#[test]
#[ignore]
fn benchmark_json_roundtrip() {
    let sg = grid(50_000);

    let start = Instant::now();
    let json = to_json(&sg).expect("save failed");
    let _ = from_json(&json).expect("load failed");
    println!("JSON round trip of 50,000 nodes in {:?}", start.elapsed());
}
