use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scopeviz::config::LayoutConfig;
use scopeviz::ir::{NodeId, NodeRecord, SourceGraph};
use scopeviz::{Theme, compute_layout, derive_visible, render_dot};
use std::hint::black_box;

/// `blocks` sequential scopes, each holding `ops` op/value pairs chained
/// through the whole model.
fn chained_model(blocks: usize, ops: usize) -> Vec<NodeRecord> {
    let root: NodeId = 0;
    let mut records = Vec::new();
    let mut root_children = Vec::new();
    let mut next_id: NodeId = 1;
    let mut block_ids = Vec::new();
    for _ in 0..blocks {
        block_ids.push(next_id);
        root_children.push(next_id);
        next_id += 1;
    }
    let leaf_base = next_id;
    let total_pairs = (blocks * ops) as NodeId;
    for (b, &block) in block_ids.iter().enumerate() {
        let mut children = Vec::new();
        for k in 0..ops {
            let pair = (b * ops + k) as NodeId;
            let op = leaf_base + 2 * pair;
            let value = op + 1;
            children.push(op);
            children.push(value);
            records.push(NodeRecord::operation(op, &format!("op{pair}"), Some(block), &[value]));
            let next: Vec<NodeId> = if pair + 1 < total_pairs { vec![value + 1] } else { Vec::new() };
            records.push(NodeRecord::value(value, &format!("[{pair}, 64]"), Some(block), &next));
        }
        records.push(NodeRecord::scope(block, &format!("block{b}"), Some(root), &children));
    }
    records.push(NodeRecord::scope(root, "model", None, &root_children));
    records
}

fn bench_engine(c: &mut Criterion) {
    let config = LayoutConfig::default();
    let theme = Theme::default();
    let mut group = c.benchmark_group("toggle_layout_render");
    for &(blocks, ops) in &[(4usize, 8usize), (16, 16), (64, 16)] {
        let mut source = SourceGraph::load(chained_model(blocks, ops)).expect("model loads");
        source.expand_all();
        // Collapse every other block so escaping values get lifted.
        for block in (1..=blocks as NodeId).step_by(2) {
            source.set_collapsed(block, true).expect("block exists");
        }
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{blocks}x{ops}")),
            &source,
            |b, source| {
                b.iter(|| {
                    let visible = derive_visible(black_box(source)).expect("visible set");
                    let layout = compute_layout(&visible, &config).expect("layout");
                    black_box(layout);
                    black_box(render_dot(&visible, &theme));
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
