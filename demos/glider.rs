use macrocell::NodeId;
use macrocell::World;
use macrocell::pattern;

// See: https://conwaylife.com/wiki/Glider
const GLIDER: &[u8] = b"#N Glider\nx = 3, y = 3, rule = B3/S23\nbob$2bo$3o!\n";

/// Draw the 16x16 window around the node's center.
fn render(world: &World, node: NodeId) -> String {
    let half = 1i64 << (world.level(node) - 1);
    let mut out = String::new();

    for y in 0..16 {
        for x in 0..16 {
            let alive = world.get_cell(node, half - 8 + x, half - 8 + y);
            out.push(if alive { '#' } else { '.' });
        }

        out.push('\n');
    }

    out
}

fn main() -> anyhow::Result<()> {
    macrocell::init_tracing();

    let mut world = World::new();
    let mut root = pattern::load(&mut world, GLIDER)?;

    for generation in 0..8u32 {
        println!("generation {generation} (population {})", world.population(root));
        print!("{}", render(&world, root));
        println!();

        // Grow until the pattern sits in the center, plus one ring so the
        // advance result still contains everything.
        while !world.is_padded(root) {
            root = world.expand(root)?;
        }
        root = world.expand(root)?;

        root = world.advance(root, 1)?;
    }

    world.collect_garbage(&[root]);

    Ok(())
}
