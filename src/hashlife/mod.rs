//! The Hashlife evaluator.
//!
//! `step` advances a level-k node by `2^(k - 2)` generations and returns the
//! centered level-(k - 1) result, memoized by canonical node id. `advance`
//! covers everything below a full macro-step, down to single generations.

use crate::error::Error;
use crate::error::Result;
use crate::quadtree::node::NodeId;
use crate::rules;
use crate::world::World;

impl World {
    /// The macro-step: the centered inner half of `node`, evolved forward by
    /// exactly `2^(level - 2)` generations.
    ///
    /// Results are memoized by input id, so stepping a configuration the
    /// evaluator has seen before is a single map lookup.
    pub fn step(&mut self, node: NodeId) -> Result<NodeId> {
        let level = self.level(node);

        if level < 2 {
            return Err(Error::Invariant("step requires a node at level 2 or above"));
        }

        if let Some(&hit) = self.memo.get(&node) {
            return Ok(hit);
        }

        let result = if level == 2 {
            self.step_base(node)?
        } else {
            let [nw, ne, sw, se] = self.pool.quad(node);

            // Nine overlapping level-(k-1) sub-nodes covering the input in a
            // 3x3 grid: the corners are the children themselves.
            let n01 = self.centered_horizontal(nw, ne)?;
            let n10 = self.centered_vertical(nw, sw)?;
            let n11 = self.centered_subnode(nw, ne, sw, se)?;
            let n12 = self.centered_vertical(ne, se)?;
            let n21 = self.centered_horizontal(sw, se)?;

            let r00 = self.step(nw)?;
            let r01 = self.step(n01)?;
            let r02 = self.step(ne)?;
            let r10 = self.step(n10)?;
            let r11 = self.step(n11)?;
            let r12 = self.step(n12)?;
            let r20 = self.step(sw)?;
            let r21 = self.step(n21)?;
            let r22 = self.step(se)?;

            // Four level-(k-1) intermediates, each a 2x2 block of the nine
            // results, then a second half macro-step on each.
            let a = self.create(level - 1, r00, r01, r10, r11)?;
            let b = self.create(level - 1, r01, r02, r11, r12)?;
            let c = self.create(level - 1, r10, r11, r20, r21)?;
            let d = self.create(level - 1, r11, r12, r21, r22)?;

            let a = self.step(a)?;
            let b = self.step(b)?;
            let c = self.step(c)?;
            let d = self.step(d)?;

            self.create(level - 1, a, b, c, d)?
        };

        self.memo.insert(node, result);

        Ok(result)
    }

    /// The centered inner half of `node`, evolved by `steps` generations
    /// where `steps` is at most the macro-step `2^(level - 2)`.
    ///
    /// `steps == 0` returns the untouched center. A level 2 input holds
    /// exactly one generation, so any positive `steps` advances by one.
    /// Past the macro-step the caller has to expand and retry.
    ///
    /// Unlike `step` this is not memoized; the result depends on the pair
    /// `(node, steps)`, and the interner alone already shares the subtrees.
    pub fn advance(&mut self, node: NodeId, steps: u64) -> Result<NodeId> {
        let level = self.level(node);

        if level < 2 {
            return Err(Error::Invariant("advance requires a node at level 2 or above"));
        }

        if steps == 0 {
            let [nw, ne, sw, se] = self.pool.quad(node);
            return self.centered_subnode(nw, ne, sw, se);
        }

        if level == 2 {
            return self.step(node);
        }

        let macro_steps = 1u64 << (level - 2);
        if steps == macro_steps {
            return self.step(node);
        }
        if steps > macro_steps {
            return Err(Error::Invariant("cannot advance past the macro-step; expand first"));
        }

        let [nw, ne, sw, se] = self.pool.quad(node);

        let n01 = self.centered_horizontal(nw, ne)?;
        let n10 = self.centered_vertical(nw, sw)?;
        let n11 = self.centered_subnode(nw, ne, sw, se)?;
        let n12 = self.centered_vertical(ne, se)?;
        let n21 = self.centered_horizontal(sw, se)?;

        let half = macro_steps >> 1;

        if steps <= half {
            // Evolve all nine by the full amount, then crop to the center.
            let r00 = self.advance(nw, steps)?;
            let r01 = self.advance(n01, steps)?;
            let r02 = self.advance(ne, steps)?;
            let r10 = self.advance(n10, steps)?;
            let r11 = self.advance(n11, steps)?;
            let r12 = self.advance(n12, steps)?;
            let r20 = self.advance(sw, steps)?;
            let r21 = self.advance(n21, steps)?;
            let r22 = self.advance(se, steps)?;

            let a = self.centered_subnode(r00, r01, r10, r11)?;
            let b = self.centered_subnode(r01, r02, r11, r12)?;
            let c = self.centered_subnode(r10, r11, r20, r21)?;
            let d = self.centered_subnode(r11, r12, r21, r22)?;

            self.create(level - 1, a, b, c, d)
        } else {
            // More than half a macro-step: macro-step the nine, then advance
            // the reassembled quarters by the remainder.
            let r00 = self.step(nw)?;
            let r01 = self.step(n01)?;
            let r02 = self.step(ne)?;
            let r10 = self.step(n10)?;
            let r11 = self.step(n11)?;
            let r12 = self.step(n12)?;
            let r20 = self.step(sw)?;
            let r21 = self.step(n21)?;
            let r22 = self.step(se)?;

            let a = self.create(level - 1, r00, r01, r10, r11)?;
            let b = self.create(level - 1, r01, r02, r11, r12)?;
            let c = self.create(level - 1, r10, r11, r20, r21)?;
            let d = self.create(level - 1, r11, r12, r21, r22)?;

            let a = self.advance(a, steps - half)?;
            let b = self.advance(b, steps - half)?;
            let c = self.advance(c, steps - half)?;
            let d = self.advance(d, steps - half)?;

            self.create(level - 1, a, b, c, d)
        }
    }

    /// The base case: a 4x4 input, one generation of B3/S23, a 2x2 result.
    fn step_base(&mut self, node: NodeId) -> Result<NodeId> {
        let mut grid = [[false; 4]; 4];
        for (y, row) in grid.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = self.get_cell(node, x as i64, y as i64);
            }
        }

        // inner cells, in nw/ne/sw/se order
        let mut next = [false; 4];
        for (i, (x, y)) in [(1, 1), (2, 1), (1, 2), (2, 2)].into_iter().enumerate() {
            let mut neighbors = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    if dx == 1 && dy == 1 {
                        continue;
                    }

                    if grid[y + dy - 1][x + dx - 1] {
                        neighbors += 1;
                    }
                }
            }

            next[i] = rules::next_state(grid[y][x], neighbors);
        }

        let nw = self.leaf(next[0]);
        let ne = self.leaf(next[1]);
        let sw = self.leaf(next[2]);
        let se = self.leaf(next[3]);

        self.create(1, nw, ne, sw, se)
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::quadtree::node::NodeId;
    use crate::rules;
    use crate::world::World;

    /// Build a level-2 node from 16 bits, bit `y * 4 + x` being cell (x, y).
    fn node_4x4(world: &mut World, bits: u16) -> NodeId {
        let mut node = world.empty(2).unwrap();

        for y in 0..4i64 {
            for x in 0..4i64 {
                if bits & 1 << (y * 4 + x) != 0 {
                    node = world.set_cell(node, x, y, true).unwrap();
                }
            }
        }

        node
    }

    /// Direct rule application on the inner 2x2 of a 4x4 grid, independent of
    /// the quadtree machinery.
    fn reference_inner(bits: u16) -> [bool; 4] {
        let at = |x: i64, y: i64| -> bool {
            (0..4).contains(&x) && (0..4).contains(&y) && bits & 1 << (y * 4 + x) != 0
        };

        let mut out = [false; 4];
        for (i, (x, y)) in [(1i64, 1i64), (2, 1), (1, 2), (2, 2)].into_iter().enumerate() {
            let mut neighbors = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy) != (0, 0) && at(x + dx, y + dy) {
                        neighbors += 1;
                    }
                }
            }

            out[i] = rules::next_state(at(x, y), neighbors);
        }

        out
    }

    #[test]
    fn base_case_matches_direct_rule_on_every_grid() {
        let mut world = World::new();

        for bits in 0..=u16::MAX {
            let node = node_4x4(&mut world, bits);
            let stepped = world.step(node).unwrap();

            assert_eq!(world.level(stepped), 1);

            let want = reference_inner(bits);
            let got = [
                world.get_cell(stepped, 0, 0),
                world.get_cell(stepped, 1, 0),
                world.get_cell(stepped, 0, 1),
                world.get_cell(stepped, 1, 1),
            ];

            assert_eq!(got, want, "4x4 grid {bits:#018b}");
        }
    }

    #[test]
    fn step_rejects_shallow_nodes() {
        let mut world = World::new();

        let leaf = world.leaf(true);
        let one = world.empty(1).unwrap();

        assert!(matches!(world.step(leaf), Err(Error::Invariant(_))));
        assert!(matches!(world.step(one), Err(Error::Invariant(_))));
        assert!(matches!(world.advance(one, 1), Err(Error::Invariant(_))));
    }

    #[test]
    fn step_result_is_one_level_down() {
        let mut world = World::new();

        let mut node = world.empty(6).unwrap();
        node = world.set_cell(node, 32, 31, true).unwrap();
        node = world.set_cell(node, 32, 32, true).unwrap();
        node = world.set_cell(node, 32, 33, true).unwrap();

        let stepped = world.step(node).unwrap();
        assert_eq!(world.level(stepped), 5);
    }

    #[test]
    fn second_step_is_a_pure_lookup() {
        let mut world = World::new();

        // an R-pentomino, which still evolves chaotically at this scale
        let mut node = world.empty(5).unwrap();
        for (x, y) in [(16, 15), (17, 15), (15, 16), (16, 16), (16, 17)] {
            node = world.set_cell(node, x, y, true).unwrap();
        }

        let first = world.step(node).unwrap();
        let interned = world.node_count();

        let second = world.step(node).unwrap();

        assert_eq!(first, second);
        assert_eq!(world.node_count(), interned);
    }

    #[test]
    fn advance_zero_is_the_untouched_center() {
        let mut world = World::new();

        let mut node = world.empty(4).unwrap();
        node = world.set_cell(node, 5, 9, true).unwrap();
        node = world.set_cell(node, 10, 6, true).unwrap();

        let center = world.advance(node, 0).unwrap();

        assert_eq!(world.level(center), 3);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(world.get_cell(center, x, y), world.get_cell(node, x + 4, y + 4));
            }
        }
    }

    #[test]
    fn advance_full_macro_step_delegates_to_step() {
        let mut world = World::new();

        let mut node = world.empty(4).unwrap();
        for (x, y) in [(8, 7), (8, 8), (8, 9)] {
            node = world.set_cell(node, x, y, true).unwrap();
        }

        assert_eq!(world.advance(node, 4).unwrap(), world.step(node).unwrap());
    }

    #[test]
    fn advance_past_macro_step_is_an_error() {
        let mut world = World::new();

        let node = world.empty(4).unwrap();
        assert!(matches!(world.advance(node, 5), Err(Error::Invariant(_))));
    }
}
