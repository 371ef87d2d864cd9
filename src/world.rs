use std::collections::HashMap;
use std::collections::HashSet;

use crate::error::Error;
use crate::error::Result;
use crate::quadtree::node::Level;
use crate::quadtree::node::NodeId;
use crate::quadtree::node::NodeKind;
use crate::quadtree::pool::Pool;

/// An infinite Life universe as a canonical quadtree.
///
/// The world owns the node pool and the evaluator's memo table; every
/// operation returns canonical node ids and never mutates an existing node.
/// Callers hold on to a root id, replace it with the result of each
/// operation, and hand their live roots to [`World::collect_garbage`] on a
/// cadence of their choosing.
///
/// Coordinates handed to [`World::get_cell`] and [`World::set_cell`] are
/// node-local: zero-based, top-left origin, in `[0, 2^level)`. A caller that
/// wants world coordinates centered on the node adds `2^(level - 1)` itself,
/// and re-offsets after an [`World::expand`].
pub struct World {
    pub(crate) pool: Pool,

    /// Macro-step results keyed by input node id. Equal structure always has
    /// an equal id, so the key is exact.
    pub(crate) memo: HashMap<NodeId, NodeId>,
}

impl World {
    pub fn new() -> Self {
        World {
            pool: Pool::new(),
            memo: HashMap::new(),
        }
    }

    /// The canonical single-cell node. There are exactly two of these.
    pub fn leaf(&self, alive: bool) -> NodeId {
        self.pool.leaf(alive)
    }

    /// The canonical all-dead node at `level`.
    pub fn empty(&mut self, level: Level) -> Result<NodeId> {
        self.pool.empty(level)
    }

    /// The canonical node at `level` with the given children. Fails unless
    /// every child sits at `level - 1`.
    pub fn create(&mut self, level: Level, nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId) -> Result<NodeId> {
        self.pool.branch(level, nw, ne, sw, se)
    }

    pub fn level(&self, node: NodeId) -> Level {
        self.pool.level(node)
    }

    /// Number of live cells in the subtree.
    pub fn population(&self, node: NodeId) -> u64 {
        self.pool.population(node)
    }

    /// The four children of `node`, or `None` for a single cell.
    pub fn children(&self, node: NodeId) -> Option<[NodeId; 4]> {
        self.pool.get(node).children()
    }

    /// Number of canonical nodes currently interned.
    pub fn node_count(&self) -> usize {
        self.pool.len()
    }

    /// Whether `node` is still interned. Ids disappear only when a garbage
    /// collection sweeps them.
    pub fn contains(&self, node: NodeId) -> bool {
        self.pool.contains(node)
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Read one cell. Out-of-range coordinates are dead.
    pub fn get_cell(&self, node: NodeId, x: i64, y: i64) -> bool {
        let data = self.pool.get(node);

        let side = 1i64 << data.level;
        if x < 0 || y < 0 || x >= side || y >= side {
            return false;
        }

        match data.kind {
            NodeKind::Leaf { alive } => alive,
            NodeKind::Branch { nw, ne, sw, se } => {
                if data.population == 0 {
                    return false;
                }

                let half = side >> 1;
                match (x < half, y < half) {
                    (true, true) => self.get_cell(nw, x, y),
                    (false, true) => self.get_cell(ne, x - half, y),
                    (true, false) => self.get_cell(sw, x, y - half),
                    (false, false) => self.get_cell(se, x - half, y - half),
                }
            }
        }
    }

    /// Write one cell, returning a node that differs from `node` only along
    /// the path to `(x, y)`. Writing a cell to its current state returns the
    /// original id. Out-of-range coordinates fail; the caller expands first.
    pub fn set_cell(&mut self, node: NodeId, x: i64, y: i64, alive: bool) -> Result<NodeId> {
        let level = self.pool.level(node);

        let side = 1i64 << level;
        if x < 0 || y < 0 || x >= side || y >= side {
            return Err(Error::Bounds { x, y, level });
        }

        self.set_cell_in(node, x, y, alive)
    }

    fn set_cell_in(&mut self, node: NodeId, x: i64, y: i64, alive: bool) -> Result<NodeId> {
        let data = *self.pool.get(node);

        let NodeKind::Branch { nw, ne, sw, se } = data.kind else {
            return Ok(self.pool.leaf(alive));
        };

        let half = 1i64 << (data.level - 1);
        let (nw, ne, sw, se) = match (x < half, y < half) {
            (true, true) => (self.set_cell_in(nw, x, y, alive)?, ne, sw, se),
            (false, true) => (nw, self.set_cell_in(ne, x - half, y, alive)?, sw, se),
            (true, false) => (nw, ne, self.set_cell_in(sw, x, y - half, alive)?, se),
            (false, false) => (nw, ne, sw, self.set_cell_in(se, x - half, y - half, alive)?),
        };

        self.pool.branch(data.level, nw, ne, sw, se)
    }

    /// A node one level up whose geometric center is exactly `node`: each
    /// child moves to the far corner of an otherwise empty quadrant.
    /// Population and world-centered cell coordinates are preserved.
    pub fn expand(&mut self, node: NodeId) -> Result<NodeId> {
        let data = *self.pool.get(node);

        let NodeKind::Branch { nw, ne, sw, se } = data.kind else {
            return Err(Error::Invariant("cannot expand a single cell"));
        };

        let empty = self.pool.empty(data.level - 1)?;

        let nw = self.pool.branch(data.level, empty, empty, empty, nw)?;
        let ne = self.pool.branch(data.level, empty, empty, ne, empty)?;
        let sw = self.pool.branch(data.level, empty, sw, empty, empty)?;
        let se = self.pool.branch(data.level, se, empty, empty, empty)?;

        self.pool.branch(data.level + 1, nw, ne, sw, se)
    }

    /// Whether the whole population sits in the centered half of `node`, so a
    /// macro-step loses nothing over the border. Callers expand until this
    /// holds before evolving.
    pub fn is_padded(&self, node: NodeId) -> bool {
        let data = self.pool.get(node);

        if data.level < 2 {
            return false;
        }

        let NodeKind::Branch { nw, ne, sw, se } = data.kind else {
            return false;
        };

        let inner = self.pool.population(self.pool.quad(nw)[3])
            + self.pool.population(self.pool.quad(ne)[2])
            + self.pool.population(self.pool.quad(sw)[1])
            + self.pool.population(self.pool.quad(se)[0]);

        inner == data.population
    }

    /// The same-level node straddling the vertical seam between `w` and `e`.
    pub(crate) fn centered_horizontal(&mut self, w: NodeId, e: NodeId) -> Result<NodeId> {
        let level = self.pool.level(w);

        let [_, w_ne, _, w_se] = self.pool.quad(w);
        let [e_nw, _, e_sw, _] = self.pool.quad(e);

        self.pool.branch(level, w_ne, e_nw, w_se, e_sw)
    }

    /// The same-level node straddling the horizontal seam between `n` and `s`.
    pub(crate) fn centered_vertical(&mut self, n: NodeId, s: NodeId) -> Result<NodeId> {
        let level = self.pool.level(n);

        let [_, _, n_sw, n_se] = self.pool.quad(n);
        let [s_nw, s_ne, _, _] = self.pool.quad(s);

        self.pool.branch(level, n_sw, n_se, s_nw, s_ne)
    }

    /// The exact center of a 2x2 arrangement of same-level nodes.
    pub(crate) fn centered_subnode(&mut self, nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId) -> Result<NodeId> {
        let level = self.pool.level(nw);

        let nw_se = self.pool.quad(nw)[3];
        let ne_sw = self.pool.quad(ne)[2];
        let sw_ne = self.pool.quad(sw)[1];
        let se_nw = self.pool.quad(se)[0];

        self.pool.branch(level, nw_se, ne_sw, sw_ne, se_nw)
    }

    /// Drop the evaluator memo. Interned nodes are untouched.
    pub fn clear_cache(&mut self) {
        tracing::trace!(dropped = self.memo.len(), "clearing step memo");

        self.memo.clear();
    }

    /// Compact the pool to the set reachable from `roots`.
    ///
    /// The two leaves and the cached empty nodes are implicitly reachable.
    /// The memo is dropped wholesale since its entries may point at swept
    /// nodes. Surviving nodes keep their ids; ids not reachable from any root
    /// are gone and must not be used again.
    pub fn collect_garbage(&mut self, roots: &[NodeId]) {
        let before = self.pool.len();

        let mut marked = HashSet::new();
        let mut stack: Vec<NodeId> = Vec::new();

        stack.extend(self.pool.leaf_ids());
        stack.extend_from_slice(self.pool.empty_ids());
        stack.extend_from_slice(roots);

        while let Some(id) = stack.pop() {
            if !marked.insert(id) {
                continue;
            }

            if let Some(children) = self.pool.get(id).children() {
                stack.extend(children);
            }
        }

        self.pool.retain_marked(&marked);
        self.memo.clear();

        tracing::debug!(
            before,
            after = self.pool.len(),
            roots = roots.len(),
            "collected garbage"
        );
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::World;
    use crate::error::Error;

    #[test]
    fn set_then_get() {
        let mut world = World::new();

        let root = world.empty(4).unwrap();
        let root = world.set_cell(root, 3, 11, true).unwrap();

        assert!(world.get_cell(root, 3, 11));
        assert!(!world.get_cell(root, 11, 3));
        assert_eq!(world.population(root), 1);

        // out of range reads are dead, not errors
        assert!(!world.get_cell(root, -1, 0));
        assert!(!world.get_cell(root, 16, 0));
    }

    #[test]
    fn set_is_idempotent_on_canonical_ids() {
        let mut world = World::new();

        let root = world.empty(3).unwrap();
        let a = world.set_cell(root, 2, 2, true).unwrap();
        let b = world.set_cell(a, 2, 2, true).unwrap();

        assert_eq!(a, b);

        // clearing a dead cell is also a no-op
        let c = world.set_cell(a, 5, 5, false).unwrap();
        assert_eq!(a, c);

        // and clearing the live cell returns the canonical empty
        let d = world.set_cell(a, 2, 2, false).unwrap();
        assert_eq!(d, root);
    }

    #[test]
    fn set_out_of_range_is_an_error() {
        let mut world = World::new();

        let root = world.empty(2).unwrap();
        let err = world.set_cell(root, 4, 0, true).unwrap_err();

        assert_eq!(err, Error::Bounds { x: 4, y: 0, level: 2 });
    }

    #[test]
    fn expand_centers_the_input() {
        let mut world = World::new();

        let root = world.empty(3).unwrap();
        let root = world.set_cell(root, 1, 6, true).unwrap();
        let root = world.set_cell(root, 7, 0, true).unwrap();

        let grown = world.expand(root).unwrap();

        assert_eq!(world.level(grown), 4);
        assert_eq!(world.population(grown), world.population(root));

        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(world.get_cell(grown, x + 4, y + 4), world.get_cell(root, x, y));
            }
        }
    }

    #[test]
    fn expand_rejects_leaves() {
        let mut world = World::new();

        let leaf = world.leaf(true);
        assert!(matches!(world.expand(leaf), Err(Error::Invariant(_))));
    }

    #[test]
    fn padding_predicate() {
        let mut world = World::new();

        let root = world.empty(4).unwrap();
        let centered = world.set_cell(root, 8, 8, true).unwrap();
        let cornered = world.set_cell(root, 0, 0, true).unwrap();

        assert!(world.is_padded(centered));
        assert!(!world.is_padded(cornered));

        let grown = world.expand(cornered).unwrap();
        assert!(world.is_padded(grown));
    }

    #[test]
    fn gc_keeps_reachable_nodes_only() {
        let mut world = World::new();

        let root = world.empty(4).unwrap();
        let keep = world.set_cell(root, 5, 5, true).unwrap();
        let drop = world.set_cell(root, 9, 2, true).unwrap();

        world.step(keep).unwrap();
        assert!(world.memo_len() > 0);

        world.collect_garbage(&[keep]);

        assert!(world.contains(keep));
        assert!(!world.contains(drop));
        assert_eq!(world.memo_len(), 0);

        // every node reachable from the surviving root is still there
        let mut stack = vec![keep];
        while let Some(id) = stack.pop() {
            assert!(world.contains(id));
            if let Some(children) = world.children(id) {
                stack.extend(children);
            }
        }

        // the empty ladder is implicitly reachable and still usable
        assert_eq!(world.empty(4).unwrap(), root);
    }
}
