//! Path and visibility graph adapter over the derived connectivity masks.

use std::f32::consts::SQRT_2;

use tacmap_core::{ConnectionKind, Direction, TileBitmap, TileCoord};
use tacmap_pather::{Graph, StateCost};

use crate::connectivity::ConnectivityCache;

/// Opaque solver vertex packing a tile as `(y << 16) | x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileVertex(u32);

impl TileVertex {
    /// Encodes a tile.
    #[must_use]
    pub const fn encode(tile: TileCoord) -> Self {
        Self((tile.y() << 16) | tile.x())
    }

    /// Recovers the encoded tile.
    #[must_use]
    pub const fn decode(self) -> TileCoord {
        TileCoord::new(self.0 & 0xffff, self.0 >> 16)
    }
}

/// Collaborator that reports tiles currently occupied by mobile actors.
pub trait PathBlocker {
    /// Sets the bit of every blocked tile. `mover` names the actor asking so
    /// its own tile can be left open.
    fn write_blocks(&self, mover: Option<u64>, blocks: &mut TileBitmap);
}

/// Traversal graph handed to the least-cost solver.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TileGraph<'a> {
    cache: &'a ConnectivityCache,
    width: u32,
    height: u32,
}

impl<'a> TileGraph<'a> {
    /// The cache must be fresh for the whole play area.
    pub(crate) fn new(cache: &'a ConnectivityCache, width: u32, height: u32) -> Self {
        Self { cache, width, height }
    }

    fn connected(&self, kind: ConnectionKind, tile: TileCoord, direction: Direction) -> bool {
        self.cache.connected(kind, tile, direction, self.width, self.height)
    }

    /// Reports whether a diagonal step formed by `first` and `second` is open.
    ///
    /// Traversal needs both L-shaped detours open; sight needs one of them.
    fn diagonal_open(&self, kind: ConnectionKind, tile: TileCoord, first: Direction, second: Direction) -> bool {
        let detour = |a: Direction, b: Direction| {
            self.connected(kind, tile, a)
                && tile
                    .neighbor(a)
                    .is_some_and(|corner| self.connected(kind, corner, b))
        };
        match kind {
            ConnectionKind::Traversal => detour(first, second) && detour(second, first),
            ConnectionKind::Visibility => detour(first, second) || detour(second, first),
        }
    }

    /// Walks the Bresenham line from `from` to `to`, stopping at the first
    /// closed edge.
    pub(crate) fn line_clear(&self, kind: ConnectionKind, from: TileCoord, to: TileCoord) -> bool {
        let (mut x, mut y) = (from.x() as i32, from.y() as i32);
        let (tx, ty) = (to.x() as i32, to.y() as i32);
        let dx = (tx - x).abs();
        let dy = -(ty - y).abs();
        let step_x = if x < tx { 1 } else { -1 };
        let step_y = if y < ty { 1 } else { -1 };
        let horizontal = if step_x > 0 { Direction::East } else { Direction::West };
        let vertical = if step_y > 0 { Direction::South } else { Direction::North };
        let mut error = dx + dy;

        while (x, y) != (tx, ty) {
            let current = TileCoord::new(x as u32, y as u32);
            let doubled = 2 * error;
            let move_x = doubled >= dy;
            let move_y = doubled <= dx;
            let open = match (move_x, move_y) {
                (true, true) => self.diagonal_open(kind, current, horizontal, vertical),
                (true, false) => self.connected(kind, current, horizontal),
                (false, true) => self.connected(kind, current, vertical),
                (false, false) => true,
            };
            if !open {
                return false;
            }
            if move_x {
                error += dy;
                x += step_x;
            }
            if move_y {
                error += dx;
                y += step_y;
            }
        }
        true
    }
}

impl Graph for TileGraph<'_> {
    type State = TileVertex;

    fn least_cost_estimate(&self, from: TileVertex, to: TileVertex) -> f32 {
        let (a, b) = (from.decode(), to.decode());
        let dx = a.x().abs_diff(b.x()) as f32;
        let dy = a.y().abs_diff(b.y()) as f32;
        let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
        (long - short) + SQRT_2 * short
    }

    fn adjacent_cost(&self, state: TileVertex, adjacent: &mut Vec<StateCost<TileVertex>>) {
        let tile = state.decode();
        for direction in Direction::ALL {
            if self.connected(ConnectionKind::Traversal, tile, direction) {
                if let Some(next) = tile.neighbor(direction) {
                    adjacent.push(StateCost {
                        state: TileVertex::encode(next),
                        cost: 1.0,
                    });
                }
            }
        }
        for (vertical, horizontal) in [
            (Direction::North, Direction::East),
            (Direction::South, Direction::East),
            (Direction::South, Direction::West),
            (Direction::North, Direction::West),
        ] {
            if !self.diagonal_open(ConnectionKind::Traversal, tile, vertical, horizontal) {
                continue;
            }
            let (hx, _) = horizontal.offset();
            let (_, vy) = vertical.offset();
            if let Some(next) = tile.offset(hx, vy) {
                adjacent.push(StateCost {
                    state: TileVertex::encode(next),
                    cost: SQRT_2,
                });
            }
        }
    }
}

/// Tiles within `range` of `from` (Euclidean, inclusive) that `from` can see.
pub(crate) fn visible_tiles(graph: &TileGraph<'_>, from: TileCoord, range: u32, out: &mut Vec<TileCoord>) {
    let reach = range as i32;
    let limit = u64::from(range) * u64::from(range);
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let distance = (dx * dx + dy * dy) as u64;
            if distance > limit {
                continue;
            }
            let Some(tile) = from.offset(dx, dy) else {
                continue;
            };
            if tile.x() >= graph.width || tile.y() >= graph.height {
                continue;
            }
            if graph.line_clear(ConnectionKind::Visibility, from, tile) {
                out.push(tile);
            }
        }
    }
}
