//! Cell-wise neighbourhood analysis of masks

use super::Mask;

/// 4-connected neighbour offsets as (row, col)
const ROOK: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

impl Mask {
    /// Cells that are set and have at least one 4-neighbour that is unset or
    /// lies outside the grid.
    pub fn boundary(&self) -> Mask {
        let (rows, cols) = self.shape();
        let mut out = Mask::empty(&self.grid_spec());

        for row in 0..rows {
            for col in 0..cols {
                if !self.get(row, col) {
                    continue;
                }
                let on_edge = ROOK.iter().any(|&(dr, dc)| {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    nr < 0
                        || nc < 0
                        || nr >= rows as isize
                        || nc >= cols as isize
                        || !self.get(nr as usize, nc as usize)
                });
                out.data_mut()[(row, col)] = on_edge;
            }
        }

        out
    }
}
