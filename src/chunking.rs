use crate::error::{RasterError, Result};
use log::debug;

/// Rectangular window of the pixel grid. Edge blocks are clipped, never padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub xoff: usize,
    pub yoff: usize,
    pub xsize: usize,
    pub ysize: usize,
}

impl Block {
    pub fn new(xoff: usize, yoff: usize, xsize: usize, ysize: usize) -> Self {
        Self {
            xoff,
            yoff,
            xsize,
            ysize,
        }
    }

    /// Single pixel window.
    pub fn pixel(col: usize, row: usize) -> Self {
        Self::new(col, row, 1, 1)
    }

    pub fn pixel_count(&self) -> usize {
        self.xsize * self.ysize
    }

    /// ndarray shape of the block: (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.ysize, self.xsize)
    }

    pub fn x_end(&self) -> usize {
        self.xoff + self.xsize
    }

    pub fn y_end(&self) -> usize {
        self.yoff + self.ysize
    }

    pub fn fits_within(&self, cols: usize, rows: usize) -> bool {
        self.x_end() <= cols && self.y_end() <= rows
    }
}

/// Partition of a `cols x rows` grid into blocks of `block_width x block_height`.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    cols: usize,
    rows: usize,
    block_width: usize,
    block_height: usize,
    pub num_blocks_x: usize,
    pub num_blocks_y: usize,
    pub total_blocks: usize,
}

impl BlockGrid {
    pub fn new(cols: usize, rows: usize, block_size: (usize, usize)) -> Result<Self> {
        let (block_width, block_height) = block_size;
        if block_width == 0 || block_height == 0 {
            return Err(RasterError::InvalidBlockSize(block_width, block_height));
        }

        let num_blocks_x = cols.div_ceil(block_width);
        let num_blocks_y = rows.div_ceil(block_height);
        let total_blocks = num_blocks_x * num_blocks_y;

        debug!(
            "BlockGrid: {}x{} raster, block={}x{} → {}x{} blocks ({} total)",
            cols, rows, block_width, block_height, num_blocks_x, num_blocks_y, total_blocks
        );

        Ok(Self {
            cols,
            rows,
            block_width,
            block_height,
            num_blocks_x,
            num_blocks_y,
            total_blocks,
        })
    }

    pub fn block_size(&self) -> (usize, usize) {
        (self.block_width, self.block_height)
    }

    pub fn raster_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Blocks in row-major order: `yoff` outer, `xoff` inner.
    /// Each call starts a fresh pass over the grid.
    pub fn iter(&self) -> BlockIterator<'_> {
        BlockIterator::new(self)
    }

    /// Block at linear index `block_idx`, or `None` past the last block.
    pub fn get_block(&self, block_idx: usize) -> Option<Block> {
        if block_idx >= self.total_blocks {
            return None;
        }

        let block_y = block_idx / self.num_blocks_x;
        let block_x = block_idx % self.num_blocks_x;

        let xoff = block_x * self.block_width;
        let yoff = block_y * self.block_height;
        let xsize = self.block_width.min(self.cols - xoff);
        let ysize = self.block_height.min(self.rows - yoff);

        Some(Block::new(xoff, yoff, xsize, ysize))
    }
}

pub struct BlockIterator<'a> {
    grid: &'a BlockGrid,
    current_idx: usize,
}

impl<'a> BlockIterator<'a> {
    fn new(grid: &'a BlockGrid) -> Self {
        Self {
            grid,
            current_idx: 0,
        }
    }
}

impl<'a> Iterator for BlockIterator<'a> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.grid.get_block(self.current_idx)?;
        self.current_idx += 1;
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.total_blocks - self.current_idx;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for BlockIterator<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_grid_simple() {
        let grid = BlockGrid::new(4000, 4000, (2000, 2000)).unwrap();
        assert_eq!(grid.num_blocks_x, 2);
        assert_eq!(grid.num_blocks_y, 2);
        assert_eq!(grid.total_blocks, 4);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        assert!(matches!(
            BlockGrid::new(10, 10, (0, 4)),
            Err(RasterError::InvalidBlockSize(0, 4))
        ));
    }

    #[test]
    fn test_edge_blocks_clipped() {
        // Scanline-style blocks over a 10x7 raster
        let grid = BlockGrid::new(10, 7, (4, 3)).unwrap();
        let blocks: Vec<_> = grid.iter().collect();
        assert_eq!(blocks.len(), 9);

        assert_eq!(blocks[0], Block::new(0, 0, 4, 3));
        assert_eq!(blocks[2], Block::new(8, 0, 2, 3)); // right edge
        assert_eq!(blocks[6], Block::new(0, 6, 4, 1)); // bottom edge
        assert_eq!(blocks[8], Block::new(8, 6, 2, 1)); // corner
    }

    #[test]
    fn test_row_major_order() {
        let grid = BlockGrid::new(6, 4, (2, 2)).unwrap();
        let offsets: Vec<_> = grid.iter().map(|b| (b.xoff, b.yoff)).collect();
        assert_eq!(
            offsets,
            vec![(0, 0), (2, 0), (4, 0), (0, 2), (2, 2), (4, 2)]
        );
    }

    #[test]
    fn test_full_coverage_no_overlap() {
        for &(cols, rows) in &[(1, 1), (7, 5), (16, 16), (33, 9)] {
            for &(bw, bh) in &[(1, 1), (2, 3), (4, 4), (64, 1), (5, 100)] {
                let grid = BlockGrid::new(cols, rows, (bw, bh)).unwrap();
                let mut visits = vec![0u32; cols * rows];
                for block in grid.iter() {
                    assert!(block.fits_within(cols, rows));
                    assert!(block.xsize <= bw && block.ysize <= bh);
                    for row in block.yoff..block.y_end() {
                        for col in block.xoff..block.x_end() {
                            visits[row * cols + col] += 1;
                        }
                    }
                }
                assert!(
                    visits.iter().all(|&v| v == 1),
                    "{}x{} with block {}x{}",
                    cols,
                    rows,
                    bw,
                    bh
                );
            }
        }
    }

    #[test]
    fn test_iterator_is_restartable() {
        let grid = BlockGrid::new(5, 5, (2, 2)).unwrap();
        let first: Vec<_> = grid.iter().collect();
        let second: Vec<_> = grid.iter().collect();
        assert_eq!(first, second);
        assert_eq!(grid.iter().len(), 9);
    }

    #[test]
    fn test_empty_raster_has_no_blocks() {
        let grid = BlockGrid::new(0, 10, (4, 4)).unwrap();
        assert_eq!(grid.total_blocks, 0);
        assert_eq!(grid.iter().count(), 0);
    }

    #[test]
    fn test_get_block_out_of_range() {
        let grid = BlockGrid::new(5, 3, (2, 2)).unwrap();
        assert_eq!(grid.total_blocks, 6);
        assert_eq!(grid.get_block(5), Some(Block::new(4, 2, 1, 1)));
        assert_eq!(grid.get_block(6), None);
        assert_eq!(grid.get_block(usize::MAX), None);
    }
}
