//! Batches of blocks.

use crate::block::Block;

/// A batch: an ordered list of blocks sharing one position count. Position `p`
/// of every block describes the same logical row.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    blocks: Vec<Block>,
    position_count: usize,
}

impl Page {
    /// # Panics
    ///
    /// Panics if `blocks` is empty or the blocks disagree on position count.
    pub fn new(blocks: Vec<Block>) -> Page {
        assert!(!blocks.is_empty(), "a page needs at least one block");
        let position_count = blocks[0].position_count();
        Self::with_position_count(position_count, blocks)
    }

    /// Creates a page with an explicit position count, allowing zero blocks.
    pub fn with_position_count(position_count: usize, blocks: Vec<Block>) -> Page {
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(
                block.position_count(),
                position_count,
                "block {i} has a different position count"
            );
        }
        Page {
            blocks,
            position_count,
        }
    }

    #[inline]
    pub fn position_count(&self) -> usize {
        self.position_count
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Returns a new page with `blocks` appended after the existing ones.
    pub fn append_blocks(&self, blocks: impl IntoIterator<Item = Block>) -> Page {
        let mut all = self.blocks.clone();
        all.extend(blocks);
        Self::with_position_count(self.position_count, all)
    }

    /// Builds a page of the selected positions of every block.
    pub fn filter(&self, positions: &[usize]) -> Page {
        Page::with_position_count(
            positions.len(),
            self.blocks.iter().map(|b| b.filter(positions)).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_type::ElementType;

    #[test]
    fn test_append_blocks() {
        let page = Page::new(vec![Block::from_ints(vec![1, 2])]);
        let page = page.append_blocks([Block::constant_nulls(ElementType::Long, 2)]);
        assert_eq!(page.block_count(), 2);
        assert_eq!(page.position_count(), 2);
        assert!(page.block(1).are_all_values_null());
    }

    #[test]
    fn test_empty_page() {
        let page = Page::with_position_count(0, vec![Block::empty(ElementType::Doc)]);
        assert_eq!(page.position_count(), 0);
        let page = page.append_blocks([Block::empty(ElementType::Long)]);
        assert_eq!(page.block_count(), 2);
    }

    #[test]
    #[should_panic]
    fn test_mismatched_positions() {
        Page::new(vec![Block::from_ints(vec![1]), Block::from_ints(vec![1, 2])]);
    }

    #[test]
    fn test_filter() {
        let page = Page::new(vec![
            Block::from_ints(vec![1, 2, 3]),
            Block::from_bytes(["a", "b", "c"]),
        ]);
        let filtered = page.filter(&[2, 0]);
        assert_eq!(filtered.block(0), &Block::from_ints(vec![3, 1]));
        assert_eq!(filtered.block(1), &Block::from_bytes(["c", "a"]));
    }
}
