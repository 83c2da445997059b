//! Page-block arena for the bounded history backend.
//!
//! Grounded on Konsole's `CompactHistoryBlockList`: lines are packed into
//! fixed-size blocks (256 KiB) and bump-allocated within a block; a block
//! is freed once no line still references it. `alloc` returns a `Handle`
//! (block index + offset + length) rather than a raw pointer into the
//! block's storage, so blocks stay safe to move or drop.

pub const BLOCK_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    block: u32,
    offset: u32,
    len: u32,
}

struct Block {
    data: Vec<u8>,
    live: usize,
}

pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn alloc(&mut self, bytes: &[u8]) -> Handle {
        if let Some(last) = self.blocks.last_mut() {
            if last.data.len() + bytes.len() <= BLOCK_SIZE {
                let offset = last.data.len();
                last.data.extend_from_slice(bytes);
                last.live += 1;
                return Handle {
                    block: (self.blocks.len() - 1) as u32,
                    offset: offset as u32,
                    len: bytes.len() as u32,
                };
            }
        }
        let mut data = Vec::with_capacity(bytes.len().max(BLOCK_SIZE));
        data.extend_from_slice(bytes);
        self.blocks.push(Block { data, live: 1 });
        Handle {
            block: (self.blocks.len() - 1) as u32,
            offset: 0,
            len: bytes.len() as u32,
        }
    }

    pub fn read(&self, handle: Handle) -> &[u8] {
        let start = handle.offset as usize;
        let end = start + handle.len as usize;
        &self.blocks[handle.block as usize].data[start..end]
    }

    /// Decrement the owning block's live-line count; a block with no
    /// remaining live lines has its storage reclaimed.
    pub fn release(&mut self, handle: Handle) {
        let block = &mut self.blocks[handle.block as usize];
        block.live = block.live.saturating_sub(1);
        if block.live == 0 {
            block.data.clear();
            block.data.shrink_to_fit();
        }
    }
}

impl Default for BlockArena {
    fn default() -> Self {
        Self::new()
    }
}
