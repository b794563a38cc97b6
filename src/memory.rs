//! Scratch memory for plugins: the Buffer and Handle suites.
//!
//! Both suites hand out handles to host-owned byte blocks. Allocation is
//! fallible throughout: a request that cannot be met reports failure and
//! leaves nothing registered.
//!
//! The buffer suite works against a memory budget (see
//! [`HostConfig::available_space`](crate::config::HostConfig)), which is also
//! the coarse free-memory figure it reports back to the plugin.

use crate::error::{Result, SuiteError};
use crate::handle::{Handle, HandleRegistry};

/// Allocate `size` zeroed bytes without aborting on failure.
fn try_zeroed(size: usize) -> Option<Vec<u8>> {
    let mut block = Vec::new();
    block.try_reserve_exact(size).ok()?;
    block.resize(size, 0);
    Some(block)
}

// ============================================================================
// Buffer suite
// ============================================================================

/// Host side of the buffer suite for one session.
#[derive(Debug)]
pub struct BufferSuite {
    buffers: HandleRegistry<Vec<u8>>,
    /// Budget the suite may hand out in total.
    available_space: u64,
    in_use: u64,
}

impl BufferSuite {
    /// Create a suite that will hand out at most `available_space` bytes.
    pub fn new(available_space: u64) -> Self {
        Self {
            buffers: HandleRegistry::new("buffer"),
            available_space,
            in_use: 0,
        }
    }

    /// Best-effort allocation.
    ///
    /// Tries `*requested` bytes, halving on failure while the request stays at
    /// or above `minimum`, then tries exactly `minimum`. The granted size is
    /// written back to `requested`. Returns the null handle, with
    /// `*requested` set to zero, only when even `minimum` cannot be met.
    pub fn new_buffer(&mut self, requested: &mut usize, minimum: usize) -> Handle {
        let mut size = *requested;
        while size >= minimum && size > 0 {
            if let Some(handle) = self.try_register(size) {
                *requested = size;
                return handle;
            }
            size /= 2;
        }
        if let Some(handle) = self.try_register(minimum) {
            *requested = minimum;
            return handle;
        }
        tracing::warn!(requested = *requested, minimum, "buffer allocation failed");
        *requested = 0;
        Handle::NULL
    }

    /// Free a buffer and null the caller's handle.
    pub fn dispose(&mut self, buffer: &mut Handle) -> Result<()> {
        let block = self.buffers.remove(*buffer)?;
        self.in_use -= block.len() as u64;
        *buffer = Handle::NULL;
        Ok(())
    }

    /// Size of a live buffer.
    pub fn get_size(&self, buffer: Handle) -> Result<usize> {
        Ok(self.buffers.get(buffer)?.len())
    }

    /// Coarse estimate of memory still available to plugins.
    pub fn get_space(&self) -> u64 {
        self.available_space.saturating_sub(self.in_use)
    }

    /// Mutable view of a live buffer.
    pub fn data_mut(&mut self, buffer: Handle) -> Result<&mut [u8]> {
        Ok(self.buffers.get_mut(buffer)?.as_mut_slice())
    }

    /// Number of live buffers.
    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    fn try_register(&mut self, size: usize) -> Option<Handle> {
        let size_u64 = size as u64;
        if self.in_use.checked_add(size_u64)? > self.available_space {
            return None;
        }
        let block = try_zeroed(size)?;
        let handle = self.buffers.allocate(block).ok()?;
        self.in_use += size_u64;
        tracing::debug!(size, ?handle, "buffer allocated");
        Some(handle)
    }
}

// ============================================================================
// Handle suite
// ============================================================================

#[derive(Debug)]
struct MemoryBlock {
    data: Vec<u8>,
    locked: bool,
}

/// Host side of the movable-memory handle suite for one session.
#[derive(Debug)]
pub struct HandleSuite {
    blocks: HandleRegistry<MemoryBlock>,
}

impl Default for HandleSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self {
            blocks: HandleRegistry::new("memory-handle"),
        }
    }

    /// Allocate a zeroed block of `size` bytes.
    pub fn new_handle(&mut self, size: usize) -> Result<Handle> {
        let data = try_zeroed(size).ok_or(SuiteError::OutOfMemory)?;
        self.blocks.allocate(MemoryBlock {
            data,
            locked: false,
        })
    }

    /// Free a block.
    pub fn dispose(&mut self, handle: Handle) -> Result<()> {
        self.blocks.remove(handle).map(drop)
    }

    pub fn get_size(&self, handle: Handle) -> Result<usize> {
        Ok(self.blocks.get(handle)?.data.len())
    }

    /// Resize a block, zero-filling growth. Locked blocks cannot move.
    pub fn set_size(&mut self, handle: Handle, size: usize) -> Result<()> {
        let block = self.blocks.get_mut(handle)?;
        if block.locked {
            return Err(SuiteError::BadParameter("handle is locked"));
        }
        if size > block.data.len() {
            block
                .data
                .try_reserve_exact(size - block.data.len())
                .map_err(|_| SuiteError::OutOfMemory)?;
        }
        block.data.resize(size, 0);
        Ok(())
    }

    /// Pin a block and return its address.
    pub fn lock(&mut self, handle: Handle) -> Result<*mut u8> {
        let block = self.blocks.get_mut(handle)?;
        block.locked = true;
        Ok(block.data.as_mut_ptr())
    }

    pub fn unlock(&mut self, handle: Handle) -> Result<()> {
        self.blocks.get_mut(handle)?.locked = false;
        Ok(())
    }

    /// Contents of a block.
    pub fn data(&self, handle: Handle) -> Result<&[u8]> {
        Ok(&self.blocks.get(handle)?.data)
    }

    pub fn data_mut(&mut self, handle: Handle) -> Result<&mut [u8]> {
        Ok(&mut self.blocks.get_mut(handle)?.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    const GB: usize = 1024 * MB;

    #[test]
    fn test_new_buffer_halves_to_fit() {
        let mut suite = BufferSuite::new(16 * MB as u64);
        let mut requested = GB;
        let handle = suite.new_buffer(&mut requested, 4 * KB);
        assert!(!handle.is_null());
        assert_eq!(requested, 16 * MB);
        assert_eq!(suite.get_size(handle).unwrap(), requested);
        assert_eq!(suite.get_space(), 0);
    }

    #[test]
    fn test_new_buffer_falls_back_to_minimum() {
        let mut suite = BufferSuite::new(5000);
        // 6000 -> 3000 is below the 4000 minimum, so the minimum itself is tried.
        let mut requested = 6000;
        let handle = suite.new_buffer(&mut requested, 4000);
        assert!(!handle.is_null());
        assert_eq!(requested, 4000);
    }

    #[test]
    fn test_new_buffer_null_when_minimum_fails() {
        let mut suite = BufferSuite::new(1000);
        let mut requested = 8000;
        let handle = suite.new_buffer(&mut requested, 2000);
        assert!(handle.is_null());
        assert_eq!(requested, 0);
        assert_eq!(suite.live_count(), 0);
    }

    #[test]
    fn test_dispose_nulls_handle_and_returns_space() {
        let mut suite = BufferSuite::new(MB as u64);
        let mut requested = 4 * KB;
        let mut handle = suite.new_buffer(&mut requested, KB);
        assert_eq!(suite.get_space(), (MB - 4 * KB) as u64);
        suite.dispose(&mut handle).unwrap();
        assert!(handle.is_null());
        assert_eq!(suite.get_space(), MB as u64);
        assert!(suite.dispose(&mut handle).is_err());
    }

    #[test]
    fn test_buffer_is_writable() {
        let mut suite = BufferSuite::new(MB as u64);
        let mut requested = 16;
        let handle = suite.new_buffer(&mut requested, 16);
        suite.data_mut(handle).unwrap()[15] = 0xab;
        assert_eq!(suite.data_mut(handle).unwrap()[15], 0xab);
    }

    #[test]
    fn test_handle_set_size() {
        let mut suite = HandleSuite::new();
        let handle = suite.new_handle(4).unwrap();
        suite.set_size(handle, 8).unwrap();
        assert_eq!(suite.get_size(handle).unwrap(), 8);
        assert_eq!(suite.data(handle).unwrap(), &[0; 8]);

        suite.lock(handle).unwrap();
        assert!(suite.set_size(handle, 2).is_err());
        suite.unlock(handle).unwrap();
        suite.set_size(handle, 2).unwrap();
        assert_eq!(suite.get_size(handle).unwrap(), 2);

        suite.dispose(handle).unwrap();
        assert!(suite.get_size(handle).is_err());
    }
}
