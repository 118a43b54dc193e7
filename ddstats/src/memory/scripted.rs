//! In-memory stand-in for a game process
//!
//! Clones share state, so a test can keep one handle to stage blocks and
//! kill/restart the "process" while the supervisor owns another.

use ddstats_common::{BLOCK_MARKER, POINTER_CHAIN};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{MemoryReader, ProcessHandle};
use crate::decode::{encode_block, encode_frames, StatFrame, StatsBlock};
use crate::domain::{Address, MemoryError, Pid};

/// Where the scripted game executable is "loaded"
pub const MODULE_BASE: Address = Address(0x0040_0000);
/// Target of the first pointer in the chain (the block marker)
pub const MARKER_ADDRESS: Address = Address(0x0100_0000);
/// Where staged frame arrays are written
pub const FRAMES_ADDRESS: Address = Address(0x0200_0000);

#[derive(Debug, Default)]
struct Inner {
    process: Option<(String, ProcessHandle)>,
    alive: bool,
    regions: BTreeMap<u64, Vec<u8>>,
    failing_reads: usize,
    reads: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedMemory {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedMemory {
    /// A running game named `name` with the pointer chain and marker in place
    #[must_use]
    pub fn with_game(name: &str, pid: i32) -> Self {
        let mem = Self::default();
        mem.spawn(name, pid, 1);
        mem.write_pointer(MODULE_BASE.offset(POINTER_CHAIN.base_offset), MARKER_ADDRESS);
        let mut marker = BLOCK_MARKER.to_vec();
        marker.resize(usize::try_from(POINTER_CHAIN.data_offset).unwrap_or(12), 0);
        mem.write(MARKER_ADDRESS, &marker);
        mem
    }

    /// Address the supervisor should resolve the block to
    #[must_use]
    pub fn block_address() -> Address {
        MARKER_ADDRESS.offset(POINTER_CHAIN.data_offset)
    }

    /// Start (or restart) the process; a new `start_time` means a new instance
    pub fn spawn(&self, name: &str, pid: i32, start_time: u64) {
        let mut inner = self.lock();
        inner.process =
            Some((name.to_string(), ProcessHandle { pid: Pid(pid), start_time }));
        inner.alive = true;
    }

    pub fn kill(&self) {
        let mut inner = self.lock();
        inner.alive = false;
        inner.process = None;
    }

    pub fn write(&self, address: Address, bytes: &[u8]) {
        self.lock().regions.insert(address.0, bytes.to_vec());
    }

    pub fn write_pointer(&self, address: Address, target: Address) {
        self.write(address, &target.0.to_le_bytes());
    }

    /// Stage a block and its frame array
    ///
    /// The block's frame address is pointed at the staged frames; the frame
    /// count is left as the caller set it.
    pub fn stage(&self, block: &StatsBlock, frames: &[StatFrame]) {
        let mut block = block.clone();
        block.frames_address = FRAMES_ADDRESS;
        self.write(Self::block_address(), &encode_block(&block));
        self.write(FRAMES_ADDRESS, &encode_frames(frames));
    }

    /// Make the next `n` reads fail
    pub fn fail_next_reads(&self, n: usize) {
        self.lock().failing_reads = n;
    }

    /// Total read calls served, failed ones included
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryReader for ScriptedMemory {
    fn find_target_process(&self, name: &str) -> Option<ProcessHandle> {
        let inner = self.lock();
        match &inner.process {
            Some((n, handle)) if n == name && inner.alive => Some(*handle),
            _ => None,
        }
    }

    fn module_base(&self, handle: ProcessHandle) -> Result<Address, MemoryError> {
        if self.process_is_alive(handle) {
            Ok(MODULE_BASE)
        } else {
            Err(MemoryError::ProcessGone(handle.pid))
        }
    }

    fn read_into(
        &self,
        handle: ProcessHandle,
        address: Address,
        buf: &mut [u8],
    ) -> Result<(), MemoryError> {
        let mut inner = self.lock();
        inner.reads += 1;

        let gone = !matches!(&inner.process, Some((_, h)) if *h == handle && inner.alive);
        if gone {
            return Err(MemoryError::ProcessGone(handle.pid));
        }
        if inner.failing_reads > 0 {
            inner.failing_reads -= 1;
            return Err(unmapped(address, buf.len()));
        }

        let (&start, region) =
            inner.regions.range(..=address.0).next_back().ok_or_else(|| unmapped(address, buf.len()))?;
        let offset = usize::try_from(address.0 - start).map_err(|_| unmapped(address, buf.len()))?;
        let src = region
            .get(offset..offset + buf.len())
            .ok_or_else(|| unmapped(address, buf.len()))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn process_is_alive(&self, handle: ProcessHandle) -> bool {
        let inner = self.lock();
        inner.alive && matches!(&inner.process, Some((_, h)) if *h == handle)
    }
}

fn unmapped(address: Address, len: usize) -> MemoryError {
    MemoryError::ReadFailed {
        address,
        len,
        source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
    }
}
