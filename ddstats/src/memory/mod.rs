//! Remote memory access
//!
//! The [`MemoryReader`] trait is the only way the rest of the crate touches
//! the game process. [`ProcReader`] implements it on Linux with `/proc` and
//! `process_vm_readv`; [`ScriptedMemory`] is an in-memory stand-in that lets
//! the sampling pipeline run without a game.

pub mod memory_maps;
pub mod proc_reader;
pub mod process_lookup;
pub mod scripted;

pub use proc_reader::ProcReader;
pub use scripted::ScriptedMemory;

use crate::domain::{Address, MemoryError, Pid};

/// Identifies one instance of the target process
///
/// The start time distinguishes a restarted game that happens to reuse
/// the pid of the previous instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: Pid,
    pub start_time: u64,
}

/// Read-only access to another process's memory
pub trait MemoryReader: Send {
    /// Locate the target process; `None` when it is not running
    fn find_target_process(&self, name: &str) -> Option<ProcessHandle>;

    /// Address the game executable is loaded at
    ///
    /// # Errors
    /// Fails if the process mappings cannot be read.
    fn module_base(&self, handle: ProcessHandle) -> Result<Address, MemoryError>;

    /// Fill `buf` from `address`; a partial read is an error
    ///
    /// # Errors
    /// Fails if the range is unmapped or the process is gone.
    fn read_into(
        &self,
        handle: ProcessHandle,
        address: Address,
        buf: &mut [u8],
    ) -> Result<(), MemoryError>;

    /// Whether the process behind `handle` is still running
    fn process_is_alive(&self, handle: ProcessHandle) -> bool;

    /// # Errors
    /// See [`MemoryReader::read_into`].
    fn read_bytes(
        &self,
        handle: ProcessHandle,
        address: Address,
        len: usize,
    ) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        self.read_into(handle, address, &mut buf)?;
        Ok(buf)
    }

    /// Read a pointer-sized (64-bit little-endian) value
    ///
    /// # Errors
    /// See [`MemoryReader::read_into`].
    fn read_pointer(&self, handle: ProcessHandle, address: Address) -> Result<Address, MemoryError> {
        let mut buf = [0u8; 8];
        self.read_into(handle, address, &mut buf)?;
        Ok(Address(u64::from_le_bytes(buf)))
    }
}
