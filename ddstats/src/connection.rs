//! Connection supervisor
//!
//! Owns the link to the game process: find it, walk the pointer chain to the
//! stats block, verify the marker, then read and decode the block once per
//! tick. Losing the process drops back to `Disconnected`; the next tick tries
//! again. Nothing here is fatal.

use ddstats_common::{PointerChain, BLOCK_MARKER, BLOCK_SIZE, POINTER_CHAIN};
use log::{debug, info};

use crate::decode::{decode_block, frames_len, FrameBuffer, StatFrame, StatsBlock};
use crate::domain::{Address, ConnectError, Pid};
use crate::memory::{MemoryReader, ProcessHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Published view of the link; only the supervisor writes it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub link: LinkState,
    pub pid: Option<Pid>,
    pub base_address: Option<Address>,
    pub block_address: Option<Address>,
    pub last_read_ok: bool,
}

impl ConnectionState {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }
}

/// Outcome of one sampling tick
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// No process, or the pointer chain could not be resolved
    Disconnected,
    /// Connected, but this tick's read or decode failed
    ReadFailed,
    Block(StatsBlock),
}

pub struct Supervisor<R: MemoryReader> {
    reader: R,
    process_name: String,
    chain: PointerChain,
    handle: Option<ProcessHandle>,
    state: ConnectionState,
    block_buf: Vec<u8>,
    frame_bytes: Vec<u8>,
    frames: FrameBuffer,
}

impl<R: MemoryReader> Supervisor<R> {
    pub fn new(reader: R, process_name: impl Into<String>) -> Self {
        Self {
            reader,
            process_name: process_name.into(),
            chain: POINTER_CHAIN,
            handle: None,
            state: ConnectionState::default(),
            block_buf: vec![0u8; BLOCK_SIZE],
            frame_bytes: Vec::new(),
            frames: FrameBuffer::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Try to attach to the game
    ///
    /// Returns `false` when the process is not running or the block could
    /// not be located; both are expected and only logged.
    pub fn connect(&mut self) -> bool {
        let Some(handle) = self.reader.find_target_process(&self.process_name) else {
            return false;
        };

        self.state = ConnectionState {
            link: LinkState::Connecting,
            pid: Some(handle.pid),
            ..ConnectionState::default()
        };

        match self.resolve(handle) {
            Ok((base, block)) => {
                info!("Attached to {} {}, stats block at {block}", self.process_name, handle.pid);
                self.handle = Some(handle);
                self.state.link = LinkState::Connected;
                self.state.base_address = Some(base);
                self.state.block_address = Some(block);
                true
            }
            Err(e) => {
                debug!("Connect to {} failed: {e}", handle.pid);
                self.disconnect();
                false
            }
        }
    }

    /// Whether the attached process is still running
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.handle.is_some_and(|h| self.reader.process_is_alive(h))
    }

    /// Release the handle and forget resolved addresses
    pub fn disconnect(&mut self) {
        self.handle = None;
        self.state = ConnectionState::default();
        self.frames.clear();
    }

    /// One sampling tick: connect if needed, check liveness, read the block
    pub fn poll(&mut self) -> Sample {
        if self.handle.is_none() && !self.connect() {
            return Sample::Disconnected;
        }
        if !self.is_alive() {
            info!("{} exited", self.process_name);
            self.disconnect();
            return Sample::Disconnected;
        }

        let (Some(handle), Some(address)) = (self.handle, self.state.block_address) else {
            self.disconnect();
            return Sample::Disconnected;
        };

        let decoded = self
            .reader
            .read_into(handle, address, &mut self.block_buf)
            .map_err(|e| e.to_string())
            .and_then(|()| decode_block(&self.block_buf).map_err(|e| e.to_string()));

        match decoded {
            Ok(block) => {
                self.state.last_read_ok = true;
                Sample::Block(block)
            }
            Err(e) => {
                debug!("Block read failed: {e}");
                self.state.last_read_ok = false;
                Sample::ReadFailed
            }
        }
    }

    /// Read `count` frames starting at `address` into the reusable buffer
    ///
    /// A count of zero clears the buffer without reading. On failure `None`
    /// is returned and the previous frames stay in place.
    pub fn read_frames(&mut self, address: Address, count: usize) -> Option<&[StatFrame]> {
        if count == 0 {
            self.frames.clear();
            return Some(self.frames.as_slice());
        }
        let handle = self.handle?;
        let len = match frames_len(count) {
            Ok(len) => len,
            Err(e) => {
                debug!("Frame read of {count} frames refused: {e}");
                return None;
            }
        };

        self.frame_bytes.resize(len, 0);
        if let Err(e) = self.reader.read_into(handle, address, &mut self.frame_bytes) {
            debug!("Frame read of {count} frames failed: {e}");
            return None;
        }
        if let Err(e) = self.frames.fill(&self.frame_bytes, count) {
            debug!("Frame decode failed: {e}");
            return None;
        }
        Some(self.frames.as_slice())
    }

    /// Frames from the last successful [`Supervisor::read_frames`]
    #[must_use]
    pub fn frames(&self) -> &[StatFrame] {
        self.frames.as_slice()
    }

    fn resolve(&self, handle: ProcessHandle) -> Result<(Address, Address), ConnectError> {
        let base = self.reader.module_base(handle).map_err(ConnectError::ModuleBase)?;

        let mut address = base.offset(self.chain.base_offset);
        for (index, hop) in self.chain.hops.iter().enumerate() {
            let target = self
                .reader
                .read_pointer(handle, address)
                .map_err(|source| ConnectError::Hop { index, address, source })?;
            address = target.offset(*hop);
        }

        let marker = self
            .reader
            .read_bytes(handle, address, BLOCK_MARKER.len())
            .map_err(|source| ConnectError::Hop { index: self.chain.hops.len(), address, source })?;
        if marker != BLOCK_MARKER {
            return Err(ConnectError::MarkerMismatch(address));
        }

        Ok((base, address.offset(self.chain.data_offset)))
    }
}
