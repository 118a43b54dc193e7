//! One sampling tick: supervisor, decoder and session machine together
//!
//! This is the only place memory is read from, so reads are serialized by
//! construction.

use log::debug;

use crate::connection::{ConnectionState, Sample, Supervisor};
use crate::decode::StatFrame;
use crate::memory::MemoryReader;
use crate::session::{SessionEvent, SessionMachine, SessionSnapshot};

/// Everything one tick produced
#[derive(Debug, Clone)]
pub struct Tick {
    pub session: SessionSnapshot,
    pub connection: ConnectionState,
    pub event: Option<SessionEvent>,
}

pub struct Sampler<R: MemoryReader> {
    supervisor: Supervisor<R>,
    machine: SessionMachine,
}

impl<R: MemoryReader> Sampler<R> {
    pub fn new(reader: R, process_name: impl Into<String>) -> Self {
        Self { supervisor: Supervisor::new(reader, process_name), machine: SessionMachine::new() }
    }

    pub fn tick(&mut self) -> Tick {
        let (block, event) = match self.supervisor.poll() {
            Sample::Block(block) => {
                let frames: Option<&[StatFrame]> = if self.machine.needs_frames(&block) {
                    match block.frame_count() {
                        Ok(count) => self.supervisor.read_frames(block.frames_address, count),
                        Err(e) => {
                            debug!("Skipping frame read: {e}");
                            None
                        }
                    }
                } else {
                    Some(&[])
                };
                let event = self.machine.observe(&block, frames);
                (Some(block), event)
            }
            Sample::ReadFailed | Sample::Disconnected => {
                self.machine.no_update();
                (None, None)
            }
        };

        Tick {
            session: self.machine.snapshot(block.as_ref()),
            connection: self.supervisor.state().clone(),
            event,
        }
    }

    /// Release the process handle
    pub fn shutdown(&mut self) {
        self.supervisor.disconnect();
    }

    #[must_use]
    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }
}
