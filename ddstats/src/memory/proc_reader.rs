//! `/proc` + `process_vm_readv` memory reader

#![allow(unsafe_code)] // process_vm_readv requires unsafe

use log::debug;
use std::path::Path;

use super::{memory_maps, process_lookup, MemoryReader, ProcessHandle};
use crate::domain::{Address, MemoryError};

/// Reads the game's memory through the Linux process APIs
///
/// Requires ptrace access to the target (same user with
/// `kernel.yama.ptrace_scope = 0`, or `CAP_SYS_PTRACE`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcReader;

impl MemoryReader for ProcReader {
    fn find_target_process(&self, name: &str) -> Option<ProcessHandle> {
        let info = process_lookup::find_process_by_name(name)?;
        debug!("Found {} at {} ({})", name, info.pid, info.exe_path.display());
        Some(ProcessHandle { pid: info.pid, start_time: info.start_time })
    }

    fn module_base(&self, handle: ProcessHandle) -> Result<Address, MemoryError> {
        let exe = process_lookup::resolve_exe_path(handle.pid)
            .map_err(|_| MemoryError::ProcessGone(handle.pid))?;
        memory_maps::module_base(handle.pid, Path::new(&exe))
    }

    fn read_into(
        &self,
        handle: ProcessHandle,
        address: Address,
        buf: &mut [u8],
    ) -> Result<(), MemoryError> {
        let local = libc::iovec { iov_base: buf.as_mut_ptr().cast(), iov_len: buf.len() };
        let remote = libc::iovec { iov_base: address.0 as *mut libc::c_void, iov_len: buf.len() };

        // SAFETY: `local` covers exactly `buf`, which we hold mutably for the
        // duration of the call. The remote range is validated by the kernel.
        let n = unsafe { libc::process_vm_readv(handle.pid.0, &local, 1, &remote, 1, 0) };

        match usize::try_from(n) {
            Err(_) => Err(MemoryError::ReadFailed {
                address,
                len: buf.len(),
                source: std::io::Error::last_os_error(),
            }),
            Ok(actual) if actual != buf.len() => {
                Err(MemoryError::ShortRead { address, expected: buf.len(), actual })
            }
            Ok(_) => Ok(()),
        }
    }

    fn process_is_alive(&self, handle: ProcessHandle) -> bool {
        process_lookup::process_start_time(handle.pid) == Some(handle.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pid;

    fn own_handle() -> ProcessHandle {
        let pid = Pid(i32::try_from(std::process::id()).unwrap());
        let start_time = process_lookup::process_start_time(pid).unwrap();
        ProcessHandle { pid, start_time }
    }

    #[test]
    fn test_read_own_memory() {
        let secret: [u8; 8] = *b"ddstats!";
        let handle = own_handle();
        let address = Address(secret.as_ptr() as u64);

        // Reading ourselves needs no extra privileges
        let bytes = ProcReader.read_bytes(handle, address, secret.len()).unwrap();
        assert_eq!(bytes, secret);
    }

    #[test]
    fn test_unmapped_read_fails() {
        let result = ProcReader.read_bytes(own_handle(), Address(8), 16);
        assert!(result.is_err());
    }

    #[test]
    fn test_liveness_tracks_start_time() {
        let handle = own_handle();
        assert!(ProcReader.process_is_alive(handle));
        let reused = ProcessHandle { start_time: handle.start_time + 1, ..handle };
        assert!(!ProcReader.process_is_alive(reused));
    }
}
