//! Module base resolution from `/proc/<pid>/maps`
//!
//! The pointer chain to the stats block is expressed relative to where the
//! game executable is mapped, so the lowest mapping of the executable is
//! taken as its base address.

use log::info;
use std::fs;
use std::path::Path;

use crate::domain::{Address, MemoryError, Pid};

/// Memory range of a loaded binary in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

/// Resolve the base address of `binary_path` inside process `pid`.
///
/// # Errors
/// Returns an error if `/proc/<pid>/maps` cannot be read or the binary is not mapped.
pub fn module_base(pid: Pid, binary_path: &Path) -> Result<Address, MemoryError> {
    let maps = fs::read_to_string(format!("/proc/{}/maps", pid.0))
        .map_err(|e| MemoryError::MapsUnavailable(pid, e))?;

    let range = parse_module_range(&maps, &binary_path.to_string_lossy())
        .ok_or(MemoryError::ModuleNotFound(pid))?;

    info!(
        "Module mapped at 0x{:x} - 0x{:x} (size: {} KB)",
        range.start,
        range.end,
        (range.end - range.start) / 1024
    );
    Ok(Address(range.start))
}

/// Find the full range covered by every mapping of `binary_path`.
///
/// Each line reads "start-end perms offset dev inode pathname".
pub fn parse_module_range(maps: &str, binary_path: &str) -> Option<MemoryRange> {
    let mut range: Option<MemoryRange> = None;

    for line in maps.lines() {
        let mut parts = line.split_whitespace();
        let Some(span) = parts.next() else {
            continue;
        };
        // Pathname is the sixth column; match it exactly
        if parts.nth(4) != Some(binary_path) {
            continue;
        }
        let Some((start, end)) = span.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16))
        else {
            continue;
        };

        range = Some(match range {
            Some(r) => MemoryRange { start: r.start.min(start), end: r.end.max(end) },
            None => MemoryRange { start, end },
        });
    }

    range
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
00400000-00452000 r--p 00000000 08:02 173521      /opt/dd/devildaggers
00452000-00650000 r-xp 00052000 08:02 173521      /opt/dd/devildaggers
00650000-00700000 rw-p 00250000 08:02 173521      /opt/dd/devildaggers
01a3c000-01c5e000 rw-p 00000000 00:00 0           [heap]
7f2c1c000000-7f2c1c021000 rw-p 00000000 00:00 0
7f2c20000000-7f2c20100000 r-xp 00000000 08:02 99      /opt/dd/devildaggers-helper.so";

    #[test]
    fn test_parse_module_range() {
        let range = parse_module_range(MAPS, "/opt/dd/devildaggers").unwrap();
        assert_eq!(range, MemoryRange { start: 0x0040_0000, end: 0x0070_0000 });
    }

    #[test]
    fn test_parse_module_range_requires_exact_path() {
        // The helper library shares a prefix but is a different file
        let range = parse_module_range(MAPS, "/opt/dd/devildaggers-helper.so").unwrap();
        assert_eq!(range.start, 0x7f2c_2000_0000);
        assert!(parse_module_range(MAPS, "/opt/dd/missing").is_none());
    }

    #[test]
    fn test_module_base_self() {
        // Our own executable is always mapped
        let pid = Pid(i32::try_from(std::process::id()).unwrap());
        let exe = std::env::current_exe().unwrap();
        let _result = module_base(pid, &exe);
        // Not asserted: sandboxes may hide /proc/self/maps
    }
}
