//! Locate the game process by name via `/proc`.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::Pid;

/// Result of process lookup.
#[derive(Debug)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub exe_path: PathBuf,
    pub command: String,
    /// Start time in clock ticks since boot, used to detect pid reuse
    pub start_time: u64,
}

/// Find the target process by name.
///
/// Searches `/proc` for processes whose command name (from
/// `/proc/<pid>/stat`) or executable basename (from `/proc/<pid>/exe`)
/// matches `name`. When several match, the one started first wins.
///
/// Returns `None` when nothing matches; that is the normal state while
/// the game is not running.
pub fn find_process_by_name(name: &str) -> Option<ProcessInfo> {
    let proc_dir = fs::read_dir("/proc").ok()?;
    let mut best: Option<ProcessInfo> = None;

    for entry in proc_dir.flatten() {
        let file_name = entry.file_name();
        let Ok(pid) = file_name.to_string_lossy().parse::<i32>() else {
            continue;
        };

        // Skip kernel threads and inaccessible processes
        let Ok(exe_path) = fs::read_link(format!("/proc/{pid}/exe")) else {
            continue;
        };
        let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
            continue;
        };
        let Some(command) = extract_comm(&stat) else {
            continue;
        };
        if !is_match(&command, &exe_path, name) {
            continue;
        }
        let Some(start_time) = extract_start_time(&stat) else {
            continue;
        };

        debug!("Candidate {name}: pid {pid} ({command})");
        if best.as_ref().map_or(true, |b| start_time < b.start_time) {
            best = Some(ProcessInfo { pid: Pid(pid), exe_path, command, start_time });
        }
    }

    best
}

/// Read the start time of a live process, `None` once it is gone.
pub fn process_start_time(pid: Pid) -> Option<u64> {
    let stat = fs::read_to_string(format!("/proc/{}/stat", pid.0)).ok()?;
    extract_start_time(&stat)
}

/// Resolve binary path from PID via `/proc/<pid>/exe`.
///
/// # Errors
/// Returns error if the process doesn't exist or `/proc/<pid>/exe` is not readable.
pub fn resolve_exe_path(pid: Pid) -> std::io::Result<PathBuf> {
    fs::read_link(format!("/proc/{}/exe", pid.0))
}

/// Extract command name from `/proc/<pid>/stat`.
/// Format: "pid (comm) state ..."
fn extract_comm(stat_line: &str) -> Option<String> {
    let open = stat_line.find('(')?;
    let close = stat_line.rfind(')')?;
    if open >= close {
        return None;
    }
    Some(stat_line[open + 1..close].to_string())
}

/// Extract `starttime` (field 22) from `/proc/<pid>/stat`.
fn extract_start_time(stat_line: &str) -> Option<u64> {
    let close = stat_line.rfind(')')?;
    // Fields after the comm start at field 3 (state)
    stat_line[close + 1..].split_whitespace().nth(19)?.parse().ok()
}

/// Check if the process is the one we are looking for.
///
/// The kernel truncates `comm` to 15 bytes, so a long name matches on its prefix.
fn is_match(command: &str, exe_path: &Path, name: &str) -> bool {
    let exe_basename = exe_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let comm_name = name.get(..15).unwrap_or(name);

    command == comm_name || exe_basename == name
}
