//! Process probing utilities for PID checking and verification.

/// Check if a process with the given PID exists.
///
/// Uses `libc::kill(pid, 0)` which sends a null signal to check existence.
///
/// # Returns
/// * `true` - Process exists
/// * `false` - Process does not exist or permission denied
pub fn is_process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

/// Ask a process to exit with SIGTERM.
///
/// # Returns
/// * `true` - Signal delivered or process already gone
/// * `false` - Failed to signal (permission denied)
pub fn terminate_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 || !is_process_alive(pid) }
}

/// Verify that a PID belongs to a service process carrying the given
/// command-line marker (the attach token embedded in the launch command).
///
/// This prevents PID reuse: a recycled PID will not carry the marker.
///
/// # Implementation
/// * **Linux**: Read `/proc/{pid}/cmdline` and check for the marker
/// * Other platforms fall back to a bare existence check
pub fn is_same_process(pid: u32, marker: &str) -> bool {
    #[cfg(target_os = "linux")]
    {
        is_same_process_linux(pid, marker)
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = marker;
        is_process_alive(pid)
    }
}

#[cfg(target_os = "linux")]
fn is_same_process_linux(pid: u32, marker: &str) -> bool {
    use std::fs;

    let cmdline_path = format!("/proc/{}/cmdline", pid);

    match fs::read_to_string(&cmdline_path) {
        // cmdline is null-separated; a plain substring check is enough for
        // an opaque token marker
        Ok(cmdline) => cmdline.contains(marker),
        Err(_) => false, // Process doesn't exist or no permission
    }
}
