use std::path::Path;

use sysinfo::{get_current_pid, Signal, System};

/// Terminates stale tracking hosts. The browser normally owns the host's
/// lifetime, this is for hosts whose browser is already gone.
pub fn kill_stale_hosts(daemon_path: &Path) -> usize {
    let system = System::new_all();
    let current_id = get_current_pid().unwrap();
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| daemon_path == *v)
            .is_some()
        {
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    killed
}
