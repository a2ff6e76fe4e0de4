use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Spawn `command` as a shell line inside `cwd`, in a fresh session/process
/// group so the whole tree can be reaped with one signal.
pub fn spawn_in_process_group(command: &str, cwd: &Path) -> std::io::Result<Child> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // SAFETY: setsid() is async-signal-safe and runs before exec in the
    // forked child, before any other code executes there.
    #[cfg(unix)]
    unsafe {
        use std::os::unix::process::CommandExt;
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    cmd.spawn()
}

/// `SIGKILL` the entire process group rooted at `child`'s pid. Falls back
/// to killing just the child if the pid is unavailable (already reaped).
pub fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: kill() is async-signal-safe; a negative pid targets
            // the whole process group created by setsid() above.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
            return;
        }
    }
    let _ = child.start_kill();
}
