use std::{
    thread,
    time::{Duration, Instant},
};

/// Polls `condition` until it holds or `timeout` expires
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Lets other threads run for a while, for asserting that something did not happen
pub fn settle() {
    thread::sleep(Duration::from_millis(50));
}
