//! Counter payload formatting

use std::fmt::Write;

/// Render one counter value into `buf`: its base-10 digits, no leading
/// zeros, followed by a single newline. The buffer is reused across the
/// transmission loop so the hot path stays allocation-free.
pub fn render(buf: &mut String, value: u64) {
    buf.clear();
    // Writing into a String cannot fail.
    let _ = writeln!(buf, "{}", value);
}
