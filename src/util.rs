use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Check whether an optional cancellation flag has been raised.
#[must_use]
pub fn cancel_requested(cancel: &Option<Arc<AtomicBool>>) -> bool {
    cancel
        .as_ref()
        .map(|flag| flag.load(Ordering::SeqCst))
        .unwrap_or(false)
}

/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Compute download progress as a fraction in `[0, 1]`.
///
/// An unknown total reports 0.0 until the transfer finishes; the caller
/// emits the final 1.0 itself once the stream is drained.
#[must_use]
pub fn progress_fraction(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => ((downloaded as f64 / total as f64) as f32).min(1.0),
        _ => 0.0,
    }
}
