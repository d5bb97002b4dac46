//! Logging helpers built on `tracing`.
//!
//! Nothing here installs a subscriber; enable output with whatever
//! subscriber the host application uses, e.g. `RUST_LOG=trwire=trace`.

use crate::packets::Packet;
use crate::protocol::Side;
use std::fmt::Write as _;
use tracing::{debug, enabled, trace, warn, Level};

/// Dumps a packet as pretty JSON at trace level.
pub fn log_packet(label: &str, packet: &Packet) {
    if !enabled!(Level::TRACE) {
        return;
    }

    match serde_json::to_string_pretty(packet) {
        Ok(json) => trace!(label, packet = %packet.summary(), "\n{json}"),
        Err(e) => warn!(label, error = %e, "failed to serialize packet to JSON"),
    }
}

pub fn trace_encode(packet: &Packet, side: Side, frame_len: usize) {
    trace!(
        packet = %packet.summary(),
        side = side.name(),
        size = %format_bytes(frame_len),
        "encoded frame"
    );
}

pub fn trace_decode(packet: &Packet, side: Side, frame_len: usize) {
    trace!(
        packet = %packet.summary(),
        side = side.name(),
        size = %format_bytes(frame_len),
        "decoded frame"
    );
}

/// Logs the outcome of a DEFLATE attempt on a section body.
pub fn trace_compression(original_size: usize, compressed_size: usize) {
    let ratio = if compressed_size > 0 {
        original_size as f64 / compressed_size as f64
    } else {
        0.0
    };

    debug!(
        original = original_size,
        compressed = compressed_size,
        "section body deflate: {} -> {} ({:.2}x)",
        format_bytes(original_size),
        format_bytes(compressed_size),
        ratio
    );
}

/// Format bytes in human-readable format (KB, MB, etc.)
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Space-separated hex of the first `max` bytes, with an ellipsis when cut.
pub fn hex_preview(bytes: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(bytes.len().min(max) * 3 + 4);
    for (i, byte) in bytes.iter().take(max).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    if bytes.len() > max {
        out.push_str(" ...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::PlayerTeam;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_hex_preview() {
        assert_eq!(hex_preview(&[9, 0, 53], 8), "09 00 35");
        assert_eq!(hex_preview(&[1, 2, 3, 4], 2), "01 02 ...");
        assert_eq!(hex_preview(&[], 4), "");
    }

    #[test]
    fn test_helpers_without_subscriber() {
        // no subscriber installed: must be no-ops
        let packet: Packet = PlayerTeam::new(1, 2).into();
        log_packet("test", &packet);
        trace_encode(&packet, Side::Client, 5);
        trace_decode(&packet, Side::Server, 5);
        trace_compression(100, 0);
    }
}
