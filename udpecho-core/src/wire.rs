//! Wire format: raw datagram payloads, no header, no length prefix, no framing.

/// Maximum payload carried in one datagram. The responder's receive buffer is
/// this large; longer inbound datagrams truncate per UDP semantics.
pub const MAX_PAYLOAD: usize = 1024;

/// Clamp an outbound payload to `MAX_PAYLOAD` bytes. Truncation is the
/// sending adapter's responsibility; returns the clamped slice and whether
/// anything was cut off.
pub fn clamp_payload(bytes: &[u8]) -> (&[u8], bool) {
    if bytes.len() > MAX_PAYLOAD {
        (&bytes[..MAX_PAYLOAD], true)
    } else {
        (bytes, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_payload_untouched() {
        let (out, truncated) = clamp_payload(b"hello");
        assert_eq!(out, b"hello");
        assert!(!truncated);
    }

    #[test]
    fn exact_limit_untouched() {
        let payload = vec![0x55u8; MAX_PAYLOAD];
        let (out, truncated) = clamp_payload(&payload);
        assert_eq!(out.len(), MAX_PAYLOAD);
        assert!(!truncated);
    }

    #[test]
    fn oversized_payload_clamped() {
        let payload = vec![0xAAu8; MAX_PAYLOAD + 100];
        let (out, truncated) = clamp_payload(&payload);
        assert_eq!(out.len(), MAX_PAYLOAD);
        assert!(truncated);
    }
}
