//! Raw constants for the monitoring-device channel.
//!
//! Zero external dependencies, shared by every platform so the encoding can
//! be tested anywhere.

// ============================================================================
// IOCTL encoding helper (matches the Windows CTL_CODE macro)
// ============================================================================

const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

const PROCMON_DEVICE_TYPE: u32 = 0x9535;
const PROCMON_FUNCTION_DEBUG_OUT: u32 = 0x81;
const METHOD_BUFFERED: u32 = 0;
const FILE_WRITE_ACCESS: u32 = 0x2;

/// Control code accepted by the Process Monitor driver for debug output.
pub const PROCMON_DEBUG_OUT: u32 = ctl_code(
    PROCMON_DEVICE_TYPE,
    PROCMON_FUNCTION_DEBUG_OUT,
    METHOD_BUFFERED,
    FILE_WRITE_ACCESS,
);

/// Device path exposed by the Process Monitor driver while it is running.
pub const PROCMON_DEVICE_PATH: &str = r"\\.\Global\ProcmonDebugLogger";

/// Encodes `message` as a NUL-terminated UTF-16 buffer.
///
/// Returns `None` if the message contains an interior NUL.
#[must_use]
pub fn to_wide(message: &str) -> Option<Vec<u16>> {
    if message.contains('\0') {
        return None;
    }
    Some(message.encode_utf16().chain(std::iter::once(0)).collect())
}

/// Byte length of a wide buffer, terminator included.
#[must_use]
pub const fn wide_byte_len(wide: &[u16]) -> usize {
    wide.len() * size_of::<u16>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_out_ioctl_value() {
        let expected = (0x9535u32 << 16) | (0x2u32 << 14) | (0x81u32 << 2);
        assert_eq!(PROCMON_DEBUG_OUT, expected);
        assert_eq!(PROCMON_DEBUG_OUT, 0x9535_8204);
    }

    #[test]
    fn test_to_wide_terminated() {
        let wide = to_wide("hi").unwrap();
        assert_eq!(wide, vec![u16::from(b'h'), u16::from(b'i'), 0]);
        assert_eq!(wide_byte_len(&wide), 6);
    }

    #[test]
    fn test_to_wide_rejects_interior_nul() {
        assert!(to_wide("a\0b").is_none());
    }

    #[test]
    fn test_to_wide_non_ascii() {
        let wide = to_wide("héllo").unwrap();
        assert_eq!(wide.len(), 6);
    }
}
