/// Owned secret material that is zero-filled when it is released
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Sensitive bytes (session keys and the like) held until the wipe
///
/// The buffer is zeroized on [`SecretBuffer::release`] and again on drop,
/// so it never leaves memory readable however it goes away.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer {
    bytes: Vec<u8>,
}

impl SecretBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    pub fn expose_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Zero-fill in place and drop, returning how many bytes were scrubbed
    pub fn release(mut self) -> usize {
        let len = self.bytes.len();
        self.bytes.zeroize();
        len
    }
}

impl From<Vec<u8>> for SecretBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SecretBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl From<String> for SecretBuffer {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {}])", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_reports_length() {
        let secret = SecretBuffer::from(vec![0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(secret.release(), 4);
    }

    #[test]
    fn test_zeroize_in_place() {
        let mut secret = SecretBuffer::from(&b"session-key"[..]);
        secret.expose_mut()[0] = b'S';
        assert_eq!(&secret.expose()[..3], b"Ses");

        secret.zeroize();
        assert!(secret.is_empty());
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretBuffer::from(String::from("hunter2"));
        let shown = format!("{secret:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains('7'));
    }
}
