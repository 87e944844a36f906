//! Fixed test payload written into every benchmark object

use serde::{Deserialize, Serialize};

/// Payload written into each object unless configured otherwise.
pub const DEFAULT_PAYLOAD: &str = "abcdefghi";

/// Bytes written into each freshly requested object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Copy the payload into `object`, truncating to the object's size and
    /// zero-filling whatever is left (`strncpy` semantics).
    #[inline]
    pub fn write_into(&self, object: &mut [u8]) {
        let bytes = self.0.as_bytes();
        let n = bytes.len().min(object.len());
        object[..n].copy_from_slice(&bytes[..n]);
        object[n..].fill(0);
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_objects_with_zeros() {
        let mut object = [0xFFu8; 10];
        Payload::default().write_into(&mut object);
        assert_eq!(&object, b"abcdefghi\0");
    }

    #[test]
    fn truncates_to_object_size() {
        let mut object = [0u8; 4];
        Payload::default().write_into(&mut object);
        assert_eq!(&object, b"abcd");
    }

    #[test]
    fn empty_payload_zeroes_the_object() {
        let mut object = [7u8; 3];
        Payload::new("").write_into(&mut object);
        assert_eq!(object, [0, 0, 0]);
    }
}
