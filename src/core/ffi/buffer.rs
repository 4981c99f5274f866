//! Borrowed byte ranges handed to foreign calls.
//!
//! A foreign call receives a base address and a length. Holding the borrow
//! for the duration of the call keeps the memory alive and unmoved, so no
//! raw address ever outlives the call it was produced for.
//!
//! Lengths cross the boundary as `u32`; a range longer than that has no
//! faithful representation and is reported as `None`.

fn length_u32(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Read-only input range with an explicit length.
///
/// The runtime accepts byte ranges that are not null-terminated, so the
/// length always comes from the slice, never from the content.
#[derive(Debug, Clone, Copy)]
pub struct InBytes<'a> {
    bytes: &'a [u8],
}

impl<'a> InBytes<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length as the runtime takes it, if it fits.
    pub fn len_u32(&self) -> Option<u32> {
        length_u32(self.bytes.len())
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// Base address for the foreign call; null for an empty range.
    pub fn as_ptr(&self) -> *const u8 {
        if self.bytes.is_empty() {
            std::ptr::null()
        } else {
            self.bytes.as_ptr()
        }
    }
}

/// Writable output range the runtime fills in.
#[derive(Debug)]
pub struct OutBuffer<'a> {
    bytes: &'a mut [u8],
}

impl<'a> OutBuffer<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn capacity_u32(&self) -> Option<u32> {
        length_u32(self.bytes.len())
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.bytes
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_has_null_address() {
        let input = InBytes::new(&[]);
        assert!(input.is_empty());
        assert!(input.as_ptr().is_null());
    }

    #[test]
    fn test_input_length_ignores_embedded_nulls() {
        let raw = b"sc\0ott";
        let input = InBytes::new(raw);
        assert_eq!(input.len(), 6);
        assert_eq!(input.as_slice(), raw);
        assert_eq!(input.as_ptr(), raw.as_ptr());
        assert_eq!(input.len_u32(), Some(6));
    }

    #[test]
    fn test_lengths_beyond_u32_are_not_clamped() {
        assert_eq!(length_u32(u32::MAX as usize), Some(u32::MAX));
        #[cfg(target_pointer_width = "64")]
        {
            assert_eq!(length_u32(u32::MAX as usize + 1), None);
            assert_eq!(length_u32(usize::MAX), None);
        }
    }

    #[test]
    fn test_output_buffer_writes_through() {
        let mut storage = [0u8; 4];
        {
            let mut out = OutBuffer::new(&mut storage);
            assert_eq!(out.capacity(), 4);
            assert_eq!(out.capacity_u32(), Some(4));
            out.as_mut_slice()[..2].copy_from_slice(b"ok");
        }
        assert_eq!(&storage, b"ok\0\0");
    }
}
