use crate::error::{Error, Result};

/// A fixed-size, zero-initialized byte buffer.
///
/// The backing storage never moves while the buffer is alive, so the data
/// pointer handed out through the C ABI stays stable.
#[derive(Debug)]
pub struct NativeBuffer {
    data: Box<[u8]>,
}

impl NativeBuffer {
    pub fn new(size: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|e| Error::AllocationFailed(format!("{} byte buffer: {}", size, e)))?;
        data.resize(size, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Non-null even for a zero-sized buffer.
    pub fn data(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let mut b = NativeBuffer::new(16).unwrap();
        assert_eq!(b.size(), 16);
        assert!(!b.data().is_null());
        assert!(b.as_slice().iter().all(|&x| x == 0));
    }

    #[test]
    fn test_empty_has_pointer() {
        let mut b = NativeBuffer::new(0).unwrap();
        assert_eq!(b.size(), 0);
        assert!(!b.data().is_null());
    }

    #[test]
    fn test_huge_reports_allocation_failure() {
        let err = NativeBuffer::new(usize::MAX).unwrap_err();
        assert!(err.is_allocation_failed());
    }
}
