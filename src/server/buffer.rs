use bytes::Bytes;

/// An owned byte range moved between the reactor and worker threads.
///
/// A `TransferBlock` is deliberately not `Clone`: handing it to a queue moves
/// it, so the sending side can no longer read or reuse the bytes. Whichever
/// side pops the block performs the final I/O operation on it and drops it.
#[derive(Debug)]
pub struct TransferBlock {
    data: Bytes,
}

impl TransferBlock {
    /// Copies `data` into a freshly owned block.
    pub fn copy_from(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Takes ownership of an already assembled buffer without copying.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for TransferBlock {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for TransferBlock {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}
