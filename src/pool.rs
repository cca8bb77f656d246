use parking_lot::Mutex;
use std::sync::Arc;

/// A pool of fixed-size datagram buffers. The accept loops take one buffer
/// per received datagram; dropping the handle returns the buffer for reuse
/// instead of freeing it. Buffers keep their full length so they can be
/// handed straight to `recv_from`.
pub struct BufferPool {
    buffers: Arc<Mutex<Vec<Vec<u8>>>>,
    buffer_size: usize,
    max_buffers: usize,
}

impl BufferPool {
    pub fn new(buffer_size: usize, max_buffers: usize) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(Vec::with_capacity(max_buffers))),
            buffer_size,
            max_buffers,
        }
    }

    pub fn get(&self) -> PooledBuffer {
        let buf = {
            let mut buffers = self.buffers.lock();
            buffers.pop()
        };
        PooledBuffer {
            buf: Some(buf.unwrap_or_else(|| vec![0u8; self.buffer_size])),
            pool: self.clone(),
        }
    }

    fn put(&self, buf: Vec<u8>) {
        let mut buffers = self.buffers.lock();
        if buffers.len() < self.max_buffers {
            buffers.push(buf);
        }
    }
}

impl Clone for BufferPool {
    fn clone(&self) -> Self {
        Self {
            buffers: Arc::clone(&self.buffers),
            buffer_size: self.buffer_size,
            max_buffers: self.max_buffers,
        }
    }
}

/// A buffer on loan from the pool; returns itself on drop.
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: BufferPool,
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buf.as_ref().unwrap()
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_mut().unwrap()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_reused() {
        let pool = BufferPool::new(512, 4);

        let mut buf = pool.get();
        assert_eq!(buf.len(), 512);
        buf[0] = 0xAB;
        drop(buf);

        // Same buffer comes back, full length, contents untouched.
        let buf = pool.get();
        assert_eq!(buf.len(), 512);
        assert_eq!(buf[0], 0xAB);
    }

    #[test]
    fn pool_caps_retained_buffers() {
        let pool = BufferPool::new(64, 1);
        let a = pool.get();
        let b = pool.get();
        drop(a);
        drop(b);
        assert_eq!(pool.buffers.lock().len(), 1);
    }
}
