//! Blocking host channels
//!
//! [`Channel`] is a typeless FIFO guarded by a mutex with two condition
//! variables. Capacity 0 is a rendezvous channel: a send completes only once
//! a receiver has taken the value. [`ChanRef`] adds the element type and
//! direction the bridge checks against.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{HostError, HostResult};
use crate::types::{ChanDir, HostType};
use crate::value::HostValue;

/// Channel protocol errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Send on a closed channel
    #[error("send on closed channel")]
    SendOnClosed,
    /// Close of an already closed channel
    #[error("close of closed channel")]
    CloseOfClosed,
}

struct ChannelInner {
    /// Buffer capacity (0 = unbuffered)
    capacity: usize,
    queue: VecDeque<HostValue>,
    closed: bool,
    /// Values ever enqueued; a sender's ticket
    sent: u64,
    /// Values ever dequeued
    taken: u64,
}

/// Multi-producer multi-consumer blocking channel
pub struct Channel {
    inner: Mutex<ChannelInner>,
    /// Senders waiting for a free slot or for their value to be taken
    not_full: Condvar,
    /// Receivers waiting for a value
    not_empty: Condvar,
}

impl Channel {
    /// Create a channel with the given buffer capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                capacity,
                queue: VecDeque::with_capacity(capacity.max(1)),
                closed: false,
                sent: 0,
                taken: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Buffer capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether no values are buffered
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Send a value, blocking until there is room and, for unbuffered
    /// channels, until a receiver has taken it
    pub fn send(&self, value: HostValue) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(ChannelError::SendOnClosed);
            }
            if inner.queue.len() < inner.capacity.max(1) {
                break;
            }
            self.not_full.wait(&mut inner);
        }

        inner.queue.push_back(value);
        inner.sent += 1;
        let ticket = inner.sent;
        self.not_empty.notify_one();

        if inner.capacity == 0 {
            while inner.taken < ticket {
                if inner.closed {
                    return Err(ChannelError::SendOnClosed);
                }
                self.not_full.wait(&mut inner);
            }
        }
        Ok(())
    }

    /// Receive a value, blocking until one is available.
    /// Returns `None` once the channel is closed and drained.
    pub fn receive(&self) -> Option<HostValue> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(value) = inner.queue.pop_front() {
                inner.taken += 1;
                // Wakes both slot waiters and rendezvous waiters
                self.not_full.notify_all();
                return Some(value);
            }
            if inner.closed {
                return None;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Close the channel and wake every waiter.
    ///
    /// Values buffered in a buffered channel remain receivable. A value
    /// parked by an unbuffered sender is discarded and that sender fails.
    pub fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ChannelError::CloseOfClosed);
        }
        inner.closed = true;
        if inner.capacity == 0 {
            inner.queue.clear();
        }
        self.not_full.notify_all();
        self.not_empty.notify_all();
        Ok(())
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Channel")
            .field("capacity", &inner.capacity)
            .field("length", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

/// Typed, directional reference to a shared [`Channel`]
#[derive(Clone)]
pub struct ChanRef {
    elem: Arc<HostType>,
    dir: ChanDir,
    chan: Arc<Channel>,
}

impl ChanRef {
    /// Create a bidirectional channel of `elem` values
    pub fn new(elem: HostType, capacity: usize) -> Self {
        ChanRef {
            elem: Arc::new(elem),
            dir: ChanDir::Both,
            chan: Arc::new(Channel::new(capacity)),
        }
    }

    /// View of the same channel restricted to `dir`.
    /// A directional view cannot be widened back to bidirectional.
    pub fn restrict(&self, dir: ChanDir) -> ChanRef {
        let dir = if self.dir == ChanDir::Both { dir } else { self.dir };
        ChanRef {
            elem: self.elem.clone(),
            dir,
            chan: self.chan.clone(),
        }
    }

    /// Element type
    pub fn elem_type(&self) -> &HostType {
        &self.elem
    }

    /// Permitted direction
    pub fn dir(&self) -> ChanDir {
        self.dir
    }

    /// Channel type of this reference
    pub fn host_type(&self) -> HostType {
        HostType::Chan(self.dir, self.elem.clone())
    }

    /// Send `value`, blocking as described on [`Channel::send`]
    pub fn send(&self, value: HostValue) -> HostResult<()> {
        if !self.dir.can_send() {
            return Err(HostError::Direction {
                op: "send",
                ty: self.host_type().to_string(),
            });
        }
        if !self.elem.is_assignable_from(&value) {
            return Err(HostError::mismatch(&*self.elem, value.type_name()));
        }
        self.chan.send(value)?;
        Ok(())
    }

    /// Receive a value; `None` when closed and drained
    pub fn receive(&self) -> HostResult<Option<HostValue>> {
        if !self.dir.can_recv() {
            return Err(HostError::Direction {
                op: "receive",
                ty: self.host_type().to_string(),
            });
        }
        Ok(self.chan.receive())
    }

    /// Close the channel
    pub fn close(&self) -> HostResult<()> {
        if !self.dir.can_send() {
            return Err(HostError::Direction {
                op: "close",
                ty: self.host_type().to_string(),
            });
        }
        self.chan.close()?;
        Ok(())
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        self.chan.len()
    }

    /// Whether no values are buffered
    pub fn is_empty(&self) -> bool {
        self.chan.is_empty()
    }

    /// Buffer capacity
    pub fn capacity(&self) -> usize {
        self.chan.capacity()
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.chan.is_closed()
    }

    /// Whether both refer to the same channel
    pub fn ptr_eq(&self, other: &ChanRef) -> bool {
        Arc::ptr_eq(&self.chan, &other.chan)
    }

    /// Address of the channel
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.chan) as usize
    }
}

impl fmt::Debug for ChanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChanRef")
            .field("type", &self.host_type().to_string())
            .field("chan", &self.chan)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_fifo() {
        let ch = ChanRef::new(HostType::INT64, 2);
        ch.send(1i64.into()).unwrap();
        ch.send(2i64.into()).unwrap();
        assert_eq!(ch.len(), 2);
        assert_eq!(ch.receive().unwrap(), Some(HostValue::from(1i64)));
        assert_eq!(ch.receive().unwrap(), Some(HostValue::from(2i64)));
    }

    #[test]
    fn test_close_drains_then_reports_closed() {
        let ch = ChanRef::new(HostType::STRING, 1);
        ch.send("last".into()).unwrap();
        ch.close().unwrap();
        assert_eq!(ch.receive().unwrap(), Some(HostValue::from("last")));
        assert_eq!(ch.receive().unwrap(), None);
    }

    #[test]
    fn test_close_twice() {
        let ch = ChanRef::new(HostType::INT, 0);
        ch.close().unwrap();
        assert_eq!(ch.close(), Err(HostError::Channel(ChannelError::CloseOfClosed)));
        assert_eq!(ch.send(HostValue::Int(crate::IntWidth::Size, 1)), Err(HostError::Channel(ChannelError::SendOnClosed)));
    }

    #[test]
    fn test_rendezvous() {
        let ch = ChanRef::new(HostType::INT64, 0);
        crossbeam::thread::scope(|s| {
            let sender = ch.clone();
            s.spawn(move |_| {
                for i in 0..3i64 {
                    sender.send(i.into()).unwrap();
                }
                sender.close().unwrap();
            });
            let mut got = Vec::new();
            while let Some(v) = ch.receive().unwrap() {
                got.push(v);
            }
            assert_eq!(got, vec![HostValue::from(0i64), HostValue::from(1i64), HostValue::from(2i64)]);
        })
        .unwrap();
    }

    #[test]
    fn test_direction_checks() {
        let ch = ChanRef::new(HostType::INT64, 1);
        let recv_only = ch.restrict(ChanDir::Recv);
        assert!(matches!(recv_only.send(1i64.into()), Err(HostError::Direction { op: "send", .. })));
        assert_eq!(recv_only.restrict(ChanDir::Both).dir(), ChanDir::Recv);
        assert!(recv_only.ptr_eq(&ch));
        assert_eq!(recv_only.host_type().to_string(), "<-chan int64");
    }

    #[test]
    fn test_send_type_mismatch() {
        let ch = ChanRef::new(HostType::STRING, 1);
        assert!(matches!(ch.send(1i64.into()), Err(HostError::TypeMismatch { .. })));
    }
}
