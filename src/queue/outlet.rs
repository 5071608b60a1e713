//! Output endpoint abstraction.
//!
//! The relay forwards into anything that behaves like the sending half of a
//! bounded channel: it must report its capacity, whether it currently has room,
//! and let the worker wait until it does.

use std::future::Future;
use thiserror::Error as ThisError;
use tokio::sync::mpsc;

/// The receiving side of the output endpoint has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("output endpoint is closed")]
pub struct OutletClosed;

/// Sending half of a bounded output channel.
///
/// Implemented for [`tokio::sync::mpsc::Sender`], which is also the default
/// output endpoint of a relay.
pub trait Outlet<T>: Send + Sync + 'static {
    /// Consumer half handed to the caller when the relay allocates the endpoint.
    type Receiver: Send + 'static;

    /// Allocates a new endpoint holding at most `capacity` items.
    fn bounded(capacity: usize) -> (Self, Self::Receiver)
    where
        Self: Sized;

    /// Maximum number of items the endpoint can hold.
    ///
    /// A relay refuses to start when this is 0.
    fn max_capacity(&self) -> usize;

    /// Returns true if a send would complete without waiting.
    fn has_room(&self) -> bool;

    /// Resolves once the endpoint has room for at least one item.
    ///
    /// Once this resolves with `Ok`, [`has_room`](Self::has_room) must return
    /// true until another sender takes the slot.
    fn ready(&self) -> impl Future<Output = Result<(), OutletClosed>> + Send;

    /// Sends `item`, waiting for room if necessary.
    ///
    /// # Errors
    ///
    /// Hands the item back if the endpoint is closed.
    fn forward(&self, item: T) -> impl Future<Output = Result<(), T>> + Send;
}

impl<T: Send + 'static> Outlet<T> for mpsc::Sender<T> {
    type Receiver = mpsc::Receiver<T>;

    fn bounded(capacity: usize) -> (Self, Self::Receiver) {
        mpsc::channel(capacity)
    }

    fn max_capacity(&self) -> usize {
        Self::max_capacity(self)
    }

    fn has_room(&self) -> bool {
        !self.is_closed() && self.capacity() > 0
    }

    async fn ready(&self) -> Result<(), OutletClosed> {
        self.reserve().await.map(drop).map_err(|_| OutletClosed)
    }

    async fn forward(&self, item: T) -> Result<(), T> {
        self.send(item).await.map_err(|e| e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mpsc_outlet_room() {
        let (outlet, mut receiver) = <mpsc::Sender<u32> as Outlet<u32>>::bounded(1);

        assert_eq!(Outlet::max_capacity(&outlet), 1);
        assert!(outlet.has_room());

        outlet.forward(1).await.unwrap();
        assert!(!outlet.has_room());

        assert_eq!(receiver.recv().await, Some(1));
        assert!(outlet.has_room());
        assert_eq!(outlet.ready().await, Ok(()));
    }

    #[tokio::test]
    async fn test_mpsc_outlet_closed() {
        let (outlet, receiver) = <mpsc::Sender<u32> as Outlet<u32>>::bounded(2);
        drop(receiver);

        assert!(!outlet.has_room());
        assert_eq!(outlet.ready().await, Err(OutletClosed));
        assert_eq!(outlet.forward(9).await, Err(9));
    }
}
