//! Event plumbing between the host and the reactor.
//!
//! Every message carries the span it was sent from, so the receiver handles
//! it inside the originating span.

pub mod broadcast;
pub mod reactor;

use tokio::sync::mpsc;
use tracing::Span;

pub struct Sender<T>(mpsc::UnboundedSender<(Span, T)>);

pub type Receiver<T> = mpsc::UnboundedReceiver<(Span, T)>;

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Sender(tx), rx)
}

impl<T> Sender<T> {
    /// Sends `event`, dropping it if the receiver is gone.
    pub fn send(&self, event: T) { _ = self.try_send(event); }

    pub fn try_send(&self, event: T) -> Result<(), mpsc::error::SendError<(Span, T)>> {
        self.0.send((Span::current(), event))
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sender").finish()
    }
}
