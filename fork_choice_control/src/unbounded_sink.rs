use futures::{
    channel::mpsc::{TrySendError, UnboundedSender},
    sink::Drain,
};

/// A destination for outbound messages that never blocks the sender.
pub trait UnboundedSink<T> {
    fn unbounded_send(&self, message: T) -> Result<(), T>;
}

impl<T> UnboundedSink<T> for UnboundedSender<T> {
    fn unbounded_send(&self, message: T) -> Result<(), T> {
        self.unbounded_send(message)
            .map_err(TrySendError::into_inner)
    }
}

// For nodes whose peers are not simulated.
impl<T> UnboundedSink<T> for Drain<T> {
    fn unbounded_send(&self, _message: T) -> Result<(), T> {
        Ok(())
    }
}
