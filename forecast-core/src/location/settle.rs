use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

enum State<T> {
    Pending(oneshot::Sender<T>),
    Settled,
}

/// Single-assignment result cell.
///
/// Any number of handles may race to settle it; only the first value is
/// delivered to the receiver, every later one is dropped.
pub(crate) struct Settle<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Settle<T> {
    pub(crate) fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let cell = Self {
            state: Arc::new(Mutex::new(State::Pending(tx))),
        };
        (cell, rx)
    }

    /// Move `Pending → Settled` with `value`. Returns `false` if the cell was
    /// already settled.
    pub(crate) fn settle(&self, value: T) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Settled) {
            State::Pending(tx) => {
                // Receiver may be gone if the caller stopped waiting.
                let _ = tx.send(value);
                true
            }
            State::Settled => false,
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        matches!(*self.state.lock(), State::Settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_settle_wins() {
        let (cell, rx) = Settle::new();
        let other = cell.clone();

        assert!(!cell.is_settled());
        assert!(other.settle(1));
        assert!(!cell.settle(2));
        assert!(cell.is_settled());

        assert_eq!(rx.await.expect("value delivered"), 1);
    }

    #[test]
    fn settles_even_without_receiver() {
        let (cell, rx) = Settle::new();
        drop(rx);
        assert!(cell.settle("late"));
        assert!(!cell.settle("later"));
    }
}
