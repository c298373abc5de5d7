//! FIFO conduits connecting pipeline stages.
//!
//! A conduit is a blocking single-producer/single-consumer channel. Closing
//! happens by dropping the sending half; the receiver then drains what is
//! left and sees end-of-stream.

use std::sync::mpsc::{self, Receiver, SyncSender};

/// An unbuffered conduit: every send waits for the matching receive.
pub fn rendezvous<T>() -> (SyncSender<T>, Receiver<T>) {
    mpsc::sync_channel(0)
}

/// A conduit that holds up to `capacity` items before senders block.
pub fn bounded<T>(capacity: usize) -> (SyncSender<T>, Receiver<T>) {
    mpsc::sync_channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rendezvous_preserves_order() {
        let (tx, rx) = rendezvous();
        let sender = thread::spawn(move || {
            for i in 0..5 {
                tx.send(i).expect("receiver alive");
            }
        });
        let received: Vec<i32> = rx.iter().collect();
        sender.join().expect("sender thread");
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bounded_buffers_without_receiver() {
        let (tx, rx) = bounded(2);
        tx.send("a").expect("buffered");
        tx.send("b").expect("buffered");
        assert!(tx.try_send("c").is_err());
        drop(tx);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
