// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_channel::{Receiver, Sender};

/// One-shot cancellation signal that can be fired from any thread and awaited
/// on any executor.
///
/// Nothing is ever sent over the inner channel; firing the signal closes it,
/// which wakes every pending [`cancelled`](Self::cancelled) future.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self { tx, rx }
    }

    /// Fires the signal. Firing it again has no effect.
    pub fn cancel(&self) {
        self.tx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Completes once the signal has fired.
    pub async fn cancelled(&self) {
        let _ = self.rx.recv().await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}
