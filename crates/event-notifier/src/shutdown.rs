use tokio::sync::watch;

/// Stops the notifier and heartbeat loops
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: watch::Sender<bool>,
}

/// Resolves once [`NotifierHandle::stop`] is called or every handle is dropped
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (NotifierHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (NotifierHandle { tx }, Shutdown { rx })
}

impl NotifierHandle {
    pub fn stop(&self) {
        // send only fails when no receiver is left, which means nothing to stop
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
