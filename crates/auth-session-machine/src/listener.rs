use crate::machine::AuthSessionMachine;
use tokio::task::JoinHandle;
use tracing::debug;

impl AuthSessionMachine {
    /// Feed every wallet event into the machine, in emission order.
    ///
    /// The subscription is taken before this returns, so no event emitted
    /// afterwards is missed. The task ends when the extension's event
    /// channel closes; abort the handle to stop it earlier.
    pub fn spawn_wallet_listener(&self) -> JoinHandle<()> {
        let mut events = self.wallet().subscribe();
        let machine = self.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(event = ?event, "Wallet event");
                machine.handle_wallet_event(event);
            }
            debug!("Wallet event stream closed");
        })
    }
}
