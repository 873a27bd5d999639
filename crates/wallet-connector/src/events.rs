use crate::extension::ExtensionEvent;
use solvibe_core::WalletAddress;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Typed wallet event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connected(WalletAddress),
    Disconnected,
    AccountChanged(Option<WalletAddress>),
}

impl WalletEvent {
    /// Address the wallet is connected with after this event, if any.
    pub fn address(&self) -> Option<&WalletAddress> {
        match self {
            WalletEvent::Connected(addr) => Some(addr),
            WalletEvent::AccountChanged(addr) => addr.as_ref(),
            WalletEvent::Disconnected => None,
        }
    }

    fn from_extension(event: ExtensionEvent) -> Result<Self, String> {
        let parse = |raw: String| WalletAddress::parse(raw).map_err(|e| e.to_string());
        Ok(match event {
            ExtensionEvent::Connect(pk) => WalletEvent::Connected(parse(pk)?),
            ExtensionEvent::Disconnect => WalletEvent::Disconnected,
            ExtensionEvent::AccountChanged(pk) => {
                WalletEvent::AccountChanged(pk.map(parse).transpose()?)
            }
        })
    }
}

/// Event stream in extension emission order.
pub struct WalletEvents {
    rx: broadcast::Receiver<ExtensionEvent>,
}

impl WalletEvents {
    pub(crate) fn new(rx: broadcast::Receiver<ExtensionEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the extension's channel is closed.
    ///
    /// Events carrying an unparseable public key are dropped with a warning.
    /// A lagging receiver logs how many events it missed and keeps going.
    pub async fn recv(&mut self) -> Option<WalletEvent> {
        loop {
            match self.rx.recv().await {
                Ok(raw) => match WalletEvent::from_extension(raw) {
                    Ok(event) => return Some(event),
                    Err(e) => warn!(error = %e, "Dropping wallet event with invalid public key"),
                },
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Wallet event receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_typed_in_order() {
        let (tx, rx) = broadcast::channel(8);
        let mut events = WalletEvents::new(rx);

        tx.send(ExtensionEvent::Connect("Addr1".into())).unwrap();
        tx.send(ExtensionEvent::AccountChanged(Some("Addr2".into()))).unwrap();
        tx.send(ExtensionEvent::AccountChanged(None)).unwrap();
        tx.send(ExtensionEvent::Disconnect).unwrap();
        drop(tx);

        let addr = |s: &str| WalletAddress::parse(s).unwrap();
        assert_eq!(events.recv().await, Some(WalletEvent::Connected(addr("Addr1"))));
        assert_eq!(
            events.recv().await,
            Some(WalletEvent::AccountChanged(Some(addr("Addr2"))))
        );
        assert_eq!(events.recv().await, Some(WalletEvent::AccountChanged(None)));
        assert_eq!(events.recv().await, Some(WalletEvent::Disconnected));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_invalid_key_is_skipped() {
        let (tx, rx) = broadcast::channel(8);
        let mut events = WalletEvents::new(rx);

        tx.send(ExtensionEvent::Connect("0OIl".into())).unwrap();
        tx.send(ExtensionEvent::Disconnect).unwrap();

        assert_eq!(events.recv().await, Some(WalletEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_lagged_receiver_continues() {
        let (tx, rx) = broadcast::channel(2);
        let mut events = WalletEvents::new(rx);

        for _ in 0..4 {
            tx.send(ExtensionEvent::Disconnect).unwrap();
        }
        tx.send(ExtensionEvent::Connect("Addr3".into())).unwrap();

        let mut last = None;
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), events.recv()).await
        {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(WalletEvent::Connected(WalletAddress::parse("Addr3").unwrap()))
        );
    }
}
