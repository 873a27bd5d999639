use tracing::{info, warn};

/// Hook invoked when a connect is attempted without an installed extension.
pub trait InstallPrompt: Send + Sync {
    fn prompt_install(&self, url: &str);
}

/// Opens the install page in the system browser. Failure is only logged.
pub struct BrowserInstallPrompt;

impl InstallPrompt for BrowserInstallPrompt {
    fn prompt_install(&self, url: &str) {
        match open::that(url) {
            Ok(()) => info!(url, "Opened wallet install page"),
            Err(e) => warn!(url, error = %e, "Failed to open wallet install page"),
        }
    }
}
