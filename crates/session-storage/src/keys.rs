//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token issued by verify
    pub const AUTH_TOKEN: &'static str = "auth_token";

    /// Serialized UserProfile (JSON)
    pub const AUTH_USER: &'static str = "auth_user";

    /// Local "profile completed" cache flag
    pub const PROFILE_COMPLETED: &'static str = "profile_completed";

    /// Wallet reconnect intent flag
    pub const WALLET_CONNECTED: &'static str = "wallet_connected";

    /// Address the wallet was last connected with
    pub const WALLET_ADDRESS: &'static str = "wallet_address";

    /// Keys cleared together with the session.
    pub const SESSION: [&'static str; 3] =
        [Self::AUTH_TOKEN, Self::AUTH_USER, Self::PROFILE_COMPLETED];

    pub const ALL: [&'static str; 5] = [
        Self::AUTH_TOKEN,
        Self::AUTH_USER,
        Self::PROFILE_COMPLETED,
        Self::WALLET_CONNECTED,
        Self::WALLET_ADDRESS,
    ];
}
