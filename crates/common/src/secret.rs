//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. Anything that would let a reader impersonate
//! a user or the service goes in a `SecretString`:
//! - the Auth0 client secret
//! - authorization codes and refresh tokens passing through the broker
//! - access tokens handed back to the SPA
//!
//! `SecretString` implements `Debug` with redaction, so deriving `Debug` on a
//! struct that holds one is safe, and `tracing` fields formatted with `?`
//! never reveal the value. Secrets are zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ClientCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = ClientCredentials {
//!     client_id: "spa-client".to_string(),
//!     client_secret: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//! assert_eq!(creds.client_secret.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("client-secret-value");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("client-secret-value"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("refresh-token");
        assert_eq!(secret.expose_secret(), "refresh-token");
    }

    #[test]
    fn test_deserialized_refresh_request_is_redacted() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct RefreshRequest {
            refresh_token: SecretString,
        }

        let json = r#"{"refresh_token": "v1.MRrt-abc"}"#;
        let req: RefreshRequest = serde_json::from_str(json).expect("deserialize");

        assert_eq!(req.refresh_token.expose_secret(), "v1.MRrt-abc");

        let debug = format!("{req:?}");
        assert!(!debug.contains("v1.MRrt-abc"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_clone_keeps_value() {
        let secret = SecretString::from("cloneable");
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
