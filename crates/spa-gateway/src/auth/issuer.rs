//! Token issuer classification.

use std::fmt;

/// Azure AD v2.0 issuer prefix.
pub const AZURE_AD_V2_PREFIX: &str = "https://login.microsoftonline.com/";

/// Azure AD v1.0 (STS) issuer prefix.
pub const AZURE_AD_V1_PREFIX: &str = "https://sts.windows.net/";

/// The identity provider that minted a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Issuer {
    AzureAd,
    Auth0,
    Unknown,
}

impl Issuer {
    /// Classify an unverified `iss` claim.
    ///
    /// Azure AD is recognized by its fixed issuer prefixes. Auth0 is
    /// recognized by the configured tenant domain; with no domain configured
    /// nothing classifies as Auth0. Classification only selects the key
    /// source. The exact Auth0 `iss` is enforced later, during verification.
    pub fn classify(iss: &str, auth0_domain: Option<&str>) -> Issuer {
        if iss.starts_with(AZURE_AD_V2_PREFIX) || iss.starts_with(AZURE_AD_V1_PREFIX) {
            return Issuer::AzureAd;
        }

        match auth0_domain {
            Some(domain) if !domain.is_empty() && iss.contains(domain) => Issuer::Auth0,
            _ => Issuer::Unknown,
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Issuer::AzureAd => "azure",
            Issuer::Auth0 => "auth0",
            Issuer::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: Option<&str> = Some("example.auth0.com");

    #[test]
    fn test_azure_v2_issuer() {
        assert_eq!(
            Issuer::classify(
                "https://login.microsoftonline.com/72f988bf-86f1-41af-91ab-2d7cd011db47/v2.0",
                DOMAIN
            ),
            Issuer::AzureAd
        );
    }

    #[test]
    fn test_azure_v1_issuer() {
        assert_eq!(
            Issuer::classify("https://sts.windows.net/tenant-id/", DOMAIN),
            Issuer::AzureAd
        );
    }

    #[test]
    fn test_azure_recognized_without_auth0_domain() {
        assert_eq!(
            Issuer::classify("https://sts.windows.net/tenant-id/", None),
            Issuer::AzureAd
        );
    }

    #[test]
    fn test_auth0_issuer() {
        assert_eq!(
            Issuer::classify("https://example.auth0.com/", DOMAIN),
            Issuer::Auth0
        );
    }

    #[test]
    fn test_auth0_requires_configured_domain() {
        assert_eq!(
            Issuer::classify("https://example.auth0.com/", None),
            Issuer::Unknown
        );
        assert_eq!(
            Issuer::classify("https://example.auth0.com/", Some("")),
            Issuer::Unknown
        );
    }

    #[test]
    fn test_other_issuers_are_unknown() {
        for iss in [
            "https://accounts.google.com",
            "https://other.auth0.com/",
            "http://login.microsoftonline.com/tenant/v2.0",
            "https://login.microsoftonline.com.evil.example/",
            "",
        ] {
            assert_eq!(Issuer::classify(iss, DOMAIN), Issuer::Unknown, "iss = {iss}");
        }
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(Issuer::AzureAd.to_string(), "azure");
        assert_eq!(Issuer::Auth0.to_string(), "auth0");
        assert_eq!(Issuer::Unknown.to_string(), "unknown");
    }
}
