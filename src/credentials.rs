//! Provider credential lookup.
//!
//! Order: OS keyring (service `ai-gateway`, account = family name), then the family's
//! `*_API_KEY` environment variable. Keys are resolved once into a [`Credentials`] snapshot when
//! the transport is built; the keyring is never queried on the request path. Values are never
//! logged.

use keyring::Entry;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::routing::ProviderFamily;

pub const KEYRING_SERVICE: &str = "ai-gateway";

/// Families that authenticate with a bearer API key.
pub const KEYED_FAMILIES: [ProviderFamily; 5] = [
    ProviderFamily::OpenAi,
    ProviderFamily::Anthropic,
    ProviderFamily::Groq,
    ProviderFamily::OpenRouter,
    ProviderFamily::Xai,
];

/// Look up one family's key. Blocking: may talk to the platform secret service.
pub fn api_key(family: ProviderFamily) -> Option<String> {
    if let Ok(entry) = Entry::new(KEYRING_SERVICE, family.name()) {
        if let Ok(key) = entry.get_password() {
            return Some(key);
        }
    }

    family
        .credential_env()
        .and_then(|var| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
}

/// API keys resolved once per keyed family.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderFamily, String>,
}

impl Credentials {
    /// Resolve every keyed family now.
    pub fn load() -> Self {
        let keys = KEYED_FAMILIES
            .iter()
            .filter_map(|&family| api_key(family).map(|key| (family, key)))
            .collect();
        Self { keys }
    }

    /// Fixed keys, bypassing keyring and environment.
    pub fn from_keys(keys: impl IntoIterator<Item = (ProviderFamily, String)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn get(&self, family: ProviderFamily) -> Option<&str> {
        self.keys.get(&family).map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<&str> = self.keys.keys().map(|f| f.name()).collect();
        families.sort_unstable();
        f.debug_struct("Credentials")
            .field("configured", &families)
            .finish()
    }
}

/// Presence of one family's credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialStatus {
    pub family: ProviderFamily,
    pub configured: bool,
}

/// Log which provider credentials are configured and return the summary.
pub fn report_credentials(credentials: &Credentials) -> Vec<CredentialStatus> {
    let mut report: Vec<CredentialStatus> = KEYED_FAMILIES
        .iter()
        .map(|&family| CredentialStatus {
            family,
            configured: credentials.get(family).is_some(),
        })
        .collect();

    for status in &report {
        if status.configured {
            debug!(provider = %status.family, "API key configured");
        } else {
            warn!(provider = %status.family, "no API key found");
        }
    }

    let aws = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_REGION_NAME"]
        .iter()
        .all(|v| std::env::var(v).map(|s| !s.is_empty()).unwrap_or(false));
    if aws {
        debug!(provider = "bedrock", "AWS credentials configured");
    } else {
        warn!(provider = "bedrock", "missing AWS credentials for Bedrock");
    }
    report.push(CredentialStatus {
        family: ProviderFamily::Bedrock,
        configured: aws,
    });

    report
}
