use crate::client::core::Gateway;
use crate::credentials;
use crate::routing::GatewayConfig;
use crate::transport::{ChatTransport, HttpTransport};
use crate::Result;
use std::sync::Arc;

/// Builder for creating a [`Gateway`].
///
/// Keep this surface area small and predictable: routing comes from one [`GatewayConfig`],
/// dispatch from one [`ChatTransport`].
#[derive(Default)]
pub struct GatewayBuilder {
    config: Option<GatewayConfig>,
    transport: Option<Arc<dyn ChatTransport>>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit configuration instead of loading it from the environment.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Inject a transport. Default is [`HttpTransport`], followed by a credential report.
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the base URL of the default HTTP transport.
    ///
    /// Ignored when a transport is injected.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Build the gateway.
    ///
    /// Without an explicit config, [`GatewayConfig::from_env`] is used (built-in tables,
    /// optionally overlaid by `AI_GATEWAY_CONFIG`). Validation failures surface here, before
    /// any request is accepted.
    pub async fn build(self) -> Result<Gateway> {
        let config = match self.config {
            Some(c) => c,
            None => GatewayConfig::from_env().await?,
        };

        let transport: Arc<dyn ChatTransport> = match self.transport {
            Some(t) => t,
            None => {
                let http = match self.base_url_override {
                    Some(url) => HttpTransport::with_base_url(&url)?,
                    None => HttpTransport::new()?,
                };
                credentials::report_credentials(http.credentials());
                Arc::new(http)
            }
        };

        Gateway::from_parts(config, transport)
    }
}
