//! Connection settings shared by every command.

use qce_client::DefaultQceClient;
use qce_core::{QceResult, TokenResolver};
use qce_events::EventStreamConfig;

use crate::parser::Cli;

/// Host, port and token as given on the command line.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub host: Option<String>,
    pub port: u16,
    pub token: Option<String>,
    pub resolver: TokenResolver,
}

impl CliContext {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            port: cli.port,
            token: cli.token.clone(),
            resolver: TokenResolver::new(),
        }
    }

    /// Client with host and token resolved from flags, env and security.json.
    pub fn client(&self) -> QceResult<DefaultQceClient> {
        DefaultQceClient::connect_auto(
            &self.resolver,
            self.host.as_deref(),
            self.port,
            self.token.as_deref(),
        )
    }

    pub fn host(&self) -> String {
        self.host
            .clone()
            .or_else(|| self.resolver.server_host())
            .unwrap_or_else(|| qce_client::DEFAULT_HOST.to_string())
    }

    /// Event stream settings for the same service.
    pub fn event_config(&self) -> EventStreamConfig {
        let config = EventStreamConfig::for_service(&self.host(), self.port);
        match self.resolver.resolve(self.token.as_deref()) {
            Ok(token) => config.with_token(token),
            Err(_) => config,
        }
    }
}
