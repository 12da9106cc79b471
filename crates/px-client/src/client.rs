//! The `ProjectX` facade.
//!
//! ```text
//!                    ┌──────────────────┐
//!   login ─────────► │  AuthApi (REST)  │──┐ writes token
//!                    └──────────────────┘  │
//!                                          ▼
//!                                  ┌───────────────┐
//!                                  │ ClientContext │
//!                                  └───────────────┘
//!                              reads token │   │
//!               ┌──────────────────────────┘   └─────────────────────┐
//!               ▼                                                    ▼
//!   MarketDataService (market hub)                     UserDataService (user hub)
//! ```
//!
//! The hub transport is supplied by the caller; both channels share it.

use std::sync::Arc;

use anyhow::Context;
use px_core::config::ClientConfig;
use px_core::context::ClientContext;
use px_core::hub::HubTransport;
use px_md::MarketDataService;
use px_ud::UserDataService;
use tracing::info;

use crate::account::{AccountApi, TradingAccount};
use crate::api::{ApiClient, ApiError};
use crate::auth::AuthApi;

pub struct ProjectX {
    config: ClientConfig,
    context: Arc<ClientContext>,
    auth: AuthApi,
    accounts: AccountApi,
    market_data: MarketDataService,
    user_data: UserDataService,
}

impl ProjectX {
    pub fn new(config: ClientConfig, transport: Arc<dyn HubTransport>) -> anyhow::Result<Self> {
        Self::with_context(config, Arc::new(ClientContext::new()), transport)
    }

    /// Build around an existing context, e.g. one carrying a persisted token.
    pub fn with_context(
        config: ClientConfig,
        context: Arc<ClientContext>,
        transport: Arc<dyn HubTransport>,
    ) -> anyhow::Result<Self> {
        let endpoints = config.endpoints()?;
        let policy = config.realtime.reconnect_policy();

        let api = ApiClient::new(endpoints.api_base, Arc::clone(&context), &config.user_agent, config.request_timeout())
            .context("failed to build HTTP client")?;
        let market_data =
            MarketDataService::new(endpoints.market_hub, Arc::clone(&context), Arc::clone(&transport), policy);
        let user_data = UserDataService::new(endpoints.user_hub, Arc::clone(&context), transport, policy);

        Ok(Self {
            config,
            context,
            auth: AuthApi::new(api.clone()),
            accounts: AccountApi::new(api),
            market_data,
            user_data,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn accounts(&self) -> &AccountApi {
        &self.accounts
    }

    pub fn market_data(&self) -> &MarketDataService {
        &self.market_data
    }

    pub fn user_data(&self) -> &UserDataService {
        &self.user_data
    }

    /// API-key login with the configured (or environment) credentials.
    pub async fn login(&self) -> anyhow::Result<()> {
        let creds = self
            .config
            .resolve_credentials()
            .context("no credentials configured and PROJECTX_USERNAME / PROJECTX_API_KEY not set")?;
        self.auth.login_key(&creds.user_name, &creds.api_key).await?;
        Ok(())
    }

    pub async fn active_accounts(&self) -> Result<Vec<TradingAccount>, ApiError> {
        self.accounts.search_accounts(true).await
    }

    /// Disconnect both realtime channels.
    pub async fn shutdown(&self) {
        self.market_data.disconnect().await;
        self.user_data.disconnect().await;
        info!("[projectx] realtime channels closed");
    }
}
