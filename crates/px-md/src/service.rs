//! Market-data service: per-contract subscriptions and typed handlers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use px_core::ContractId;
use px_core::channel::{ConnectionHandler, ConnectionState, RealtimeChannel, ReconnectPolicy};
use px_core::context::ClientContext;
use px_core::error::ChannelError;
use px_core::hub::HubTransport;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::records::{DepthEntry, MarketTrade, Quote};
use crate::{DataKind, MarketData, MarketDispatcher};

/// Realtime quotes, trades and depth for any number of contracts.
///
/// Subscriptions survive reconnects: after the hub connection is re-established
/// every remembered `(contract, kind)` is re-sent. They are forgotten on
/// explicit unsubscribe or [`disconnect`](Self::disconnect).
#[derive(Clone)]
pub struct MarketDataService {
    channel: RealtimeChannel<MarketData>,
}

impl MarketDataService {
    pub fn new(
        hub_url: Url,
        context: Arc<ClientContext>,
        transport: Arc<dyn HubTransport>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self { channel: RealtimeChannel::new(hub_url, context, transport, policy, MarketDispatcher::new()) }
    }

    /// Underlying engine handle.
    pub fn channel(&self) -> &RealtimeChannel<MarketData> {
        &self.channel
    }

    // -- Connection --

    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.channel.connect().await
    }

    pub async fn disconnect(&self) {
        self.channel.disconnect().await
    }

    pub async fn state(&self) -> ConnectionState {
        self.channel.state().await
    }

    pub async fn is_connected(&self) -> bool {
        self.channel.is_connected().await
    }

    pub async fn set_connection_handler<F>(&self, handler: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let handler: ConnectionHandler = Arc::new(handler);
        self.channel.set_connection_handler(handler).await
    }

    // -- Handlers --

    pub fn set_quote_handler<F>(&self, handler: F)
    where
        F: Fn(&str, Quote) + Send + Sync + 'static,
    {
        self.channel.dispatcher().set_quote_handler(handler);
    }

    pub fn set_trade_handler<F>(&self, handler: F)
    where
        F: Fn(&str, Vec<MarketTrade>) + Send + Sync + 'static,
    {
        self.channel.dispatcher().set_trade_handler(handler);
    }

    pub fn set_depth_handler<F>(&self, handler: F)
    where
        F: Fn(&str, Vec<DepthEntry>) + Send + Sync + 'static,
    {
        self.channel.dispatcher().set_depth_handler(handler);
    }

    // -- Subscriptions --

    async fn subscribe(&self, contract_id: &str, kind: DataKind) -> Result<(), ChannelError> {
        self.channel.subscribe(contract_id.to_string(), kind, vec![json!(contract_id)]).await
    }

    async fn unsubscribe(&self, contract_id: &str, kind: DataKind) -> Result<(), ChannelError> {
        self.channel.unsubscribe(contract_id.to_string(), kind, vec![json!(contract_id)]).await
    }

    pub async fn subscribe_contract_quotes(&self, contract_id: &str) -> Result<(), ChannelError> {
        self.subscribe(contract_id, DataKind::Quotes).await
    }

    pub async fn subscribe_contract_trades(&self, contract_id: &str) -> Result<(), ChannelError> {
        self.subscribe(contract_id, DataKind::Trades).await
    }

    pub async fn subscribe_contract_market_depth(&self, contract_id: &str) -> Result<(), ChannelError> {
        self.subscribe(contract_id, DataKind::Depth).await
    }

    pub async fn unsubscribe_contract_quotes(&self, contract_id: &str) -> Result<(), ChannelError> {
        self.unsubscribe(contract_id, DataKind::Quotes).await
    }

    pub async fn unsubscribe_contract_trades(&self, contract_id: &str) -> Result<(), ChannelError> {
        self.unsubscribe(contract_id, DataKind::Trades).await
    }

    pub async fn unsubscribe_contract_market_depth(&self, contract_id: &str) -> Result<(), ChannelError> {
        self.unsubscribe(contract_id, DataKind::Depth).await
    }

    /// Quotes, trades, then depth. Stops at the first failure; earlier
    /// subscriptions stay in place.
    pub async fn subscribe_all(&self, contract_id: &str) -> Result<(), ChannelError> {
        for kind in DataKind::ALL {
            self.subscribe(contract_id, kind).await?;
        }
        Ok(())
    }

    /// Unsubscribe quotes, trades, then depth. Stops at the first failure.
    pub async fn unsubscribe_all(&self, contract_id: &str) -> Result<(), ChannelError> {
        for kind in DataKind::ALL {
            self.unsubscribe(contract_id, kind).await?;
        }
        Ok(())
    }

    /// [`unsubscribe_all`](Self::unsubscribe_all) for every contract that
    /// currently holds a subscription.
    pub async fn unsubscribe_all_contracts(&self) -> Result<(), ChannelError> {
        let contracts = self.channel.subscribed_keys().await;
        for contract_id in &contracts {
            self.unsubscribe_all(contract_id).await?;
        }
        info!("[market-data] unsubscribed {} contract(s)", contracts.len());
        Ok(())
    }

    /// Copy of the current subscriptions.
    pub async fn subscriptions(&self) -> BTreeMap<ContractId, BTreeSet<DataKind>> {
        self.channel.subscriptions().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use px_core::error::HubError;
    use px_core::hub::mock::{Call, MockTransport};

    use super::*;
    use crate::dispatcher::QUOTE_EVENT;

    fn service(transport: &MockTransport) -> MarketDataService {
        MarketDataService::new(
            Url::parse("https://rtc.test/hubs/market").unwrap(),
            Arc::new(ClientContext::with_token("tok")),
            Arc::new(transport.clone()),
            ReconnectPolicy::default(),
        )
    }

    fn kinds(list: &[DataKind]) -> BTreeSet<DataKind> {
        list.iter().copied().collect()
    }

    #[tokio::test(start_paused = true)]
    async fn quote_flow_survives_reconnect() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        svc.set_quote_handler(move |id, quote| sink.lock().unwrap().push((id.to_string(), quote)));

        svc.connect().await.unwrap();
        svc.subscribe_contract_quotes("C1").await.unwrap();
        svc.subscribe_contract_trades("C1").await.unwrap();
        assert_eq!(
            transport.latest().unwrap().invocations(),
            vec![
                Call::new("SubscribeContractQuotes", vec![json!("C1")]),
                Call::new("SubscribeContractTrades", vec![json!("C1")]),
            ]
        );

        transport.latest().unwrap().close();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(svc.is_connected().await);

        let session = transport.latest().unwrap();
        assert_eq!(session.id(), 1);
        assert_eq!(
            session.sends(),
            vec![
                Call::new("SubscribeContractQuotes", vec![json!("C1")]),
                Call::new("SubscribeContractTrades", vec![json!("C1")]),
            ]
        );
        assert_eq!(svc.subscriptions().await["C1"], kinds(&[DataKind::Quotes, DataKind::Trades]));

        let quote = json!({"symbol": "F.US.EP", "bestBid": 5000.25, "bestAsk": 5000.5});
        session.push(QUOTE_EVENT, vec![json!("C1"), quote]);
        let got = received.lock().unwrap().clone();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, "C1");
        assert_eq!(got[0].1.symbol, "F.US.EP");
        assert_eq!(got[0].1.best_bid, 5000.25);
        assert_eq!(got[0].1.best_ask, 5000.5);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_quote_is_dropped() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        let calls = Arc::new(Mutex::new(0));
        let c = Arc::clone(&calls);
        svc.set_quote_handler(move |_, _| *c.lock().unwrap() += 1);
        svc.connect().await.unwrap();

        transport.latest().unwrap().push(QUOTE_EVENT, vec![json!("C1"), json!("garbage")]);
        transport.latest().unwrap().push(QUOTE_EVENT, vec![json!("C1"), json!({"bestBid": "high"})]);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(svc.is_connected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn operations_fail_fast_when_not_connected() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        assert!(matches!(svc.subscribe_contract_quotes("C1").await, Err(ChannelError::NotConnected(_))));
        assert!(matches!(svc.unsubscribe_all("C1").await, Err(ChannelError::NotConnected(_))));
        assert!(svc.subscriptions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_all_stops_at_first_rejection() {
        let transport = MockTransport::new();
        transport.reject("SubscribeContractTrades");
        let svc = service(&transport);
        svc.connect().await.unwrap();

        let err = svc.subscribe_all("C1").await.unwrap_err();
        assert!(matches!(err, ChannelError::RemoteRejected { method: "SubscribeContractTrades", .. }));
        assert_eq!(svc.subscriptions().await["C1"], kinds(&[DataKind::Quotes]));
        let methods: Vec<String> = transport.latest().unwrap().invocations().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["SubscribeContractQuotes", "SubscribeContractTrades"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_all_contracts_clears_registry() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        svc.connect().await.unwrap();
        svc.subscribe_all("C1").await.unwrap();
        svc.subscribe_contract_market_depth("C2").await.unwrap();
        assert_eq!(svc.subscriptions().await.len(), 2);

        svc.unsubscribe_contract_quotes("C1").await.unwrap();
        assert_eq!(svc.subscriptions().await["C1"], kinds(&[DataKind::Trades, DataKind::Depth]));

        svc.unsubscribe_all_contracts().await.unwrap();
        assert!(svc.subscriptions().await.is_empty());
        let unsubs = transport
            .latest()
            .unwrap()
            .invocations()
            .into_iter()
            .filter(|c| c.method.starts_with("Unsubscribe"))
            .count();
        // one explicit call plus three per contract
        assert_eq!(unsubs, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_backoff_forgets_everything() {
        let transport = MockTransport::new();
        transport.fail_next_connect(HubError::Transport("down".into()));
        let svc = service(&transport);
        svc.connect().await.unwrap_err();
        svc.connect().await.unwrap();
        svc.subscribe_all("C1").await.unwrap();

        transport.latest().unwrap().close();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(svc.state().await, ConnectionState::Reconnecting);

        svc.disconnect().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(svc.state().await, ConnectionState::Disconnected);
        assert!(svc.subscriptions().await.is_empty());
        assert_eq!(transport.connect_count(), 2);
    }
}
