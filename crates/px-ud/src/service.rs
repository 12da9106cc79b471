//! User-data service: account-scoped subscriptions and typed handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use px_core::AccountId;
use px_core::channel::{ConnectionHandler, ConnectionState, RealtimeChannel, ReconnectPolicy};
use px_core::context::ClientContext;
use px_core::error::ChannelError;
use px_core::hub::HubTransport;
use serde_json::json;
use url::Url;

use crate::event::{AccountEvent, OrderEvent, PositionEvent, TradeEvent};
use crate::{UserData, UserDispatcher, UserEventKind};

/// Realtime account, order, position and trade updates.
///
/// Subscribing orders, positions or trades remembers the account id, which
/// is what gets replayed after a reconnect and what
/// [`unsubscribe_all`](Self::unsubscribe_all) unsubscribes.
#[derive(Clone)]
pub struct UserDataService {
    channel: RealtimeChannel<UserData>,
}

impl UserDataService {
    pub fn new(
        hub_url: Url,
        context: Arc<ClientContext>,
        transport: Arc<dyn HubTransport>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self { channel: RealtimeChannel::new(hub_url, context, transport, policy, UserDispatcher::new()) }
    }

    pub fn channel(&self) -> &RealtimeChannel<UserData> {
        &self.channel
    }

    // -- Connection --

    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.channel.connect().await
    }

    /// Also forgets the remembered account id.
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

    pub fn set_account_handler(&self, handler: impl Fn(AccountEvent) + Send + Sync + 'static) {
        self.channel.dispatcher().set_account_handler(handler);
    }

    pub fn set_order_handler(&self, handler: impl Fn(OrderEvent) + Send + Sync + 'static) {
        self.channel.dispatcher().set_order_handler(handler);
    }

    pub fn set_position_handler(&self, handler: impl Fn(PositionEvent) + Send + Sync + 'static) {
        self.channel.dispatcher().set_position_handler(handler);
    }

    pub fn set_trade_handler(&self, handler: impl Fn(TradeEvent) + Send + Sync + 'static) {
        self.channel.dispatcher().set_trade_handler(handler);
    }

    // -- Account id --

    /// Account id used when replaying per-account streams.
    pub async fn set_account_id(&self, account_id: AccountId) {
        self.channel.update_extra(|account| *account = Some(account_id)).await
    }

    pub async fn account_id(&self) -> Option<AccountId> {
        self.channel.extra().await
    }

    // -- Subscriptions --

    async fn subscribe_account_stream(&self, kind: UserEventKind, account_id: AccountId) -> Result<(), ChannelError> {
        self.channel
            .subscribe_with((), kind, vec![json!(account_id)], move |account| *account = Some(account_id))
            .await
    }

    async fn unsubscribe_account_stream(&self, kind: UserEventKind, account_id: AccountId) -> Result<(), ChannelError> {
        self.channel.unsubscribe((), kind, vec![json!(account_id)]).await
    }

    pub async fn subscribe_accounts(&self) -> Result<(), ChannelError> {
        self.channel.subscribe((), UserEventKind::Accounts, Vec::new()).await
    }

    pub async fn unsubscribe_accounts(&self) -> Result<(), ChannelError> {
        self.channel.unsubscribe((), UserEventKind::Accounts, Vec::new()).await
    }

    pub async fn subscribe_orders(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.subscribe_account_stream(UserEventKind::Orders, account_id).await
    }

    pub async fn unsubscribe_orders(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.unsubscribe_account_stream(UserEventKind::Orders, account_id).await
    }

    pub async fn subscribe_positions(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.subscribe_account_stream(UserEventKind::Positions, account_id).await
    }

    pub async fn unsubscribe_positions(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.unsubscribe_account_stream(UserEventKind::Positions, account_id).await
    }

    pub async fn subscribe_trades(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.subscribe_account_stream(UserEventKind::Trades, account_id).await
    }

    pub async fn unsubscribe_trades(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.unsubscribe_account_stream(UserEventKind::Trades, account_id).await
    }

    /// Accounts, orders, positions, then trades. Stops at the first failure.
    pub async fn subscribe_all(&self, account_id: AccountId) -> Result<(), ChannelError> {
        self.subscribe_accounts().await?;
        self.subscribe_orders(account_id).await?;
        self.subscribe_positions(account_id).await?;
        self.subscribe_trades(account_id).await
    }

    /// Accounts, then orders, positions and trades for the remembered account
    /// (skipped when none is remembered). Stops at the first failure.
    pub async fn unsubscribe_all(&self) -> Result<(), ChannelError> {
        let account_id = self.account_id().await.filter(|id| *id > 0);
        self.unsubscribe_accounts().await?;
        if let Some(id) = account_id {
            self.unsubscribe_orders(id).await?;
            self.unsubscribe_positions(id).await?;
            self.unsubscribe_trades(id).await?;
        }
        Ok(())
    }

    /// Copy of the subscribed streams.
    pub async fn subscriptions(&self) -> BTreeSet<UserEventKind> {
        self.channel.subscriptions().await.remove(&()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use px_core::hub::mock::{Call, MockTransport};

    use super::*;
    use crate::dispatcher::ORDER_EVENT;
    use crate::event::OrderAction;

    fn service(transport: &MockTransport) -> UserDataService {
        UserDataService::new(
            Url::parse("https://rtc.test/hubs/user").unwrap(),
            Arc::new(ClientContext::with_token("tok")),
            Arc::new(transport.clone()),
            ReconnectPolicy::default(),
        )
    }

    fn set(kinds: &[UserEventKind]) -> BTreeSet<UserEventKind> {
        kinds.iter().copied().collect()
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_all_remembers_account_and_replays() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        svc.connect().await.unwrap();
        svc.subscribe_all(465).await.unwrap();
        assert_eq!(svc.account_id().await, Some(465));
        assert_eq!(
            svc.subscriptions().await,
            set(&[UserEventKind::Accounts, UserEventKind::Orders, UserEventKind::Positions, UserEventKind::Trades])
        );

        transport.latest().unwrap().close();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(svc.is_connected().await);
        assert_eq!(
            transport.latest().unwrap().sends(),
            vec![
                Call::new("SubscribeAccounts", vec![]),
                Call::new("SubscribeOrders", vec![json!(465)]),
                Call::new("SubscribePositions", vec![json!(465)]),
                Call::new("SubscribeTrades", vec![json!(465)]),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn per_account_streams_need_a_positive_account_for_replay() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        svc.connect().await.unwrap();
        svc.subscribe_accounts().await.unwrap();
        svc.subscribe_orders(0).await.unwrap();

        transport.latest().unwrap().close();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(transport.latest().unwrap().sends(), vec![Call::new("SubscribeAccounts", vec![])]);
        assert_eq!(svc.subscriptions().await, set(&[UserEventKind::Accounts, UserEventKind::Orders]));
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_all_uses_remembered_account() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        svc.connect().await.unwrap();
        svc.subscribe_accounts().await.unwrap();
        svc.unsubscribe_all().await.unwrap();
        let methods: Vec<String> = transport.latest().unwrap().invocations().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["SubscribeAccounts", "UnsubscribeAccounts"]);

        svc.subscribe_positions(12).await.unwrap();
        svc.set_account_id(13).await;
        svc.unsubscribe_all().await.unwrap();
        let tail: Vec<Call> = transport.latest().unwrap().invocations().into_iter().skip(3).collect();
        assert_eq!(
            tail,
            vec![
                Call::new("UnsubscribeAccounts", vec![]),
                Call::new("UnsubscribeOrders", vec![json!(13)]),
                Call::new("UnsubscribePositions", vec![json!(13)]),
                Call::new("UnsubscribeTrades", vec![json!(13)]),
            ]
        );
        assert!(svc.subscriptions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_subscribe_does_not_remember_account() {
        let transport = MockTransport::new();
        transport.reject("SubscribeOrders");
        let svc = service(&transport);
        svc.connect().await.unwrap();
        assert!(matches!(svc.subscribe_orders(7).await, Err(ChannelError::RemoteRejected { .. })));
        assert_eq!(svc.account_id().await, None);
        assert!(svc.subscriptions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_forgets_account_and_streams() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        svc.connect().await.unwrap();
        svc.subscribe_all(9).await.unwrap();
        svc.disconnect().await;
        assert_eq!(svc.account_id().await, None);
        assert!(svc.subscriptions().await.is_empty());
        assert!(matches!(
            svc.subscribe_accounts().await,
            Err(ChannelError::NotConnected(ConnectionState::Disconnected))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn order_push_reaches_handler() {
        let transport = MockTransport::new();
        let svc = service(&transport);
        let got = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&got);
        svc.set_order_handler(move |ev| sink.lock().unwrap().push((ev.action_kind(), ev.data.id)));
        svc.connect().await.unwrap();

        let session = transport.latest().unwrap();
        session.push(ORDER_EVENT, vec![json!({"action": 1, "data": {"id": 31.0, "accountId": 465}})]);
        session.push(ORDER_EVENT, vec![json!({"action": 1, "data": "gone"})]);
        assert_eq!(*got.lock().unwrap(), vec![(OrderAction::Update, 31)]);
    }
}
