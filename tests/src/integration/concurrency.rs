//! # Concurrency Tests
//!
//! Interleavings between provider events, in-flight requests, reconnects and
//! disconnects. Late responses must never touch a session that has moved on.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;
    use wallet_session::{
        check_invariants, methods, ChainId, ConnectError, FactoryError, InMemoryProviderFactory,
        InMemoryWallet, MockProvider, MockProviderFactory, ProviderEventKind, ProviderFactory,
        SessionConfig, SignError, SwitchError, WalletProvider, WalletSession,
    };

    const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

    /// Factory whose `open` signals `entered` and then waits for `gate`.
    struct GatedFactory {
        entered: Arc<Notify>,
        gate: Arc<Notify>,
        provider: Arc<MockProvider>,
    }

    #[async_trait]
    impl ProviderFactory for GatedFactory {
        async fn open(&self) -> Result<Option<Arc<dyn WalletProvider>>, FactoryError> {
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(Some(self.provider.clone()))
        }

        fn has_cached_identity(&self) -> bool {
            false
        }

        fn clear_cached_identity(&self) {}
    }

    async fn wait_for_request(mock: &MockProvider, method: &str) {
        while mock.request_count(method) == 0 {
            tokio::task::yield_now().await;
        }
    }

    /// A signature arriving after disconnect is discarded.
    #[tokio::test]
    async fn test_late_signature_after_disconnect() {
        let mock = Arc::new(MockProvider::connected(&[ACCOUNT], "0x1"));
        mock.respond(methods::PERSONAL_SIGN, Ok(json!("0xlate")));
        let gate = mock.gate(methods::PERSONAL_SIGN);
        let factory = Arc::new(MockProviderFactory::with_provider(mock.clone()));
        let session = WalletSession::new(SessionConfig::for_testing(), factory);
        session.connect().await.unwrap();
        session.set_pending_message("hello");

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.sign().await }
        });
        wait_for_request(&mock, methods::PERSONAL_SIGN).await;
        session.disconnect();
        gate.notify_one();

        assert!(matches!(pending.await.unwrap(), Err(SignError::Superseded)));
        let state = session.state();
        assert!(state.last_signature().is_none());
        assert!(state.last_error().is_none());
        assert!(check_invariants(&state));
        assert_eq!(session.metrics().stale_discarded, 1);
    }

    /// A switch response for the old handle is dropped after a reconnect.
    #[tokio::test]
    async fn test_switch_superseded_by_reconnect() {
        let mock = Arc::new(MockProvider::connected(&[ACCOUNT], "0x1"));
        mock.respond(
            methods::SWITCH_CHAIN,
            Err(wallet_session::ProviderError::user_rejected()),
        );
        let gate = mock.gate(methods::SWITCH_CHAIN);
        let factory = Arc::new(MockProviderFactory::with_provider(mock.clone()));
        factory.push_provider(mock.clone());
        let session = WalletSession::new(SessionConfig::for_testing(), factory);
        session.connect().await.unwrap();
        session.select_network(ChainId::KOVAN);

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.switch_network().await }
        });
        wait_for_request(&mock, methods::SWITCH_CHAIN).await;
        session.connect().await.unwrap();
        gate.notify_one();

        assert!(matches!(pending.await.unwrap(), Err(SwitchError::Superseded)));
        assert!(session.state().last_error().is_none());
        assert_eq!(mock.handler_count(), 3);
    }

    /// Disconnect while the factory is still open: connect reports
    /// `Superseded` and the session stays disconnected.
    #[tokio::test]
    async fn test_connect_superseded_by_disconnect() {
        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(MockProvider::connected(&[ACCOUNT], "0x1"));
        let factory = Arc::new(GatedFactory {
            entered: entered.clone(),
            gate: gate.clone(),
            provider: provider.clone(),
        });
        let session = WalletSession::new(SessionConfig::for_testing(), factory);

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        entered.notified().await;
        session.disconnect();
        gate.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(ConnectError::Superseded)
        ));
        let state = session.state();
        assert!(!state.is_connected());
        assert!(state.last_error().is_none());
        assert_eq!(provider.handler_count(), 0);
    }

    /// Two overlapping connects: the later one wins, no duplicate handlers.
    #[tokio::test]
    async fn test_overlapping_connects() {
        let mock = Arc::new(MockProvider::connected(&[ACCOUNT], "0x1"));
        let gate = mock.gate(methods::GET_ACCOUNTS);
        let factory = Arc::new(MockProviderFactory::with_provider(mock.clone()));
        factory.push_provider(mock.clone());
        let session = WalletSession::new(SessionConfig::for_testing(), factory);

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        wait_for_request(&mock, methods::GET_ACCOUNTS).await;
        let second = tokio::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        while mock.request_count(methods::GET_ACCOUNTS) < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_waiters();

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert!(matches!(first, Err(ConnectError::Superseded)));
        assert!(second.unwrap().is_connected());
        assert_eq!(mock.handler_count(), 3);
        assert_eq!(session.metrics().connects, 1);
    }

    /// Chain events landing during a signature leave the signed pair alone.
    #[tokio::test]
    async fn test_chain_event_during_sign() {
        let mock = Arc::new(MockProvider::connected(&[ACCOUNT], "0x1"));
        mock.respond(methods::PERSONAL_SIGN, Ok(json!("0xsig")));
        let gate = mock.gate(methods::PERSONAL_SIGN);
        let factory = Arc::new(MockProviderFactory::with_provider(mock.clone()));
        let session = WalletSession::new(SessionConfig::for_testing(), factory);
        session.connect().await.unwrap();
        session.set_pending_message("hello");

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.sign().await }
        });
        wait_for_request(&mock, methods::PERSONAL_SIGN).await;
        mock.emit(ProviderEventKind::ChainChanged, json!("0x2a"));
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), "0xsig");
        let state = session.state();
        assert_eq!(state.chain_id(), Some(ChainId::KOVAN));
        assert_eq!(state.last_signed_message(), Some("hello"));
        assert_eq!(state.last_signature(), Some("0xsig"));
    }

    /// Signing on several tasks while the wallet flips networks and
    /// accounts; invariants hold throughout.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_activity_keeps_invariants() {
        let wallet = Arc::new(
            InMemoryWallet::new(&[ACCOUNT, "0x00000000000000000000000000000000000000bb"], ChainId::MAINNET)
                .with_known_chains([ChainId::KOVAN]),
        );
        let factory = Arc::new(InMemoryProviderFactory::new(wallet.clone()));
        let session = WalletSession::new(SessionConfig::for_testing(), factory);
        session.connect().await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..4 {
            let session = session.clone();
            tasks.push(tokio::spawn(async move {
                for j in 0..25 {
                    session.set_pending_message(format!("msg-{i}-{j}"));
                    let _ = session.sign().await;
                    let _ = session.verify().await;
                    assert!(check_invariants(&session.state()));
                }
            }));
        }
        let flipper = tokio::spawn({
            let wallet = wallet.clone();
            async move {
                for k in 0..50 {
                    let chain = if k % 2 == 0 { ChainId::KOVAN } else { ChainId::MAINNET };
                    wallet.switch_externally(chain);
                    tokio::task::yield_now().await;
                }
            }
        });
        for task in tasks {
            task.await.unwrap();
        }
        flipper.await.unwrap();

        let state = session.state();
        assert!(state.is_connected());
        assert!(check_invariants(&state));
        assert_eq!(state.chain_id(), Some(ChainId::MAINNET));
    }

    /// Handlers hold the session weakly, so dropping the last session clone
    /// drops the handle and its subscriptions.
    #[test]
    fn test_dropped_session_releases_handlers() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let factory = Arc::new(InMemoryProviderFactory::new(wallet.clone()));
        let session = WalletSession::new(SessionConfig::for_testing(), factory);
        tokio_test::block_on(session.connect()).unwrap();
        assert_eq!(wallet.handler_count(), 3);

        drop(session);
        assert_eq!(wallet.handler_count(), 0);
        wallet.switch_externally(ChainId::KOVAN);
        wallet.emit_disconnect();
        assert_eq!(wallet.active_chain(), ChainId::KOVAN);
    }
}
