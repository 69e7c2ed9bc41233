//! # Session Flow Tests
//!
//! End-to-end scenarios driving `WalletSession` through its public API.
//!
//! ## Flows Tested:
//!
//! 1. **Connect / disconnect**: state populated, then reset to the empty form
//! 2. **Signing**: signed pair stored together, declines leave it untouched
//! 3. **Verification**: case-insensitive signer comparison
//! 4. **Network switching**: direct switch and the add-chain fallback
//! 5. **Provider events**: accounts, chain and disconnect notifications
//! 6. **Resume**: automatic reconnect only with a remembered wallet

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use wallet_session::{
        check_invariants, methods, Address, ChainId, ConnectionStatus, InMemoryProviderFactory,
        InMemoryWallet, MockProvider, MockProviderFactory, ProviderError, ProviderEventKind,
        SessionConfig, SessionOperation, SessionState, SignError, SwitchError, SwitchOutcome,
        VerifyError, WalletSession, WalletSessionApi,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const ACCOUNT: &str = "0xABCdef0000000000000000000000000000000abc";

    fn wallet_session(wallet: Arc<InMemoryWallet>) -> WalletSession {
        let factory = Arc::new(InMemoryProviderFactory::new(wallet));
        WalletSession::new(SessionConfig::for_testing(), factory)
    }

    fn mock_session(mock: Arc<MockProvider>) -> (WalletSession, Arc<MockProviderFactory>) {
        let factory = Arc::new(MockProviderFactory::with_provider(mock));
        (
            WalletSession::new(SessionConfig::for_testing(), factory.clone()),
            factory,
        )
    }

    async fn connected_mock() -> (WalletSession, Arc<MockProvider>) {
        let mock = Arc::new(MockProvider::connected(&[ACCOUNT], "0x1"));
        let (session, _) = mock_session(mock.clone());
        session.connect().await.unwrap();
        (session, mock)
    }

    // =============================================================================
    // CONNECT / DISCONNECT
    // =============================================================================

    /// Connected after connect, empty after disconnect.
    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let session = wallet_session(wallet.clone());

        for _ in 0..3 {
            let state = session.connect().await.unwrap();
            assert_eq!(state.connection(), ConnectionStatus::Connected);

            session.disconnect();
            let state = session.state();
            assert_eq!(state.connection(), ConnectionStatus::Disconnected);
            assert!(state.account().is_none());
            assert!(state.chain_id().is_none());
            assert!(check_invariants(&state));
        }
        assert_eq!(wallet.handler_count(), 0);
    }

    /// accounts=["0xABCdef..."], network 1 populate the session as returned.
    #[tokio::test]
    async fn test_connect_populates_account_and_chain() {
        let (session, _mock) = connected_mock().await;
        let state = session.state();
        assert_eq!(state.account().map(Address::as_str), Some(ACCOUNT));
        assert_eq!(state.chain_id(), Some(ChainId::MAINNET));
        assert_eq!(state.connection(), ConnectionStatus::Connected);
    }

    /// A failing factory leaves the session disconnected with an error.
    #[tokio::test]
    async fn test_connect_failure_surfaces_error() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let factory = Arc::new(InMemoryProviderFactory::new(wallet));
        factory.refuse_next(wallet_session::FactoryError::Refused(
            ProviderError::user_rejected(),
        ));
        let session = WalletSession::new(SessionConfig::for_testing(), factory);

        assert!(session.connect().await.is_err());
        let state = session.state();
        assert_eq!(state.connection(), ConnectionStatus::Disconnected);
        let record = state.last_error().unwrap();
        assert_eq!(record.operation, SessionOperation::Connect);
        assert_eq!(record.code, Some(ProviderError::USER_REJECTED));

        // Retry succeeds and keeps the error until dismissed.
        assert!(session.connect().await.is_ok());
        session.clear_error();
        assert!(session.state().last_error().is_none());
    }

    // =============================================================================
    // SIGNING AND VERIFICATION
    // =============================================================================

    /// setPendingMessage("hello"), sign -> "0xsig1".
    #[tokio::test]
    async fn test_sign_scenario() {
        let (session, mock) = connected_mock().await;
        mock.respond(methods::PERSONAL_SIGN, Ok(json!("0xsig1")));

        session.set_pending_message("hello");
        session.sign().await.unwrap();

        let state = session.state();
        assert_eq!(state.last_signed_message(), Some("hello"));
        assert_eq!(state.last_signature(), Some("0xsig1"));
        assert_eq!(state.verification_result(), None);
    }

    /// Recovered "0xabcdef..." vs account "0xABCDEF..." verifies.
    #[tokio::test]
    async fn test_verify_scenario() {
        let upper = "0xABCDEF0000000000000000000000000000000ABC";
        let mock = Arc::new(MockProvider::connected(&[upper], "0x1"));
        mock.respond(methods::PERSONAL_SIGN, Ok(json!("0xsig1")));
        mock.respond(
            methods::RECOVER_SIGNER,
            Ok(json!(upper.to_lowercase())),
        );
        let (session, _) = mock_session(mock);
        session.connect().await.unwrap();
        session.set_pending_message("hello");
        session.sign().await.unwrap();

        assert!(session.verify().await.unwrap());
        assert_eq!(session.state().verification_result(), Some(true));
    }

    /// The in-memory wallet signs and recovers end to end.
    #[tokio::test]
    async fn test_sign_and_verify_with_wallet() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let session = wallet_session(wallet);
        session.connect().await.unwrap();

        session.set_pending_message("gm");
        let signature = session.sign().await.unwrap();
        assert!(signature.starts_with("0x"));
        assert!(session.verify().await.unwrap());

        // Editing the message clears the result but not the signed pair.
        session.set_pending_message("gn");
        let state = session.state();
        assert_eq!(state.verification_result(), None);
        assert_eq!(state.last_signed_message(), Some("gm"));
        assert!(state.can_verify());
    }

    /// A declined signature is a normal outcome; the session stays usable.
    #[tokio::test]
    async fn test_declined_signature_then_retry() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        wallet.reject_next(methods::PERSONAL_SIGN, ProviderError::user_rejected());
        let session = wallet_session(wallet);
        session.connect().await.unwrap();
        session.set_pending_message("hello");

        assert!(matches!(session.sign().await, Err(SignError::Declined(_))));
        let state = session.state();
        assert!(state.is_connected());
        assert!(state.last_signature().is_none());
        assert_eq!(state.last_error().unwrap().code, Some(4001));

        assert!(session.sign().await.is_ok());
        assert_eq!(session.state().last_signed_message(), Some("hello"));
    }

    /// Verify without an account fails before reaching the provider.
    #[tokio::test]
    async fn test_verify_without_account() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let session = wallet_session(wallet.clone());
        session.connect().await.unwrap();
        session.set_pending_message("hello");
        session.sign().await.unwrap();

        wallet.set_accounts(&[]);
        let before = wallet.requests().len();
        assert!(matches!(
            session.verify().await,
            Err(VerifyError::NoActiveAccount)
        ));
        assert_eq!(wallet.requests().len(), before);
    }

    // =============================================================================
    // NETWORK SWITCHING
    // =============================================================================

    /// Switch with nothing selected sends nothing.
    #[tokio::test]
    async fn test_switch_without_selection() {
        let (session, mock) = connected_mock().await;
        let before = mock.requests().len();
        assert_eq!(session.switch_network().await.unwrap(), SwitchOutcome::Skipped);
        assert_eq!(mock.requests().len(), before);
        assert!(!session.state().can_switch_network());
    }

    /// select 4, switch rejected with 4902, add-chain fails: desired stays 4.
    #[tokio::test]
    async fn test_switch_add_chain_failure_scenario() {
        let (session, mock) = connected_mock().await;
        mock.respond(
            methods::SWITCH_CHAIN,
            Err(ProviderError::unrecognized_chain(ChainId::RINKEBY)),
        );
        mock.respond(
            methods::ADD_CHAIN,
            Err(ProviderError::new(ProviderError::INTERNAL, "rpc unreachable")),
        );

        session.select_network(ChainId::RINKEBY);
        let err = session.switch_network().await.unwrap_err();
        assert!(matches!(err, SwitchError::AddChainFailed { .. }));

        let (_, params) = mock
            .requests()
            .into_iter()
            .find(|(m, _)| m == methods::ADD_CHAIN)
            .unwrap();
        let expected = serde_json::to_value(session.chains().get(ChainId::RINKEBY).unwrap())
            .unwrap();
        assert_eq!(params, Value::Array(vec![expected]));

        let state = session.state();
        assert_eq!(state.desired_chain_id(), Some(ChainId::RINKEBY));
        assert_eq!(state.chain_id(), Some(ChainId::MAINNET));
        let record = state.last_error().unwrap();
        assert_eq!(record.operation, SessionOperation::SwitchNetwork);
        assert_eq!(record.code, Some(ProviderError::INTERNAL));
    }

    /// The in-memory wallet learns Celo through the fallback and switches.
    #[tokio::test]
    async fn test_switch_add_chain_success_with_wallet() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let session = wallet_session(wallet.clone());
        session.connect().await.unwrap();

        session.select_network(ChainId::CELO);
        let outcome = session.switch_network().await.unwrap();
        assert_eq!(outcome, SwitchOutcome::AddedAndRequested(ChainId::CELO));
        assert!(wallet.knows_chain(ChainId::CELO));
        assert_eq!(wallet.active_chain(), ChainId::CELO);
        assert_eq!(session.state().chain_id(), Some(ChainId::CELO));
        assert_eq!(
            wallet.requests(),
            vec![
                methods::GET_ACCOUNTS,
                methods::GET_CHAIN_ID,
                methods::SWITCH_CHAIN,
                methods::ADD_CHAIN,
                methods::SWITCH_CHAIN,
            ]
        );

        // Second time the wallet knows the chain.
        session.select_network(ChainId::MAINNET);
        session.switch_network().await.unwrap();
        session.select_network(ChainId::CELO);
        assert_eq!(
            session.switch_network().await.unwrap(),
            SwitchOutcome::Requested(ChainId::CELO)
        );
    }

    /// Chains from configuration feed the add-chain fallback.
    #[tokio::test]
    async fn test_switch_to_configured_chain() {
        let polygon = wallet_session::TomlChainTable::parse(
            r#"
            [[chains]]
            chain_id = 137
            name = "Polygon Mainnet"
            currency_name = "MATIC"
            currency_symbol = "MATIC"
            rpc_urls = ["https://polygon-rpc.com"]
            "#,
        )
        .unwrap();
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let factory = Arc::new(InMemoryProviderFactory::new(wallet.clone()));
        let config = SessionConfig::for_testing().with_extra_chains(polygon.into_chains());
        let session = WalletSession::new(config, factory);
        session.connect().await.unwrap();

        session.select_network(ChainId(137));
        assert_eq!(
            session.switch_network().await.unwrap(),
            SwitchOutcome::AddedAndRequested(ChainId(137))
        );
        assert_eq!(session.state().chain_id(), Some(ChainId(137)));
    }

    // =============================================================================
    // PROVIDER EVENTS
    // =============================================================================

    /// accounts-changed([]) unsets the account but keeps the connection.
    #[tokio::test]
    async fn test_accounts_changed_empty() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let session = wallet_session(wallet.clone());
        session.connect().await.unwrap();

        wallet.set_accounts(&[]);
        let state = session.state();
        assert_eq!(state.connection(), ConnectionStatus::Connected);
        assert!(state.account().is_none());
        assert!(!state.can_sign());
    }

    /// A wallet-side network change reaches the session.
    #[tokio::test]
    async fn test_external_chain_change() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let session = wallet_session(wallet.clone());
        session.connect().await.unwrap();

        wallet.switch_externally(ChainId::HARMONY);
        assert_eq!(session.state().chain_id(), Some(ChainId::HARMONY));
    }

    /// The disconnect event runs the full disconnect path.
    #[tokio::test]
    async fn test_disconnect_event() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let factory = Arc::new(InMemoryProviderFactory::new(wallet.clone()));
        let session = WalletSession::new(SessionConfig::for_testing(), factory.clone());
        session.connect().await.unwrap();
        session.set_pending_message("draft");

        wallet.emit_disconnect();
        assert_eq!(session.state(), SessionState::new());
        assert_eq!(wallet.handler_count(), 0);
        assert!(!wallet_session::ProviderFactory::has_cached_identity(
            factory.as_ref()
        ));
    }

    /// A mock disconnect payload without fields is still a disconnect.
    #[tokio::test]
    async fn test_disconnect_event_without_payload() {
        let (session, mock) = connected_mock().await;
        mock.emit(ProviderEventKind::Disconnect, Value::Null);
        assert_eq!(session.state().connection(), ConnectionStatus::Disconnected);
    }

    // =============================================================================
    // RESUME
    // =============================================================================

    /// Startup resume only with a remembered wallet.
    #[tokio::test]
    async fn test_resume_after_first_connect() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::KOVAN));
        let factory = Arc::new(InMemoryProviderFactory::new(wallet.clone()));

        let first = WalletSession::new(SessionConfig::for_testing(), factory.clone());
        assert!(first.try_resume().await.unwrap().is_none());
        first.connect().await.unwrap();

        // A new session (next page load) resumes without a prompt.
        let second = WalletSession::new(SessionConfig::for_testing(), factory.clone());
        let state = second.try_resume().await.unwrap().unwrap();
        assert_eq!(state.chain_id(), Some(ChainId::KOVAN));

        // After an explicit disconnect nothing is remembered.
        second.disconnect();
        let third = WalletSession::new(SessionConfig::for_testing(), factory);
        assert!(third.try_resume().await.unwrap().is_none());
    }

    /// The session is usable through the inbound port trait object.
    #[tokio::test]
    async fn test_flow_through_api_trait() {
        let wallet = Arc::new(InMemoryWallet::new(&[ACCOUNT], ChainId::MAINNET));
        let api: Arc<dyn WalletSessionApi> = Arc::new(wallet_session(wallet));

        api.connect().await.unwrap();
        api.set_pending_message("via trait".to_string());
        api.sign().await.unwrap();
        assert!(api.verify().await.unwrap());
        api.disconnect();
        assert_eq!(api.state().connection(), ConnectionStatus::Disconnected);
    }
}
