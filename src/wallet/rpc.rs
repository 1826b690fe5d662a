use crate::wallet::{WalletError, WalletProvider, USER_REJECTED_CODE};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Wallet bridge reached over HTTP JSON-RPC (e.g. a locally running wallet
/// that exposes the injected-provider methods).
///
/// The client carries no global timeout: `eth_requestAccounts` waits for as
/// long as the user takes to answer the prompt. Only `eth_accounts` polls are
/// bounded.
pub struct JsonRpcWallet {
    client: Client,
    url: String,
    next_id: Arc<AtomicU64>,
    changes: broadcast::Sender<Option<String>>,
    poll_timeout: Duration,
    poll_interval: Duration,
    poller_started: Arc<AtomicBool>,
}

impl JsonRpcWallet {
    pub fn new(
        url: String,
        poll_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, WalletError> {
        let client = Client::builder()
            .build()
            .map_err(|err| WalletError::Unavailable(format!("failed to build http client: {err}")))?;
        let (changes, _) = broadcast::channel(16);

        Ok(Self {
            client,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
            changes,
            poll_timeout,
            poll_interval,
            poller_started: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn call(
        client: &Client,
        url: &str,
        id: u64,
        method: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<String>, WalletError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params: Vec::new(),
        };

        let mut builder = client.post(url).json(&request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| WalletError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(WalletError::Unavailable(format!(
                "wallet bridge answered {}",
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| WalletError::Unavailable(format!("malformed rpc response: {err}")))?;
        decode_accounts(body)
    }

    fn spawn_account_poller(&self) {
        if self
            .poller_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                warn!("account poller not started, no tokio runtime: {err}");
                self.poller_started.store(false, Ordering::SeqCst);
                return;
            }
        };

        let client = self.client.clone();
        let url = self.url.clone();
        let next_id = Arc::clone(&self.next_id);
        let changes = self.changes.clone();
        let started = Arc::clone(&self.poller_started);
        let poll_timeout = Some(self.poll_timeout);
        let poll_interval = self.poll_interval;

        handle.spawn(async move {
            let mut ticker = time::interval(poll_interval);
            let id = next_id.fetch_add(1, Ordering::SeqCst);
            let mut last_account =
                seed_baseline(Self::call(&client, &url, id, "eth_accounts", poll_timeout).await);

            loop {
                ticker.tick().await;
                if changes.receiver_count() == 0 {
                    debug!("account poller stopping, no subscribers left");
                    started.store(false, Ordering::SeqCst);
                    break;
                }

                let id = next_id.fetch_add(1, Ordering::SeqCst);
                let polled = Self::call(&client, &url, id, "eth_accounts", poll_timeout).await;
                if let Some(current) = next_change(&mut last_account, polled) {
                    info!("wallet account changed");
                    let _ = changes.send(current);
                }
            }
        });
    }
}

/// Account seen before any change is reported. A failed first read counts as
/// no account.
fn seed_baseline(polled: Result<Vec<String>, WalletError>) -> Option<String> {
    polled.ok().and_then(|accounts| accounts.into_iter().next())
}

/// One poll tick: returns the new active account when it differs from `last`.
/// Transient failures are skipped without touching `last`.
fn next_change(
    last: &mut Option<String>,
    polled: Result<Vec<String>, WalletError>,
) -> Option<Option<String>> {
    let current = match polled {
        Ok(accounts) => accounts.into_iter().next(),
        Err(WalletError::NoAccounts) => None,
        Err(err) => {
            debug!("eth_accounts poll failed: {err}");
            return None;
        }
    };

    if current == *last {
        return None;
    }
    *last = current.clone();
    Some(current)
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<String, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let accounts =
            Self::call(&self.client, &self.url, id, "eth_requestAccounts", None).await?;
        accounts.into_iter().next().ok_or(WalletError::NoAccounts)
    }

    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<String>> {
        let receiver = self.changes.subscribe();
        self.spawn_account_poller();
        receiver
    }
}

fn decode_accounts(response: RpcResponse) -> Result<Vec<String>, WalletError> {
    if let Some(error) = response.error {
        if error.code == USER_REJECTED_CODE {
            return Err(WalletError::Rejected);
        }
        return Err(WalletError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let Some(result) = response.result else {
        return Err(WalletError::Unavailable(
            "rpc response carried neither result nor error".to_string(),
        ));
    };

    let accounts: Vec<String> = serde_json::from_value(result)
        .map_err(|err| WalletError::Unavailable(format!("unexpected accounts payload: {err}")))?;
    if accounts.is_empty() {
        return Err(WalletError::NoAccounts);
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::{decode_accounts, next_change, seed_baseline, JsonRpcWallet, RpcResponse};
    use crate::wallet::{WalletError, WalletProvider};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time;

    fn parse(raw: &str) -> RpcResponse {
        serde_json::from_str(raw).expect("rpc fixture should parse")
    }

    #[test]
    fn decode_accounts_returns_result_array() {
        let accounts = decode_accounts(parse(
            r#"{"jsonrpc":"2.0","id":1,"result":["0xAbC","0xdef"]}"#,
        ))
        .expect("accounts should decode");
        assert_eq!(accounts, vec!["0xAbC".to_string(), "0xdef".to_string()]);
    }

    #[test]
    fn decode_accounts_maps_4001_to_rejection() {
        let error = decode_accounts(parse(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#,
        ))
        .expect_err("rejection should fail");
        assert_eq!(error, WalletError::Rejected);
    }

    #[test]
    fn decode_accounts_keeps_other_rpc_errors() {
        let error = decode_accounts(parse(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"Request already pending"}}"#,
        ))
        .expect_err("rpc error should fail");
        assert!(matches!(error, WalletError::Rpc { code: -32002, .. }));
    }

    #[test]
    fn decode_accounts_reports_empty_list() {
        let error = decode_accounts(parse(r#"{"jsonrpc":"2.0","id":1,"result":[]}"#))
            .expect_err("empty list should fail");
        assert_eq!(error, WalletError::NoAccounts);
    }

    fn accounts(list: &[&str]) -> Result<Vec<String>, WalletError> {
        Ok(list.iter().map(|account| account.to_string()).collect())
    }

    #[test]
    fn baseline_is_first_account_or_none() {
        assert_eq!(seed_baseline(accounts(&["0xaa", "0xbb"])), Some("0xaa".to_string()));
        assert_eq!(seed_baseline(Err(WalletError::NoAccounts)), None);
        assert_eq!(
            seed_baseline(Err(WalletError::Unavailable("refused".to_string()))),
            None
        );
    }

    #[test]
    fn unchanged_account_is_not_reported() {
        let mut last = Some("0xaa".to_string());
        assert_eq!(next_change(&mut last, accounts(&["0xaa"])), None);
        assert_eq!(last.as_deref(), Some("0xaa"));
    }

    #[test]
    fn switched_account_is_reported_once() {
        let mut last = Some("0xaa".to_string());
        assert_eq!(
            next_change(&mut last, accounts(&["0xbb"])),
            Some(Some("0xbb".to_string()))
        );
        assert_eq!(next_change(&mut last, accounts(&["0xbb"])), None);
    }

    #[test]
    fn locked_wallet_reports_no_account() {
        let mut last = Some("0xaa".to_string());
        assert_eq!(next_change(&mut last, Err(WalletError::NoAccounts)), Some(None));
        assert_eq!(last, None);
        assert_eq!(next_change(&mut last, Err(WalletError::NoAccounts)), None);
    }

    #[test]
    fn transient_poll_failures_are_skipped() {
        let mut last = Some("0xaa".to_string());
        let failure = Err(WalletError::Unavailable("connection reset".to_string()));
        assert_eq!(next_change(&mut last, failure), None);
        assert_eq!(last.as_deref(), Some("0xaa"));

        let rpc_failure = Err(WalletError::Rpc {
            code: -32603,
            message: "internal error".to_string(),
        });
        assert_eq!(next_change(&mut last, rpc_failure), None);
        assert_eq!(last.as_deref(), Some("0xaa"));
    }

    async fn silent_bridge() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        (url, task)
    }

    #[tokio::test]
    async fn approval_prompt_is_not_cut_off_by_poll_timeout() {
        let (url, bridge) = silent_bridge().await;
        let wallet = JsonRpcWallet::new(url, Duration::from_millis(100), Duration::from_millis(500))
            .expect("client should build");

        let pending = time::timeout(Duration::from_millis(600), wallet.request_accounts()).await;
        assert!(pending.is_err(), "approval wait ended early: {pending:?}");

        bridge.abort();
    }

    #[tokio::test]
    async fn account_polls_give_up_after_poll_timeout() {
        let (url, bridge) = silent_bridge().await;
        let wallet = JsonRpcWallet::new(url, Duration::from_millis(100), Duration::from_millis(500))
            .expect("client should build");

        let polled = time::timeout(
            Duration::from_secs(5),
            JsonRpcWallet::call(
                &wallet.client,
                &wallet.url,
                1,
                "eth_accounts",
                Some(wallet.poll_timeout),
            ),
        )
        .await
        .expect("poll should time out on its own");
        assert!(matches!(polled, Err(WalletError::Unavailable(_))));

        bridge.abort();
    }
}
