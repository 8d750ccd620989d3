//! `estate loan-ledger` / `estate escrow-ledger`.
//!
//! Configuration comes from the environment (see
//! [`estate_api::state`]); flags given on the command line override it.

use anyhow::Context;
use axum::Router;
use clap::Args;
use estate_api::middleware::metrics::ApiMetrics;
use estate_api::{
    escrow_app, loan_app, EscrowAppState, EscrowServiceConfig, LoanAppState, LoanServiceConfig,
};
use estate_loan_client::LoanClientConfig;
use tokio::net::TcpListener;
use zeroize::Zeroizing;

/// Flags shared by both services.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Host name or IP address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Do not expose /metrics or record request metrics.
    #[arg(long)]
    pub no_metrics: bool,
}

/// `estate loan-ledger` flags.
#[derive(Args, Debug, Clone, Default)]
pub struct LoanLedgerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Admin credential accepted in `X-Admin-Key`.
    #[arg(long)]
    pub admin_key: Option<String>,
}

/// `estate escrow-ledger` flags.
#[derive(Args, Debug, Clone, Default)]
pub struct EscrowLedgerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Agent credential accepted in `X-Agent-Key`.
    #[arg(long)]
    pub agent_key: Option<String>,

    /// Base URL of the loan ledger.
    #[arg(long)]
    pub loan_ledger_url: Option<String>,

    /// Timeout of one loan status query, in seconds.
    #[arg(long)]
    pub loan_ledger_timeout_secs: Option<u64>,
}

impl LoanLedgerArgs {
    /// Apply flags on top of an environment-derived config.
    pub fn merge_into(&self, mut config: LoanServiceConfig) -> LoanServiceConfig {
        if let Some(port) = self.common.port {
            config.port = port;
        }
        if let Some(key) = &self.admin_key {
            config.admin_key = Zeroizing::new(key.clone());
        }
        if self.common.no_metrics {
            config.metrics_enabled = false;
        }
        config
    }
}

impl EscrowLedgerArgs {
    /// Apply flags on top of an environment-derived config.
    pub fn merge_into(
        &self,
        mut config: EscrowServiceConfig,
    ) -> anyhow::Result<EscrowServiceConfig> {
        if let Some(port) = self.common.port {
            config.port = port;
        }
        if let Some(key) = &self.agent_key {
            config.agent_key = Zeroizing::new(key.clone());
        }
        if let Some(url) = &self.loan_ledger_url {
            config.loan_ledger = LoanClientConfig::new(url)
                .with_context(|| format!("invalid --loan-ledger-url {url:?}"))?
                .with_timeout_secs(config.loan_ledger.timeout_secs);
        }
        if let Some(secs) = self.loan_ledger_timeout_secs {
            anyhow::ensure!(secs > 0, "--loan-ledger-timeout-secs must be positive");
            config.loan_ledger.timeout_secs = secs;
        }
        if self.common.no_metrics {
            config.metrics_enabled = false;
        }
        Ok(config)
    }
}

/// Run the loan ledger until Ctrl-C.
pub async fn run_loan_ledger(args: &LoanLedgerArgs) -> anyhow::Result<()> {
    let env = LoanServiceConfig::from_env().context("loading loan ledger configuration")?;
    let config = args.merge_into(env);
    tracing::debug!(?config, "loan ledger configuration");

    let metrics = config.metrics_enabled.then(ApiMetrics::new);
    let app = loan_app(LoanAppState::from_config(&config), metrics);
    serve("loan ledger", &args.common.host, config.port, app).await
}

/// Run the escrow ledger until Ctrl-C.
pub async fn run_escrow_ledger(args: &EscrowLedgerArgs) -> anyhow::Result<()> {
    let env = EscrowServiceConfig::from_env().context("loading escrow ledger configuration")?;
    let config = args.merge_into(env)?;
    tracing::debug!(?config, "escrow ledger configuration");

    let metrics = config.metrics_enabled.then(ApiMetrics::new);
    let state = EscrowAppState::from_config(&config, metrics.as_ref())
        .context("building loan ledger client")?;
    tracing::info!(
        loan_ledger = %config.loan_ledger.base_url,
        timeout_secs = config.loan_ledger.timeout_secs,
        "loan ledger client configured"
    );
    let app = escrow_app(state, metrics);
    serve("escrow ledger", &args.common.host, config.port, app).await
}

/// Bind `host` and `port`. `host` may be a name (`localhost`) or a bare
/// IPv4/IPv6 literal (`::`); every resolved address is tried in turn.
async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding {host} port {port}"))
}

async fn serve(name: &str, host: &str, port: u16, app: Router) -> anyhow::Result<()> {
    let listener = bind(host, port).await?;
    tracing::info!("{name} listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("{name} stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_flags_override_environment() {
        let args = LoanLedgerArgs {
            common: CommonArgs {
                port: Some(6000),
                host: "127.0.0.1".into(),
                no_metrics: true,
            },
            admin_key: Some("0xadmin".into()),
        };
        let config = args.merge_into(LoanServiceConfig::default());
        assert_eq!(config.port, 6000);
        assert_eq!(config.admin_key.as_str(), "0xadmin");
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn absent_flags_keep_environment() {
        let config = LoanLedgerArgs::default().merge_into(LoanServiceConfig::default());
        assert_eq!(config.port, 5000);
        assert!(config.metrics_enabled);
    }

    fn escrow_env() -> EscrowServiceConfig {
        EscrowServiceConfig {
            port: 5001,
            agent_key: Zeroizing::new("0xagent".into()),
            loan_ledger: LoanClientConfig::new("http://localhost:5000")
                .unwrap()
                .with_timeout_secs(7),
            metrics_enabled: true,
        }
    }

    #[test]
    fn escrow_url_override_keeps_timeout() {
        let args = EscrowLedgerArgs {
            loan_ledger_url: Some("http://loans.internal:8000".into()),
            ..Default::default()
        };
        let config = args.merge_into(escrow_env()).unwrap();
        assert_eq!(config.loan_ledger.base_url.as_str(), "http://loans.internal:8000/");
        assert_eq!(config.loan_ledger.timeout_secs, 7);
        assert_eq!(config.agent_key.as_str(), "0xagent");
    }

    #[test]
    fn escrow_rejects_bad_overrides() {
        let bad_url = EscrowLedgerArgs {
            loan_ledger_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(bad_url.merge_into(escrow_env()).is_err());

        let zero_timeout = EscrowLedgerArgs {
            loan_ledger_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(zero_timeout.merge_into(escrow_env()).is_err());
    }

    #[tokio::test]
    async fn binds_host_names() {
        let listener = bind("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());

        let listener = bind("127.0.0.1", 0).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn bare_ipv6_host_resolves() {
        let addrs: Vec<_> = tokio::net::lookup_host(("::", 5001)).await.unwrap().collect();
        assert_eq!(addrs.len(), 1);
        assert!(addrs[0].is_ipv6());
        assert_eq!(addrs[0].port(), 5001);
    }

    #[tokio::test]
    async fn unresolvable_host_is_an_error() {
        let err = bind("no such host", 0).await.unwrap_err();
        assert!(err.to_string().contains("no such host"), "{err:#}");
    }
}
