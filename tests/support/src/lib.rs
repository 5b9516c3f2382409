//! Test utilities.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

use anyhow::Result;
use axum_server::Handle;
use custodia_helper::{HelperConfig, HelperServer, HelperService};
use custodia_types::{csprng, HelperIdentity};
use rand::RngCore;
use std::{net::SocketAddr, sync::Arc, thread};
use tokio::sync::oneshot;
use url::Url;

mod network;

pub use listener::RecordingListener;
pub use network::{Behavior, MockNetwork};

const ADDR: &str = "127.0.0.1:0";

/// Initialize a tracing subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "debug,hyper=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().without_time())
        .try_init();
}

/// Identity of a helper with a random public key.
pub fn helper_identity(name: &str, address: Url) -> Result<HelperIdentity> {
    let mut public_key = vec![0u8; 32];
    csprng().fill_bytes(&mut public_key);
    let contact: Url = format!("mailto:{}@example.com", name).parse()?;
    Ok(HelperIdentity::new(name, contact, address, public_key)?)
}

/// Convert a socket address to a URL.
fn socket_addr_url(addr: &SocketAddr) -> Result<Url> {
    Ok(format!("http://{}:{}/", addr.ip(), addr.port()).parse()?)
}

/// Helper server running on a separate thread.
pub struct TestHelper {
    /// Identity addressing the helper.
    pub identity: HelperIdentity,
    /// Service answering requests.
    pub service: Arc<HelperService>,
    handle: Handle,
}

impl Drop for TestHelper {
    fn drop(&mut self) {
        tracing::info!(helper = %self.identity.name(), "shutdown test helper");
        self.handle.shutdown();
    }
}

/// Spawn a helper server listening on an ephemeral port.
pub async fn spawn_helper(config: HelperConfig) -> Result<TestHelper> {
    let server = HelperServer::from_config(&config);
    let service = Arc::clone(server.service());
    let handle = Handle::new();
    let listen_handle = handle.clone();
    let addr: SocketAddr = ADDR.parse()?;

    let (tx, rx) = oneshot::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            if let Some(addr) = listen_handle.listening().await {
                tracing::info!("helper has started {:#?}", addr);
                tx.send(addr)
                    .expect("failed to send listening notification");
            }
        });
    });

    let server_handle = handle.clone();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            server
                .start(addr, server_handle)
                .await
                .expect("failed to start helper");
        });
    });

    let addr = rx.await?;
    Ok(TestHelper {
        identity: helper_identity(&config.name, socket_addr_url(&addr)?)?,
        service,
        handle,
    })
}
