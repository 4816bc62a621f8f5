use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::Router;
use axum_server::Handle;

use crate::error::ApiResult;

/// Plain-http listener for the entity api.
pub struct HttpServer {
    addr: SocketAddr,
    handle: Handle,
}

impl HttpServer {
    const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

    #[must_use]
    pub fn http(listen_addr: Ipv4Addr, listen_port: u16) -> Self {
        Self {
            addr: SocketAddr::from((listen_addr, listen_port)),
            handle: Handle::new(),
        }
    }

    /// Handle for stopping the server from another task.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub async fn run(self, router: Router) -> ApiResult<()> {
        log::info!("Opening listen port on {}", self.addr);
        axum_server::bind(self.addr)
            .handle(self.handle)
            .serve(router.into_make_service())
            .await?;
        log::info!("Stopped server {}", self.addr);
        Ok(())
    }

    pub fn signal_stop(handle: &Handle) {
        handle.graceful_shutdown(Some(Self::SHUTDOWN_GRACE));
    }
}
