//! Process-wide fetch stub slot.
//!
//! Code under test takes its fetch capability either as an injected
//! `Arc<dyn Fetch>` or through the free [`fetch`] function, which routes
//! through whatever stub is currently installed.

use crate::error::{FetchError, Result};
use crate::response::FetchResponse;
use crate::server::RequestOptions;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Something that can answer fetch calls.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str, options: RequestOptions) -> Result<FetchResponse>;
}

static INSTALLED: RwLock<Option<Arc<dyn Fetch>>> = RwLock::new(None);

/// Install a stub, removing any stub installed before it.
pub fn install(stub: Arc<dyn Fetch>) {
    let mut slot = INSTALLED.write().unwrap_or_else(PoisonError::into_inner);
    if slot.take().is_some() {
        debug!("Restored previously installed fetch stub");
    }
    *slot = Some(stub);
    debug!("Fetch stub installed");
}

/// Install a stub until the returned guard is dropped.
pub fn install_scoped(stub: Arc<dyn Fetch>) -> InstallGuard {
    install(stub.clone());
    InstallGuard { stub }
}

/// Remove the installed stub. Returns whether one was installed.
pub fn uninstall() -> bool {
    let removed = INSTALLED
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some();
    if removed {
        debug!("Fetch stub uninstalled");
    }
    removed
}

pub fn is_installed() -> bool {
    INSTALLED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// The currently installed stub, if any.
pub fn installed() -> Option<Arc<dyn Fetch>> {
    INSTALLED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Fetch through the installed stub.
pub async fn fetch(url: &str, options: RequestOptions) -> Result<FetchResponse> {
    let stub = installed().ok_or(FetchError::NotInstalled)?;
    stub.fetch(url, options).await
}

/// Uninstalls its stub on drop, unless another stub replaced it meanwhile.
#[must_use = "the stub is uninstalled when the guard is dropped"]
pub struct InstallGuard {
    stub: Arc<dyn Fetch>,
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        let mut slot = INSTALLED.write().unwrap_or_else(PoisonError::into_inner);
        let ours = slot
            .as_ref()
            .is_some_and(|current| same_stub(current, &self.stub));
        if ours {
            *slot = None;
            debug!("Fetch stub uninstalled");
        }
    }
}

fn same_stub(a: &Arc<dyn Fetch>, b: &Arc<dyn Fetch>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
