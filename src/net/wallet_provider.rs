//! Boundary to the external wallet provider.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider owns the wallet selector UI and key material. This crate
//! only starts it, listens for account changes, asks it to sign challenge
//! messages, and signs out. Browser builds talk to a small JS shim exposed
//! as `window.crosspostWallet`; other builds report the provider as
//! unavailable so the session stays disconnected.

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::state::wallet::NetworkId;

/// Called by the provider whenever its active account changes. `None` (or
/// an empty id) means no account is signed in.
pub type AccountListener = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Future resolving to a wallet signature over a message.
pub type SignFuture = LocalBoxFuture<'static, Result<WalletSignature, ProviderError>>;

/// Signature produced by the wallet for a challenge message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSignature {
    pub public_key: String,
    pub signature: String,
}

/// Factory for live wallet handles.
pub trait WalletProvider: Send + Sync {
    /// Start the provider for `network` and begin reporting account changes
    /// to `on_account_change`. The listener may fire before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the provider cannot start.
    fn start_up(
        &self,
        network: NetworkId,
        on_account_change: AccountListener,
    ) -> Result<Box<dyn WalletHandle>, ProviderError>;
}

/// A started provider session. Dropping the handle releases it.
pub trait WalletHandle: Send {
    /// Ask the provider to show its account picker again.
    fn request_sign_in(&self);

    /// End the provider's account session.
    fn sign_out(&mut self);

    /// Sign `message` with the active account key.
    fn sign_message(&self, message: &str) -> SignFuture;
}

/// Provider used where no browser wallet exists (server rendering, native).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableWalletProvider;

impl WalletProvider for UnavailableWalletProvider {
    fn start_up(
        &self,
        network: NetworkId,
        _on_account_change: AccountListener,
    ) -> Result<Box<dyn WalletHandle>, ProviderError> {
        Err(ProviderError::new(format!("no wallet provider available for {network}")))
    }
}

/// Provider for the current build target.
pub fn default_provider() -> Arc<dyn WalletProvider> {
    #[cfg(feature = "hydrate")]
    {
        Arc::new(browser::BrowserWalletProvider)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Arc::new(UnavailableWalletProvider)
    }
}

#[cfg(feature = "hydrate")]
mod browser {
    //! `wasm-bindgen` adapter over the `window.crosspostWallet` shim.
    //!
    //! JS closures are not `Send`, so they live in a thread-local registry
    //! keyed by handle id and the handle itself stays a plain id.

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    use futures::FutureExt;
    use wasm_bindgen::JsValue;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;

    use super::{AccountListener, SignFuture, WalletHandle, WalletProvider, WalletSignature};
    use crate::error::ProviderError;
    use crate::state::wallet::NetworkId;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = crosspostWallet, js_name = startUp, catch)]
        fn js_start_up(network: &str, on_account_change: &Closure<dyn FnMut(JsValue)>) -> Result<(), JsValue>;

        #[wasm_bindgen(js_namespace = crosspostWallet, js_name = requestSignIn)]
        fn js_request_sign_in();

        #[wasm_bindgen(js_namespace = crosspostWallet, js_name = signOut)]
        fn js_sign_out();

        #[wasm_bindgen(js_namespace = crosspostWallet, js_name = signMessage, catch)]
        fn js_sign_message(message: &str) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = crosspostWallet, js_name = tearDown)]
        fn js_tear_down();
    }

    thread_local! {
        static LISTENERS: RefCell<HashMap<u64, Closure<dyn FnMut(JsValue)>>> = RefCell::new(HashMap::new());
    }

    static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

    const SHIM_GLOBAL: &str = "crosspostWallet";

    /// Calling into a missing namespace throws, so check first.
    fn shim_installed() -> bool {
        web_sys::window()
            .is_some_and(|window| js_sys::Reflect::has(&window, &JsValue::from_str(SHIM_GLOBAL)).unwrap_or(false))
    }

    fn js_error(value: &JsValue) -> ProviderError {
        ProviderError::new(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserWalletProvider;

    impl WalletProvider for BrowserWalletProvider {
        fn start_up(
            &self,
            network: NetworkId,
            on_account_change: AccountListener,
        ) -> Result<Box<dyn WalletHandle>, ProviderError> {
            if !shim_installed() {
                return Err(ProviderError::new("no wallet extension found"));
            }
            let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            let closure = Closure::<dyn FnMut(JsValue)>::new(move |account: JsValue| {
                on_account_change(account.as_string());
            });
            js_start_up(network.as_str(), &closure).map_err(|e| js_error(&e))?;
            LISTENERS.with(|listeners| listeners.borrow_mut().insert(id, closure));
            log::debug!("wallet shim started: handle={id} network={network}");
            Ok(Box::new(BrowserWalletHandle { id }))
        }
    }

    struct BrowserWalletHandle {
        id: u64,
    }

    impl WalletHandle for BrowserWalletHandle {
        fn request_sign_in(&self) {
            js_request_sign_in();
        }

        fn sign_out(&mut self) {
            js_sign_out();
        }

        fn sign_message(&self, message: &str) -> SignFuture {
            let promise = js_sign_message(message);
            async move {
                let promise = promise.map_err(|e| js_error(&e))?;
                let value = JsFuture::from(promise).await.map_err(|e| js_error(&e))?;
                let json = js_sys::JSON::stringify(&value)
                    .map_err(|e| js_error(&e))?
                    .as_string()
                    .ok_or_else(|| ProviderError::new("wallet returned a non-string signature"))?;
                serde_json::from_str::<WalletSignature>(&json)
                    .map_err(|e| ProviderError::new(format!("malformed wallet signature: {e}")))
            }
            .boxed_local()
        }
    }

    impl Drop for BrowserWalletHandle {
        fn drop(&mut self) {
            js_tear_down();
            LISTENERS.with(|listeners| listeners.borrow_mut().remove(&self.id));
            log::debug!("wallet shim released: handle={}", self.id);
        }
    }
}
