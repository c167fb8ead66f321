use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::PaymentProviderPort,
    domain::entities::payment_provider::PaymentProvider,
};

/// Provider clients constructed once at startup, looked up per request.
///
/// Providers without credentials are simply absent; asking for one is an
/// internal error rather than a silent no-op.
#[derive(Default, Clone)]
pub struct PaymentProviderRegistry {
    providers: HashMap<PaymentProvider, Arc<dyn PaymentProviderPort>>,
}

impl PaymentProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, port: Arc<dyn PaymentProviderPort>) -> Self {
        self.providers.insert(port.provider(), port);
        self
    }

    pub fn get(&self, provider: PaymentProvider) -> AppResult<Arc<dyn PaymentProviderPort>> {
        self.providers.get(&provider).cloned().ok_or_else(|| {
            AppError::Internal(format!(
                "{} credentials are not configured",
                provider.display_name()
            ))
        })
    }

    pub fn is_configured(&self, provider: PaymentProvider) -> bool {
        self.providers.contains_key(&provider)
    }
}
