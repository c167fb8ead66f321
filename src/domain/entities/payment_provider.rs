use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Payment provider - the processor a subscription is billed through
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentProvider {
    /// Card-based subscriptions
    Square,
    /// Direct-debit subscriptions
    #[strum(serialize = "gocardless")]
    #[serde(rename = "gocardless")]
    #[sqlx(rename = "gocardless")]
    GoCardless,
    /// Checkout API
    Checkout,
}

/// How the signature header value encodes the raw HMAC bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    Hex,
    Base64,
}

impl PaymentProvider {
    /// Human-readable display name for the provider
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentProvider::Square => "Square",
            PaymentProvider::GoCardless => "GoCardless",
            PaymentProvider::Checkout => "Checkout.com",
        }
    }

    /// Header carrying the webhook HMAC-SHA256 signature
    pub fn signature_header(&self) -> &'static str {
        match self {
            PaymentProvider::Square => "x-square-hmacsha256-signature",
            PaymentProvider::GoCardless => "webhook-signature",
            PaymentProvider::Checkout => "cko-signature",
        }
    }

    pub fn signature_encoding(&self) -> SignatureEncoding {
        match self {
            PaymentProvider::Square => SignatureEncoding::Base64,
            PaymentProvider::GoCardless | PaymentProvider::Checkout => SignatureEncoding::Hex,
        }
    }

    /// Base URL of the provider's REST API for the given environment
    pub fn api_base(&self, env: PaymentEnvironment) -> &'static str {
        match (self, env) {
            (PaymentProvider::Square, PaymentEnvironment::Sandbox) => {
                "https://connect.squareupsandbox.com/v2"
            }
            (PaymentProvider::Square, PaymentEnvironment::Production) => {
                "https://connect.squareup.com/v2"
            }
            (PaymentProvider::GoCardless, PaymentEnvironment::Sandbox) => {
                "https://api-sandbox.gocardless.com"
            }
            (PaymentProvider::GoCardless, PaymentEnvironment::Production) => {
                "https://api.gocardless.com"
            }
            (PaymentProvider::Checkout, PaymentEnvironment::Sandbox) => {
                "https://api.sandbox.checkout.com"
            }
            (PaymentProvider::Checkout, PaymentEnvironment::Production) => {
                "https://api.checkout.com"
            }
        }
    }

    /// All integrated providers
    pub fn all() -> &'static [PaymentProvider] {
        &[
            PaymentProvider::Square,
            PaymentProvider::GoCardless,
            PaymentProvider::Checkout,
        ]
    }
}

/// Provider environment - sandbox or production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaymentEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PaymentEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, PaymentEnvironment::Production)
    }
}
