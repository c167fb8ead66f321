use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::http_client::{expect_success, handle_response, send_error};
use crate::{
    app_error::AppResult,
    application::ports::payment_provider::{
        CreateSubscriptionRequest, CustomerId, PaymentProviderPort, ProviderSubscription,
        SubscriptionId,
    },
    domain::entities::{
        payment_provider::{PaymentEnvironment, PaymentProvider},
        plan::Plan,
    },
};

/// Checkout.com subscriptions client.
pub struct CheckoutClient {
    client: Client,
    base_url: String,
    secret_key: SecretString,
}

#[derive(Debug, Serialize)]
struct CreateSubscriptionBody<'a> {
    customer_id: &'a str,
    plan_id: &'a str,
    amount: i64,
    currency: &'a str,
    trial_days: i64,
    /// Echoed back on webhooks.
    user_id: Uuid,
}

#[derive(Debug, Serialize)]
struct UpdateSubscriptionBody<'a> {
    plan_id: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    id: String,
    customer_id: Option<String>,
}

impl CheckoutClient {
    pub fn new(client: Client, environment: PaymentEnvironment, secret_key: SecretString) -> Self {
        Self {
            client,
            base_url: PaymentProvider::Checkout.api_base(environment).to_string(),
            secret_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
    }
}

#[async_trait]
impl PaymentProviderPort for CheckoutClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Checkout
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> AppResult<ProviderSubscription> {
        let body = CreateSubscriptionBody {
            customer_id: request.customer_id.as_str(),
            plan_id: request.plan.id,
            amount: request.plan.price_cents,
            currency: request.plan.currency,
            trial_days: request.trial_days,
            user_id: request.user_id,
        };
        let response = self
            .request(reqwest::Method::POST, "/subscriptions")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::Checkout, e))?;
        let created: SubscriptionResponse =
            handle_response(PaymentProvider::Checkout, response).await?;

        Ok(ProviderSubscription {
            subscription_id: SubscriptionId::new(created.id),
            customer_id: CustomerId::new(
                created
                    .customer_id
                    .unwrap_or_else(|| request.customer_id.0.clone()),
            ),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/subscriptions/{subscription_id}/cancel"),
            )
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::Checkout, e))?;
        expect_success(PaymentProvider::Checkout, response).await
    }

    async fn change_plan(&self, subscription_id: &SubscriptionId, plan: &Plan) -> AppResult<()> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/subscriptions/{subscription_id}"),
            )
            .json(&UpdateSubscriptionBody {
                plan_id: plan.id,
                amount: plan.price_cents,
            })
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::Checkout, e))?;
        expect_success(PaymentProvider::Checkout, response).await
    }
}
