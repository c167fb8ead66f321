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

const SQUARE_VERSION: &str = "2024-06-04";

/// Square Subscriptions API client.
pub struct SquareClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
    location_id: String,
}

#[derive(Debug, Serialize)]
struct CreateSubscriptionBody<'a> {
    idempotency_key: String,
    location_id: &'a str,
    plan_variation_id: &'a str,
    customer_id: &'a str,
    /// Echoed back on webhooks so the subscription can be tied to our user.
    reference_id: String,
}

#[derive(Debug, Serialize)]
struct SwapPlanBody<'a> {
    new_plan_variation_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    subscription: SquareSubscription,
}

#[derive(Debug, Deserialize)]
struct SquareSubscription {
    id: String,
    customer_id: String,
}

impl SquareClient {
    pub fn new(
        client: Client,
        environment: PaymentEnvironment,
        access_token: SecretString,
        location_id: String,
    ) -> Self {
        Self {
            client,
            base_url: PaymentProvider::Square.api_base(environment).to_string(),
            access_token,
            location_id,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .header("Square-Version", SQUARE_VERSION)
    }
}

#[async_trait]
impl PaymentProviderPort for SquareClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Square
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> AppResult<ProviderSubscription> {
        // Square runs the trial through the plan variation's free first phase.
        let body = CreateSubscriptionBody {
            idempotency_key: Uuid::new_v4().to_string(),
            location_id: &self.location_id,
            plan_variation_id: request.plan.square_plan_variation_id,
            customer_id: request.customer_id.as_str(),
            reference_id: request.user_id.to_string(),
        };
        let response = self
            .post("/subscriptions")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::Square, e))?;
        let created: SubscriptionResponse =
            handle_response(PaymentProvider::Square, response).await?;

        Ok(ProviderSubscription {
            subscription_id: SubscriptionId::new(created.subscription.id),
            customer_id: CustomerId::new(created.subscription.customer_id),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()> {
        let response = self
            .post(&format!("/subscriptions/{subscription_id}/cancel"))
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::Square, e))?;
        expect_success(PaymentProvider::Square, response).await
    }

    async fn change_plan(&self, subscription_id: &SubscriptionId, plan: &Plan) -> AppResult<()> {
        let response = self
            .post(&format!("/subscriptions/{subscription_id}/swap-plan"))
            .json(&SwapPlanBody {
                new_plan_variation_id: plan.square_plan_variation_id,
            })
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::Square, e))?;
        expect_success(PaymentProvider::Square, response).await
    }
}
