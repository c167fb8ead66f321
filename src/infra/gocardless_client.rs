use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

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

const GOCARDLESS_VERSION: &str = "2015-07-06";

/// GoCardless direct-debit subscriptions client.
///
/// The customer reference passed in is the mandate ID.
pub struct GoCardlessClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

#[derive(Debug, Serialize)]
struct Envelope<T> {
    subscriptions: T,
}

#[derive(Debug, Serialize)]
struct NewSubscription<'a> {
    amount: i64,
    currency: &'a str,
    interval_unit: &'a str,
    /// First charge after the trial.
    start_date: NaiveDate,
    links: NewSubscriptionLinks<'a>,
    metadata: SubscriptionMetadata,
}

#[derive(Debug, Serialize)]
struct NewSubscriptionLinks<'a> {
    mandate: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscriptionMetadata {
    user_id: String,
    plan_id: String,
}

#[derive(Debug, Serialize)]
struct SubscriptionUpdate<'a> {
    amount: i64,
    metadata: PlanOnlyMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PlanOnlyMetadata<'a> {
    plan_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    subscriptions: GoCardlessSubscription,
}

#[derive(Debug, Deserialize)]
struct GoCardlessSubscription {
    id: String,
}

impl GoCardlessClient {
    pub fn new(client: Client, environment: PaymentEnvironment, access_token: SecretString) -> Self {
        Self {
            client,
            base_url: PaymentProvider::GoCardless
                .api_base(environment)
                .to_string(),
            access_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .header("GoCardless-Version", GOCARDLESS_VERSION)
    }
}

fn new_subscription<'a>(
    request: &'a CreateSubscriptionRequest,
    today: NaiveDate,
) -> NewSubscription<'a> {
    NewSubscription {
        amount: request.plan.price_cents,
        currency: request.plan.currency,
        interval_unit: request.plan.interval.to_interval_unit(),
        start_date: today + Duration::days(request.trial_days),
        links: NewSubscriptionLinks {
            mandate: request.customer_id.as_str(),
        },
        metadata: SubscriptionMetadata {
            user_id: request.user_id.to_string(),
            plan_id: request.plan.id.to_string(),
        },
    }
}

#[async_trait]
impl PaymentProviderPort for GoCardlessClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::GoCardless
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> AppResult<ProviderSubscription> {
        let body = Envelope {
            subscriptions: new_subscription(request, Utc::now().date_naive()),
        };
        let response = self
            .request(reqwest::Method::POST, "/subscriptions")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::GoCardless, e))?;
        let created: SubscriptionResponse =
            handle_response(PaymentProvider::GoCardless, response).await?;

        Ok(ProviderSubscription {
            subscription_id: SubscriptionId::new(created.subscriptions.id),
            customer_id: CustomerId::new(request.customer_id.as_str()),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/subscriptions/{subscription_id}/actions/cancel"),
            )
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::GoCardless, e))?;
        expect_success(PaymentProvider::GoCardless, response).await
    }

    async fn change_plan(&self, subscription_id: &SubscriptionId, plan: &Plan) -> AppResult<()> {
        let body = Envelope {
            subscriptions: SubscriptionUpdate {
                amount: plan.price_cents,
                metadata: PlanOnlyMetadata { plan_id: plan.id },
            },
        };
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/subscriptions/{subscription_id}"),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(PaymentProvider::GoCardless, e))?;
        expect_success(PaymentProvider::GoCardless, response).await
    }
}
