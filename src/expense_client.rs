use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, warn};

use crate::config::ExpenseServiceConfig;
use crate::error::AppError;
use crate::schemas::{Expense, UserId};

pub type DynExpenseSource = Arc<dyn ExpenseSource + Send + Sync>;

/// The service that owns expense records.
#[async_trait]
pub trait ExpenseSource {
    /// Every expense belonging to `user_id`. An empty list is a valid answer.
    async fn list_expenses(&self, user_id: UserId) -> Result<Vec<Expense>, AppError>;
}

#[derive(Debug, Clone)]
pub struct HttpExpenseSource {
    client: Client,
    config: ExpenseServiceConfig,
}

impl HttpExpenseSource {
    pub fn new(config: ExpenseServiceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url_for(&self, user_id: UserId) -> String {
        format!("{}/{}", self.config.base_url, user_id)
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<Expense>, AppError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus { status, body });
        }

        let bytes = response.bytes().await?;
        // The expense service encodes "no rows" as a JSON null.
        let expenses: Option<Vec<Expense>> = serde_json::from_slice(&bytes)?;
        Ok(expenses.unwrap_or_default())
    }
}

#[async_trait]
impl ExpenseSource for HttpExpenseSource {
    #[tracing::instrument(skip(self))]
    async fn list_expenses(&self, user_id: UserId) -> Result<Vec<Expense>, AppError> {
        let url = self.url_for(user_id);
        let mut attempt = 0;
        loop {
            debug!(%url, attempt, "fetching expenses");
            match self.fetch_once(&url).await {
                Ok(expenses) => {
                    debug!(count = expenses.len(), "fetched expenses");
                    return Ok(expenses);
                }
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay = self
                        .config
                        .retry_backoff
                        .saturating_mul(2u32.saturating_pow(attempt));
                    warn!(error = %err, attempt, ?delay, "expense service call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if let AppError::UpstreamStatus { body, .. } = &err {
                        error!(error = %err, %body, "expense service call failed");
                    } else {
                        error!(error = %err, "expense service call failed");
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, max_retries: u32) -> HttpExpenseSource {
        HttpExpenseSource::new(ExpenseServiceConfig {
            base_url: format!("{}/expenses", server.uri()),
            timeout: Duration::from_millis(500),
            max_retries,
            retry_backoff: Duration::from_millis(1),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn parses_snake_case_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/expenses/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "user_id": 7, "category": "food", "amount": 10.5},
                {"id": 2, "user_id": 7, "category": "rent", "amount": 800.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let expenses = source_for(&server, 0).list_expenses(7).await.unwrap();
        assert_eq!(
            expenses,
            vec![
                Expense {
                    id: 1,
                    user_id: 7,
                    category: "food".to_string(),
                    amount: 10.5,
                },
                Expense {
                    id: 2,
                    user_id: 7,
                    category: "rent".to_string(),
                    amount: 800.0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn accepts_camel_case_user_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/expenses/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 9, "userId": 3, "category": "fuel", "amount": -2.0}
            ])))
            .mount(&server)
            .await;

        let expenses = source_for(&server, 0).list_expenses(3).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].user_id, 3);
        assert_eq!(expenses[0].amount, -2.0);
    }

    #[tokio::test]
    async fn null_body_means_no_expenses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/expenses/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null\n"))
            .mount(&server)
            .await;

        let expenses = source_for(&server, 0).list_expenses(42).await.unwrap();
        assert!(expenses.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"oops\": true}"))
            .expect(1)
            .mount(&server)
            .await;

        let err = source_for(&server, 3).list_expenses(1).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn retries_server_errors_up_to_the_bound() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = source_for(&server, 2).list_expenses(1).await.unwrap_err();
        match err {
            AppError::UpstreamStatus { status, .. } => {
                assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn recovers_after_a_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let expenses = source_for(&server, 1).list_expenses(5).await.unwrap();
        assert!(expenses.is_empty());
    }

    #[tokio::test]
    async fn retries_after_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(2)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 4, "user_id": 8, "category": "books", "amount": 12.0}
            ])))
            .mount(&server)
            .await;

        let expenses = source_for(&server, 1).list_expenses(8).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].category, "books");
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid user ID"))
            .expect(1)
            .mount(&server)
            .await;

        let err = source_for(&server, 3).list_expenses(1).await.unwrap_err();
        match err {
            AppError::UpstreamStatus { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert_eq!(body, "Invalid user ID");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = source_for(&server, 0).list_expenses(1).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamTimeout));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_error() {
        let source = HttpExpenseSource::new(ExpenseServiceConfig {
            base_url: "http://127.0.0.1:1/expenses".to_string(),
            timeout: Duration::from_millis(500),
            max_retries: 0,
            retry_backoff: Duration::from_millis(1),
        })
        .unwrap();

        let err = source.list_expenses(1).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::UpstreamTransport(_) | AppError::UpstreamTimeout
        ));
    }
}
