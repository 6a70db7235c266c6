use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::Config;
use crate::quiz::{Answer, Attempt, AttemptId, QuestionId, Quiz, QuizId};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("resource not found")]
    NotFound,
    #[error("quiz service responded with status {0}")]
    Status(StatusCode),
    #[error("quiz service sent a response the bot cannot use: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    /// Every variant means "unavailable" to the session apart from the two checks below.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound)
    }

    /// The service answered, but the payload does not decode. Retrying will not help.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ServiceError::Malformed(_))
    }
}

/// Reply to `POST /attempts`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedAttempt {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub user_id: u64,
}

/// The quiz-storage operations the bot relies on. No retries happen at this layer.
#[async_trait]
pub trait QuizService: Send + Sync {
    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ServiceError>;

    async fn create_attempt(
        &self,
        quiz_id: QuizId,
        user_id: u64,
    ) -> Result<CreatedAttempt, ServiceError>;

    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<Attempt, ServiceError>;

    async fn submit_answer(
        &self,
        attempt_id: AttemptId,
        question_id: QuestionId,
        answer_text: &str,
    ) -> Result<Answer, ServiceError>;

    async fn complete_attempt(&self, attempt_id: AttemptId) -> Result<Attempt, ServiceError>;
}

#[derive(Serialize)]
struct NewAttempt {
    quiz_id: QuizId,
    user_id: u64,
}

#[derive(Serialize)]
struct NewAnswer<'a> {
    question_id: QuestionId,
    answer_text: &'a str,
}

#[derive(Clone)]
pub struct HttpQuizClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpQuizClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound);
        }
        if !status.is_success() {
            return Err(ServiceError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.timeout)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ServiceError> {
        let mut request = self.client.post(self.url(path)).timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl QuizService for HttpQuizClient {
    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ServiceError> {
        self.get(&format!("/quizzes/{}", quiz_id))
            .await
            .map_err(|e| {
                error!("Error getting quiz {}: {}", quiz_id, e);
                e
            })
    }

    async fn create_attempt(
        &self,
        quiz_id: QuizId,
        user_id: u64,
    ) -> Result<CreatedAttempt, ServiceError> {
        self.post("/attempts", Some(&NewAttempt { quiz_id, user_id }))
            .await
            .map_err(|e| {
                error!(
                    "Error creating attempt for quiz {} (user {}): {}",
                    quiz_id, user_id, e
                );
                e
            })
    }

    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<Attempt, ServiceError> {
        self.get(&format!("/attempts/{}", attempt_id))
            .await
            .map_err(|e| {
                error!("Error getting attempt {}: {}", attempt_id, e);
                e
            })
    }

    async fn submit_answer(
        &self,
        attempt_id: AttemptId,
        question_id: QuestionId,
        answer_text: &str,
    ) -> Result<Answer, ServiceError> {
        let body = NewAnswer {
            question_id,
            answer_text,
        };
        self.post(&format!("/attempts/{}/answers", attempt_id), Some(&body))
            .await
            .map_err(|e| {
                error!(
                    "Error submitting answer to question {} (attempt {}): {}",
                    question_id, attempt_id, e
                );
                e
            })
    }

    async fn complete_attempt(&self, attempt_id: AttemptId) -> Result<Attempt, ServiceError> {
        self.post::<(), _>(&format!("/attempts/{}/complete", attempt_id), None)
            .await
            .map_err(|e| {
                error!("Error completing attempt {}: {}", attempt_id, e);
                e
            })
    }
}
