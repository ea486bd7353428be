use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::{
    config::ClientConfig,
    entry::is_local_id,
    error::ClientError,
    session::{Session, StoredCredentials},
};
use crate::models::{
    AuthResponse, CreateTask, Credentials, ErrorBody, MessageResponse, PublicUser, Task, TaskPage,
    UpdateTask,
};

pub type ApiResult<T> = Result<T, ClientError>;

/// The task endpoints the list controller depends on.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self, page: u32, limit: u32) -> ApiResult<TaskPage>;
    async fn create(&self, title: &str) -> ApiResult<Task>;
    async fn update(&self, id: &str, changes: &UpdateTask) -> ApiResult<Task>;
    async fn delete(&self, id: &str) -> ApiResult<MessageResponse>;
}

/// HTTP client for the to-do service.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> ApiResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<PublicUser> {
        self.authenticate("/api/auth/login", email, password).await
    }

    pub async fn register(&self, email: &str, password: &str) -> ApiResult<PublicUser> {
        self.authenticate("/api/auth/register", email, password).await
    }

    pub fn logout(&self) -> ApiResult<()> {
        self.session.sign_out()
    }

    async fn authenticate(&self, path: &str, email: &str, password: &str) -> ApiResult<PublicUser> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.send(self.client.post(self.url(path)).json(&body)).await?;
        let user = response.user.clone();
        self.session.sign_in(StoredCredentials::from(response))?;
        tracing::info!(user_id = user.id, "signed in");
        Ok(user)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn note_url(&self, id: &str) -> ApiResult<String> {
        if is_local_id(id) {
            return Err(ClientError::LocalId(id.to_string()));
        }
        Ok(self.url(&format!("/api/notes/{id}")))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> ApiResult<T> {
        self.send(request.json(body)).await
    }

    async fn parse_response<T: DeserializeOwned>(&self, response: Response) -> ApiResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("server rejected the session, signing out");
            self.session.force_logout();
            return Err(ClientError::Unauthorized);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());

        if status == StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(message))
        } else {
            Err(ClientError::Status { status, message })
        }
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list(&self, page: u32, limit: u32) -> ApiResult<TaskPage> {
        let request = self
            .client
            .get(self.url("/api/notes"))
            .query(&[("page", page), ("limit", limit)]);
        self.send(request).await
    }

    async fn create(&self, title: &str) -> ApiResult<Task> {
        let body = CreateTask {
            title: title.to_string(),
            completed: false,
        };
        self.send_json(self.client.post(self.url("/api/notes")), &body)
            .await
    }

    async fn update(&self, id: &str, changes: &UpdateTask) -> ApiResult<Task> {
        let url = self.note_url(id)?;
        self.send_json(self.client.put(url), changes).await
    }

    async fn delete(&self, id: &str) -> ApiResult<MessageResponse> {
        let url = self.note_url(id)?;
        self.send(self.client.delete(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_ids_never_reach_the_network() {
        // Nothing listens on this port; a request would fail with a transport error instead.
        let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        let api = ApiClient::new(&config, Arc::new(Session::in_memory())).unwrap();

        let err = api.delete("local-1234").await.unwrap_err();
        assert!(matches!(err, ClientError::LocalId(id) if id == "local-1234"));

        let err = api
            .update("local-1234", &UpdateTask::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::LocalId(_)));
    }
}
