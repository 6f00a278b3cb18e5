//! REST API client for the CMS workflow-manager endpoints.
//!
//! Paths are relative to the CMS API root (e.g. `.../Plone/++api++`). All
//! bodies are JSON. The backend is inconsistent about how it reports
//! failures: most endpoints use a non-2xx status with an `{"error": ...}`
//! body, but a few answer 200 with the same body. Both become
//! [`ApiError::Api`].

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use wfm_core::model::{State, Transition, WorkflowSummary};
use wfm_core::report::ValidationReport;

use crate::backend::WorkflowBackend;
use crate::config::ApiConfig;
use crate::error::{extract_message, ApiError};
use crate::messages::{
    AssignTypeReply, AssignTypeRequest, CreateWorkflowReply, CreateWorkflowRequest,
    DeleteStateRequest, NewState, NewTransition, SanityCheckReply, SecurityUpdateReply,
    StateDetails, StateList, TransitionDetails, TransitionList, WorkflowList,
};

/// HTTP client for one CMS site.
#[derive(Debug, Clone)]
pub struct WorkflowApi {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl WorkflowApi {
    /// Build a client from configuration, applying its request timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- workflows ----

    /// `GET /@workflows`.
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, ApiError> {
        let response = self.request(Method::GET, "/@workflows").send().await?;
        let list: WorkflowList = Self::parse_response(response).await?;
        Ok(list.workflows)
    }

    /// `POST /@workflows`, cloning `clone_from` under the display name `name`.
    pub async fn create_workflow(
        &self,
        clone_from: &str,
        name: &str,
    ) -> Result<CreateWorkflowReply, ApiError> {
        let body = CreateWorkflowRequest {
            clone_from: clone_from.to_string(),
            name: name.to_string(),
        };

        let response = self
            .request(Method::POST, "/@workflows")
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `DELETE /@workflows/{id}`.
    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/@workflows/{workflow_id}"))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// `PATCH /@workflows/{id}` with the changed fields.
    pub async fn update_workflow(&self, workflow_id: &str, changes: &Value) -> Result<(), ApiError> {
        self.patch(&format!("/@workflows/{workflow_id}"), changes).await
    }

    /// `POST /@workflows/{id}/@update-security`: recompute role mappings on
    /// existing content after security-relevant edits.
    pub async fn update_security(&self, workflow_id: &str) -> Result<SecurityUpdateReply, ApiError> {
        let response = self
            .request(Method::POST, &format!("/@workflows/{workflow_id}/@update-security"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST /@workflows/{id}/@assign` with `{type_id}`.
    pub async fn assign_type(
        &self,
        workflow_id: &str,
        type_id: &str,
    ) -> Result<AssignTypeReply, ApiError> {
        let body = AssignTypeRequest {
            type_id: type_id.to_string(),
        };

        let response = self
            .request(Method::POST, &format!("/@workflows/{workflow_id}/@assign"))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `GET /@workflows/{id}/@sanity-check`.
    pub async fn sanity_check(&self, workflow_id: &str) -> Result<ValidationReport, ApiError> {
        let response = self
            .request(Method::GET, &format!("/@workflows/{workflow_id}/@sanity-check"))
            .send()
            .await?;

        let reply: SanityCheckReply = Self::parse_response(response).await?;
        Ok(reply.errors)
    }

    // ---- states ----

    /// `GET /@states/{workflowId}`.
    pub async fn list_states(&self, workflow_id: &str) -> Result<StateList, ApiError> {
        let response = self
            .request(Method::GET, &format!("/@states/{workflow_id}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `GET /@workflows/{workflowId}/@states/{stateId}`.
    pub async fn get_state(&self, workflow_id: &str, state_id: &str) -> Result<StateDetails, ApiError> {
        let response = self
            .request(Method::GET, &format!("/@workflows/{workflow_id}/@states/{state_id}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST /@workflows/{workflowId}/@states`. Returns the created record.
    pub async fn add_state(&self, workflow_id: &str, state: &NewState) -> Result<State, ApiError> {
        let response = self
            .request(Method::POST, &format!("/@workflows/{workflow_id}/@states"))
            .json(state)
            .send()
            .await?;

        Self::parse_record(response, "state").await
    }

    /// `PATCH /@workflows/{workflowId}/@states/{stateId}`.
    pub async fn update_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError> {
        self.patch(&format!("/@workflows/{workflow_id}/@states/{state_id}"), changes)
            .await
    }

    /// `DELETE /@workflows/{workflowId}/@states/{stateId}`.
    ///
    /// A body carrying `replacement_state_id` is sent only when one is given.
    pub async fn delete_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        replacement_state_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut request = self.request(
            Method::DELETE,
            &format!("/@workflows/{workflow_id}/@states/{state_id}"),
        );
        if let Some(replacement) = replacement_state_id {
            request = request.json(&DeleteStateRequest {
                replacement_state_id: Some(replacement.to_string()),
            });
        }

        let response = request.send().await?;
        Self::check_status(response).await
    }

    // ---- transitions ----

    /// `GET /@transitions/{workflowId}`.
    pub async fn list_transitions(&self, workflow_id: &str) -> Result<TransitionList, ApiError> {
        let response = self
            .request(Method::GET, &format!("/@transitions/{workflow_id}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `GET /@transitions/{workflowId}/{transitionId}`.
    pub async fn get_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
    ) -> Result<TransitionDetails, ApiError> {
        let response = self
            .request(Method::GET, &format!("/@transitions/{workflow_id}/{transition_id}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST /@transitions/{workflowId}/{transitionId}`. Returns the created
    /// record.
    pub async fn add_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        transition: &NewTransition,
    ) -> Result<Transition, ApiError> {
        let response = self
            .request(Method::POST, &format!("/@transitions/{workflow_id}/{transition_id}"))
            .json(transition)
            .send()
            .await?;

        Self::parse_record(response, "transition").await
    }

    /// `PATCH /@transitions/{workflowId}/{transitionId}`.
    pub async fn update_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError> {
        self.patch(&format!("/@transitions/{workflow_id}/{transition_id}"), changes)
            .await
    }

    /// `DELETE /@transitions/{workflowId}/{transitionId}`.
    pub async fn delete_transition(&self, workflow_id: &str, transition_id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/@transitions/{workflow_id}/{transition_id}"))
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_url, path);
        tracing::debug!(method = %method, url = %url, "Workflow API request");

        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let response = self.request(Method::PATCH, path).json(body).send().await?;
        Self::check_status(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] carrying the
    /// backend's message on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), body = %body, "Workflow API call failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_message(status.as_u16(), &body),
                body,
            });
        }
        Ok(response)
    }

    /// Read a successful response as JSON, turning an embedded `error`
    /// field into an error. An empty body reads as `null`.
    async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
        let response = Self::ensure_success(response).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            tracing::warn!(status, error = %message, "Workflow API reported an error");
            return Err(ApiError::Api {
                status,
                message: message.to_string(),
                body,
            });
        }
        Ok(value)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let value = Self::read_json(response).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Parse a created record that may arrive bare or wrapped as
    /// `{status, <key>: record, message}`.
    async fn parse_record<T: DeserializeOwned>(
        response: reqwest::Response,
        key: &str,
    ) -> Result<T, ApiError> {
        let value = Self::read_json(response).await?;
        let record = match value {
            Value::Object(mut map) if map.get(key).is_some_and(Value::is_object) => {
                map.remove(key).unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(record).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    /// `204 No Content` is the usual reply.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::read_json(response).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowBackend for WorkflowApi {
    async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, ApiError> {
        WorkflowApi::list_workflows(self).await
    }

    async fn create_workflow(
        &self,
        clone_from: &str,
        name: &str,
    ) -> Result<CreateWorkflowReply, ApiError> {
        WorkflowApi::create_workflow(self, clone_from, name).await
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), ApiError> {
        WorkflowApi::delete_workflow(self, workflow_id).await
    }

    async fn update_workflow(&self, workflow_id: &str, changes: &Value) -> Result<(), ApiError> {
        WorkflowApi::update_workflow(self, workflow_id, changes).await
    }

    async fn update_security(&self, workflow_id: &str) -> Result<SecurityUpdateReply, ApiError> {
        WorkflowApi::update_security(self, workflow_id).await
    }

    async fn assign_type(
        &self,
        workflow_id: &str,
        type_id: &str,
    ) -> Result<AssignTypeReply, ApiError> {
        WorkflowApi::assign_type(self, workflow_id, type_id).await
    }

    async fn sanity_check(&self, workflow_id: &str) -> Result<ValidationReport, ApiError> {
        WorkflowApi::sanity_check(self, workflow_id).await
    }

    async fn list_states(&self, workflow_id: &str) -> Result<StateList, ApiError> {
        WorkflowApi::list_states(self, workflow_id).await
    }

    async fn get_state(&self, workflow_id: &str, state_id: &str) -> Result<StateDetails, ApiError> {
        WorkflowApi::get_state(self, workflow_id, state_id).await
    }

    async fn add_state(&self, workflow_id: &str, state: &NewState) -> Result<State, ApiError> {
        WorkflowApi::add_state(self, workflow_id, state).await
    }

    async fn update_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError> {
        WorkflowApi::update_state(self, workflow_id, state_id, changes).await
    }

    async fn delete_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        replacement_state_id: Option<&str>,
    ) -> Result<(), ApiError> {
        WorkflowApi::delete_state(self, workflow_id, state_id, replacement_state_id).await
    }

    async fn list_transitions(&self, workflow_id: &str) -> Result<TransitionList, ApiError> {
        WorkflowApi::list_transitions(self, workflow_id).await
    }

    async fn get_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
    ) -> Result<TransitionDetails, ApiError> {
        WorkflowApi::get_transition(self, workflow_id, transition_id).await
    }

    async fn add_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        transition: &NewTransition,
    ) -> Result<Transition, ApiError> {
        WorkflowApi::add_transition(self, workflow_id, transition_id, transition).await
    }

    async fn update_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError> {
        WorkflowApi::update_transition(self, workflow_id, transition_id, changes).await
    }

    async fn delete_transition(&self, workflow_id: &str, transition_id: &str) -> Result<(), ApiError> {
        WorkflowApi::delete_transition(self, workflow_id, transition_id).await
    }
}
