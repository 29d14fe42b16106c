//! Model API client abstraction (grounds the agent/simulator task
//! service's calls the way the teacher's `PricingApiClient` grounds its
//! pricing fetchers): one `async_trait` boundary, one retry policy
//! applied at the call site, never inside the client itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use workflow_engine_core::config::AgentModelConfig;
use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::ids::AgentId;

/// A model call that must return schema-shaped JSON (function-calling
/// or an explicit parse-and-validate fallback, per §9's "structured
/// model output" redesign flag).
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn structured_call(&self, agent_id: AgentId, prompt: &str) -> Result<Value>;

    /// A free-form text reply, used for the simulator's strong-model turn.
    async fn free_form_call(&self, agent_id: AgentId, prompt: &str) -> Result<String>;

    fn is_configured(&self, agent_id: AgentId) -> bool;
}

/// Test/offline double that always reports unconfigured, forcing every
/// call site onto its heuristic fallback path.
#[derive(Debug, Default)]
pub struct UnconfiguredAgentClient;

#[async_trait]
impl AgentClient for UnconfiguredAgentClient {
    async fn structured_call(&self, agent_id: AgentId, _prompt: &str) -> Result<Value> {
        Err(WorkflowError::transient(format!("agent {agent_id} has no credential configured")))
    }

    async fn free_form_call(&self, agent_id: AgentId, _prompt: &str) -> Result<String> {
        Err(WorkflowError::transient(format!("agent {agent_id} has no credential configured")))
    }

    fn is_configured(&self, _agent_id: AgentId) -> bool {
        false
    }
}

/// Chat-completion client backed by a real model API, one credential
/// per agent id (§external interface: `AGENT_MODEL_*` environment
/// layout). Mirrors the teacher's `OpenAIStreamingProvider`: a shared
/// `reqwest::Client`, a bearer token taken from the resolved
/// credential, and the request/response shape left un-abstracted since
/// every supported provider here speaks the OpenAI-compatible
/// chat-completions wire format.
pub struct ReqwestAgentClient {
    http: Arc<reqwest::Client>,
    agents: AgentModelConfig,
}

impl ReqwestAgentClient {
    pub fn new(http: Arc<reqwest::Client>, agents: AgentModelConfig) -> Self {
        Self { http, agents }
    }

    fn credential(&self, agent_id: AgentId) -> Result<&workflow_engine_core::config::AgentCredential> {
        self.agents
            .credentials
            .get(&agent_id.to_string())
            .ok_or_else(|| WorkflowError::validation(format!("agent {agent_id} has no credential configured")))
    }

    async fn chat_completion(&self, agent_id: AgentId, prompt: &str, json_mode: bool) -> Result<Value> {
        let credential = self.credential(agent_id)?;
        let base_url = credential.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
        let url = format!("{base_url}/chat/completions");

        let mut body = json!({
            "model": &credential.provider,
            "messages": [{"role": "user", "content": prompt}],
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", credential.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| WorkflowError::ApiError { message: format!("model API request failed: {err}") })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::ApiError { message: format!("model API error: {status} - {error_body}") });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| WorkflowError::ApiError { message: format!("model API response was not valid JSON: {err}") })
    }

    fn extract_message(response: &Value) -> Result<&str> {
        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| WorkflowError::data_parse("model API response had no choices[0].message.content"))
    }
}

#[async_trait]
impl AgentClient for ReqwestAgentClient {
    async fn structured_call(&self, agent_id: AgentId, prompt: &str) -> Result<Value> {
        let response = self.chat_completion(agent_id, prompt, true).await?;
        let content = Self::extract_message(&response)?;
        serde_json::from_str(content).map_err(|err| WorkflowError::data_parse(format!("model reply was not valid JSON: {err}")))
    }

    async fn free_form_call(&self, agent_id: AgentId, prompt: &str) -> Result<String> {
        let response = self.chat_completion(agent_id, prompt, false).await?;
        Self::extract_message(&response).map(str::to_string)
    }

    fn is_configured(&self, agent_id: AgentId) -> bool {
        self.agents.credentials.contains_key(&agent_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_engine_core::config::AgentCredential;

    fn client_with_one_credential(agent_id: AgentId) -> ReqwestAgentClient {
        let mut credentials = std::collections::HashMap::new();
        credentials.insert(
            agent_id.to_string(),
            AgentCredential { provider: "gpt-4o-mini".into(), api_key: "sk-test".into(), base_url: None },
        );
        ReqwestAgentClient::new(Arc::new(reqwest::Client::new()), AgentModelConfig { credentials })
    }

    #[test]
    fn is_configured_reflects_the_credential_map() {
        let agent_id = AgentId::new();
        let client = client_with_one_credential(agent_id);
        assert!(client.is_configured(agent_id));
        assert!(!client.is_configured(AgentId::new()));
    }

    #[tokio::test]
    async fn uncredentialed_agent_fails_fast_without_a_network_call() {
        let client = client_with_one_credential(AgentId::new());
        let err = client.structured_call(AgentId::new(), "hello").await.unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationError { .. }));
    }

    #[test]
    fn extract_message_reads_the_chat_completion_shape() {
        let response = json!({"choices": [{"message": {"content": "hi there"}}]});
        assert_eq!(ReqwestAgentClient::extract_message(&response).unwrap(), "hi there");
    }

    #[test]
    fn extract_message_rejects_a_missing_content_field() {
        let response = json!({"choices": []});
        let err = ReqwestAgentClient::extract_message(&response).unwrap_err();
        assert!(matches!(err, WorkflowError::DataParseError { .. }));
    }
}
