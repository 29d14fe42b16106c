//! Simulator task (§4.6): a "learner" (weak model) consults a bound
//! "expert" (strong model) as a bounded conversation. The round loop is
//! a pure state machine over an injected [`AgentClient`]; the task
//! service persists the outcome onto the task row (simplified from the
//! original's dedicated session/message tables -- see DESIGN.md).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use workflow_engine_core::error::retry::{retry_with_policy, RetryPolicy};
use workflow_engine_core::ids::AgentId;

use crate::client::AgentClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorStatus {
    Active,
    Completed,
    Interrupted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecision {
    DirectSubmit,
    ConsultComplete,
    WeakModelTerminated,
    MaxRoundsReached,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Weak,
    Strong,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorMessage {
    pub round: u32,
    pub speaker: Speaker,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorSession {
    pub weak_model: AgentId,
    pub strong_model: AgentId,
    pub max_rounds: u32,
    pub current_round: u32,
    pub status: SimulatorStatus,
    pub final_decision: Option<FinalDecision>,
    pub messages: Vec<SimulatorMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    DirectSubmit,
    ConversationResult,
}

/// Terminal bookkeeping row (§4.6 "Persist... an execution result row").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorExecutionResult {
    pub execution_type: ExecutionType,
    pub result_data: Option<Value>,
    pub confidence: Option<f64>,
    pub total_rounds: u32,
    pub decision_reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorOutcome {
    pub session: SimulatorSession,
    pub execution_result: SimulatorExecutionResult,
}

#[derive(Debug, Deserialize)]
struct Round0Decision {
    need_conversation: bool,
    content: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RoundDecisionKind {
    SubmitResult,
    ContinueConversation,
    Terminate,
}

#[derive(Debug, Deserialize)]
struct RoundDecision {
    decision: RoundDecisionKind,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    confidence: f64,
}

/// Deterministic heuristic for when the weak model's structured call
/// fails (§4.6 failure policy): short, low-complexity task descriptions
/// are submitted directly; everything else opens a conversation with a
/// fixed clarification question.
fn heuristic_round0(task_description: &str) -> Round0Decision {
    const COMPLEXITY_KEYWORDS: &[&str] = &["analyze", "compare", "design", "architecture", "evaluate", "investigate"];
    let lower = task_description.to_lowercase();
    let is_complex = COMPLEXITY_KEYWORDS.iter().any(|kw| lower.contains(kw));
    let is_short = task_description.split_whitespace().count() <= 12;

    if is_short && !is_complex {
        Round0Decision {
            need_conversation: false,
            content: format!("Best-effort direct answer: {task_description}"),
            confidence: 0.4,
            reasoning: "heuristic fallback: short, low-complexity task submitted directly".into(),
        }
    } else {
        Round0Decision {
            need_conversation: true,
            content: "Could you clarify the scope, constraints, and desired output format?".into(),
            confidence: 0.2,
            reasoning: "heuristic fallback: task length/complexity warrants a clarification round".into(),
        }
    }
}

fn heuristic_round_decision(current_round: u32, max_rounds: u32) -> RoundDecision {
    if current_round >= max_rounds {
        RoundDecision { decision: RoundDecisionKind::Terminate, content: None, confidence: 0.1 }
    } else {
        RoundDecision {
            decision: RoundDecisionKind::ContinueConversation,
            content: Some("Can you narrow down the requirement further?".into()),
            confidence: 0.2,
        }
    }
}

pub struct SimulatorEngine {
    client: Arc<dyn AgentClient>,
    retry_policy: RetryPolicy,
}

impl SimulatorEngine {
    pub fn new(client: Arc<dyn AgentClient>, retry_policy: RetryPolicy) -> Self {
        Self { client, retry_policy }
    }

    async fn weak_round0(&self, weak_model: AgentId, task_description: &str) -> Round0Decision {
        let prompt = format!(
            "Decide whether you need a conversation with an expert to complete this task. \
             Respond with JSON {{need_conversation, content, confidence, reasoning}}.\n\nTask: {task_description}"
        );
        match self.client.structured_call(weak_model, &prompt).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|_| heuristic_round0(task_description)),
            Err(_) => heuristic_round0(task_description),
        }
    }

    async fn strong_reply(&self, strong_model: AgentId, last_message: &str) -> String {
        let prompt = format!("Respond to the learner's message as the domain expert:\n\n{last_message}");
        retry_with_policy(&self.retry_policy, || self.client.free_form_call(strong_model, &prompt))
            .await
            .unwrap_or_else(|_| "No response available from the expert model.".to_string())
    }

    async fn weak_round_decision(&self, weak_model: AgentId, current_round: u32, max_rounds: u32, conversation: &str) -> RoundDecision {
        let prompt = format!(
            "Given the conversation so far, decide to submit_result, continue_conversation, or terminate. \
             Respond with JSON {{decision, content, confidence}}.\n\nConversation:\n{conversation}"
        );
        match self.client.structured_call(weak_model, &prompt).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|_| heuristic_round_decision(current_round, max_rounds)),
            Err(_) => heuristic_round_decision(current_round, max_rounds),
        }
    }

    /// Runs the full bounded conversation (§4.6 round-0 decision + round
    /// loop) and returns the persisted session plus execution result.
    pub async fn run(&self, weak_model: AgentId, strong_model: AgentId, max_rounds: u32, task_description: &str) -> SimulatorOutcome {
        let round0 = self.weak_round0(weak_model, task_description).await;

        if !round0.need_conversation {
            let session = SimulatorSession {
                weak_model,
                strong_model,
                max_rounds,
                current_round: 0,
                status: SimulatorStatus::Completed,
                final_decision: Some(FinalDecision::DirectSubmit),
                messages: vec![SimulatorMessage { round: 0, speaker: Speaker::Weak, content: round0.content.clone() }],
            };
            let execution_result = SimulatorExecutionResult {
                execution_type: ExecutionType::DirectSubmit,
                result_data: Some(json!(round0.content)),
                confidence: Some(round0.confidence),
                total_rounds: 0,
                decision_reasoning: round0.reasoning,
            };
            return SimulatorOutcome { session, execution_result };
        }

        let mut messages = vec![SimulatorMessage { round: 0, speaker: Speaker::Weak, content: round0.content.clone() }];
        let mut current_round = 0u32;

        loop {
            let last_weak_message = messages.last().unwrap().content.clone();
            let strong_message = self.strong_reply(strong_model, &last_weak_message).await;
            messages.push(SimulatorMessage { round: current_round, speaker: Speaker::Strong, content: strong_message });

            let conversation = messages.iter().map(|m| format!("{:?}: {}", m.speaker, m.content)).collect::<Vec<_>>().join("\n");
            let decision = self.weak_round_decision(weak_model, current_round, max_rounds, &conversation).await;

            match decision.decision {
                RoundDecisionKind::SubmitResult => {
                    let content = decision.content.unwrap_or_default();
                    messages.push(SimulatorMessage { round: current_round, speaker: Speaker::Weak, content: content.clone() });
                    let session = SimulatorSession {
                        weak_model,
                        strong_model,
                        max_rounds,
                        current_round,
                        status: SimulatorStatus::Completed,
                        final_decision: Some(FinalDecision::ConsultComplete),
                        messages,
                    };
                    let execution_result = SimulatorExecutionResult {
                        execution_type: ExecutionType::ConversationResult,
                        result_data: Some(json!(content)),
                        confidence: Some(decision.confidence),
                        total_rounds: current_round + 1,
                        decision_reasoning: "weak model submitted a final result".into(),
                    };
                    return SimulatorOutcome { session, execution_result };
                }
                RoundDecisionKind::Terminate => {
                    let session = SimulatorSession {
                        weak_model,
                        strong_model,
                        max_rounds,
                        current_round,
                        status: SimulatorStatus::Completed,
                        final_decision: Some(FinalDecision::WeakModelTerminated),
                        messages,
                    };
                    let execution_result = SimulatorExecutionResult {
                        execution_type: ExecutionType::ConversationResult,
                        result_data: None,
                        confidence: Some(decision.confidence),
                        total_rounds: current_round + 1,
                        decision_reasoning: "weak model terminated the conversation without a result".into(),
                    };
                    return SimulatorOutcome { session, execution_result };
                }
                RoundDecisionKind::ContinueConversation => {
                    if let Some(content) = &decision.content {
                        messages.push(SimulatorMessage { round: current_round, speaker: Speaker::Weak, content: content.clone() });
                    }
                    if current_round + 1 >= max_rounds {
                        let session = SimulatorSession {
                            weak_model,
                            strong_model,
                            max_rounds,
                            current_round: max_rounds,
                            status: SimulatorStatus::Completed,
                            final_decision: Some(FinalDecision::MaxRoundsReached),
                            messages,
                        };
                        let execution_result = SimulatorExecutionResult {
                            execution_type: ExecutionType::ConversationResult,
                            result_data: Some(json!(last_weak_message)),
                            confidence: Some(decision.confidence),
                            total_rounds: max_rounds,
                            decision_reasoning: "hit max_rounds with best-available answer".into(),
                        };
                        return SimulatorOutcome { session, execution_result };
                    }
                    current_round += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        structured: Mutex<Vec<Value>>,
        free_form: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AgentClient for ScriptedClient {
        async fn structured_call(&self, _agent_id: AgentId, _prompt: &str) -> workflow_engine_core::error::Result<Value> {
            Ok(self.structured.lock().unwrap().remove(0))
        }
        async fn free_form_call(&self, _agent_id: AgentId, _prompt: &str) -> workflow_engine_core::error::Result<String> {
            Ok(self.free_form.lock().unwrap().remove(0))
        }
        fn is_configured(&self, _agent_id: AgentId) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn direct_submit_when_round0_declines_conversation() {
        let client = Arc::new(ScriptedClient {
            structured: Mutex::new(vec![json!({"need_conversation": false, "content": "42", "confidence": 0.9, "reasoning": "trivial"})]),
            free_form: Mutex::new(vec![]),
        });
        let engine = SimulatorEngine::new(client, RetryPolicy::default());
        let outcome = engine.run(AgentId::new(), AgentId::new(), 20, "what is the answer").await;

        assert_eq!(outcome.session.status, SimulatorStatus::Completed);
        assert_eq!(outcome.session.final_decision, Some(FinalDecision::DirectSubmit));
        assert_eq!(outcome.execution_result.execution_type, ExecutionType::DirectSubmit);
        assert_eq!(outcome.execution_result.result_data, Some(json!("42")));
    }

    #[tokio::test]
    async fn conversation_ends_by_submit_after_two_rounds() {
        let client = Arc::new(ScriptedClient {
            structured: Mutex::new(vec![
                json!({"need_conversation": true, "content": "I need more context", "confidence": 0.3, "reasoning": "ambiguous"}),
                json!({"decision": "continue_conversation", "content": "Can you say more?", "confidence": 0.3}),
                json!({"decision": "submit_result", "content": "X", "confidence": 0.8}),
            ]),
            free_form: Mutex::new(vec!["Here is some context.".into(), "Here is more detail.".into()]),
        });
        let engine = SimulatorEngine::new(client, RetryPolicy::default());
        let outcome = engine.run(AgentId::new(), AgentId::new(), 20, "design a system").await;

        assert_eq!(outcome.session.final_decision, Some(FinalDecision::ConsultComplete));
        assert_eq!(outcome.execution_result.total_rounds, 2);
        assert_eq!(outcome.execution_result.result_data, Some(json!("X")));
    }

    #[tokio::test]
    async fn reaching_max_rounds_reports_max_rounds_reached() {
        let client = Arc::new(ScriptedClient {
            structured: Mutex::new(vec![
                json!({"need_conversation": true, "content": "opening", "confidence": 0.3, "reasoning": "ambiguous"}),
                json!({"decision": "continue_conversation", "content": "more", "confidence": 0.3}),
            ]),
            free_form: Mutex::new(vec!["expert reply".into()]),
        });
        let engine = SimulatorEngine::new(client, RetryPolicy::default());
        let outcome = engine.run(AgentId::new(), AgentId::new(), 1, "design a system").await;

        assert_eq!(outcome.session.final_decision, Some(FinalDecision::MaxRoundsReached));
        assert_eq!(outcome.execution_result.total_rounds, 1);
    }

    #[test]
    fn heuristic_prefers_direct_submit_for_short_simple_tasks() {
        let decision = heuristic_round0("fix typo");
        assert!(!decision.need_conversation);
    }

    #[test]
    fn heuristic_opens_conversation_for_complex_tasks() {
        let decision = heuristic_round0("analyze the architecture of the payment subsystem and compare alternatives");
        assert!(decision.need_conversation);
    }
}
