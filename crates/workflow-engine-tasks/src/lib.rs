//! Human, agent, and simulator task services, and the node-completion
//! check that ties a task's terminal status back into the execution
//! engine (§4.5-§4.7).

pub mod agent;
pub mod client;
pub mod error;
pub mod human;
pub mod node_completion;
pub mod priority;
pub mod simulator;

pub use agent::AgentTaskService;
pub use client::{AgentClient, ReqwestAgentClient, UnconfiguredAgentClient};
pub use error::{TaskServiceError, TaskServiceResult};
pub use human::{HumanTaskService, TaskDetails, TaskSummary};
pub use node_completion::check_node_completion;
pub use simulator::{SimulatorEngine, SimulatorOutcome, SimulatorSession, SimulatorStatus};
