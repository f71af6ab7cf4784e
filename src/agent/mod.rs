pub mod executor;
pub mod prompt;
pub mod trace;

pub use executor::{AgentOutcome, AgentRunner, ToolCallingAgent};
pub use prompt::PromptTemplate;
pub use trace::{Observation, ObservedItem, ToolInvocationRecord, ToolName};
