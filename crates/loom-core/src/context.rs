//! What the user is looking at: the component context, its fingerprint, and the
//! system preamble sent with every request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt sent on the user's behalf when a component is explained automatically.
pub const AUTO_EXPLAIN_PROMPT: &str =
    "Give me a brief 2-3 sentence explanation of what this component is and what I can do with it right now.";

const PRODUCT_PHILOSOPHY: &str = "LOOM PHILOSOPHY:
- \"Agents-first, humans-second\" - AI agents (Weavers) run autonomously in Ralph loops
- Ralph Loops: Recursive AI coding loops in Forward (building), Reverse (cloning), or System (testing) modes
- Threads: Audit trails of everything agents do, shareable and loadable as context
- \"Software is Clay\" - get it working, then run more loops to refine
- Humans only intervene when agents encounter failure domains requiring guidance";

/// Description of the component the assistant panel is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentContext {
    pub component_name: String,
    pub purpose: String,
    pub current_state: String,
    #[serde(default)]
    pub available_actions: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
}

impl ComponentContext {
    pub fn new(component_name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            purpose: purpose.into(),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.current_state = state.into();
        self
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.available_actions = actions;
        self
    }

    pub fn with_concepts(mut self, concepts: Vec<String>) -> Self {
        self.concepts = concepts;
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(format!("{}-{}", self.component_name, self.current_state))
    }

    /// Fixed system preamble with this context embedded.
    pub fn system_preamble(&self) -> String {
        format!(
            "You are Loom's AI assistant, helping users understand the Loom infrastructure orchestrator.

CONTEXT ABOUT THE COMPONENT THE USER IS VIEWING:
- Component: {}
- Purpose: {}
- Current State: {}
- Available Actions: {}
- Related Loom Concepts: {}

{}

Be helpful, concise, and explain things in simple terms. Focus on what the user is seeing right now and how it fits into the larger Loom system.",
            self.component_name,
            self.purpose,
            self.current_state,
            self.available_actions.join(", "),
            self.concepts.join(", "),
            PRODUCT_PHILOSOPHY,
        )
    }
}

/// Key identifying what the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
