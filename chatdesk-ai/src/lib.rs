pub mod function;
pub mod models;
pub mod provider;
pub mod traits;

// Re-export public APIs
pub use function::{
    default_catalog, is_contact_call, FunctionSchema, FunctionSpec, ASK_FOR_CONTACT,
    COLLECT_CONTACT_INFO,
};
pub use models::{FunctionParameter, ProviderConfig};
pub use provider::OpenAiProvider;
pub use traits::{ChatMessage, ChatResponse, FunctionCall, ModelProvider};
