//! LLM 层：生成客户端抽象、OpenAI 兼容实现、Mock、按凭证构建客户端的提供者

pub mod mock;
pub mod openai;
pub mod provider;
pub mod traits;

pub use mock::{MockClient, MockClientFactory, MockReply};
pub use openai::{OpenAiClient, OpenAiClientFactory, GEMINI_OPENAI_BASE_URL};
pub use provider::{ClientLease, ClientProvider, PooledClientProvider};
pub use traits::{ClientFactory, GenerationClient, ModelProfile, TokenUsage};
