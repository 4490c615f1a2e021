//! 凭证层：API Key 池、轮询选择、限流窗口与失效冷却

pub mod clock;
pub mod pool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use pool::{Credential, CredentialPool, CredentialStatus, PoolSettings};
