mod credential;
mod guard;
mod policy;
mod store;
mod vault;

pub use credential::{Credential, DEFAULT_ROLE, DEFAULT_TOKEN_TYPE};
pub use guard::{Admission, CycleResult, RefreshCycle, RefreshGate, Release};
pub use policy::ExpiryPolicy;
pub use store::{CredentialStore, FileStore, MemoryStore};
pub use vault::{
    ACCESS_TOKEN_KEY, CREDENTIAL_KEYS, CredentialVault, TOKEN_EXPIRATION_KEY, TOKEN_TYPE_KEY,
    USER_ROLE_KEY,
};
