mod vault_trait;
pub use vault_trait::{MatchFlags, Vault};

mod file;
pub use file::{
    load_file_credentials, load_file_creds, save_file_creds, CredFormat,
    FileVault,
};

mod memory;
pub use memory::MemoryVault;
