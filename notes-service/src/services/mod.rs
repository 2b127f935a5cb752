pub mod auth;
pub mod database;
pub mod gateway;
pub mod metrics;
pub mod prompts;
pub mod providers;

pub use auth::{AuthProvider, AuthUser, DevAuthProvider, HostedAuthProvider};
pub use database::NotesDb;
pub use gateway::{Generation, GenerationError, GenerationGateway};
