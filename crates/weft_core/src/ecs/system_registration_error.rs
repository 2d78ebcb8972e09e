use thiserror::Error;

/// Errors that can occur while registering a system with the manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SystemRegistrationError {
    #[error("cannot register system '{name}': the manager is already initialized")]
    ManagerLive { name: String },
}
