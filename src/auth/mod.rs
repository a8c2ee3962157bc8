pub mod correlation;
pub mod credentials;
pub mod flow;
pub mod oauth;

pub use correlation::{CorrelationEntry, CorrelationStore};
pub use credentials::{AuthSession, Credentials, Provider};
pub use flow::{AuthCallback, AuthCoordinator, AuthorizationRequest};
pub use oauth::{GoogleOAuth, TokenExchanger};
