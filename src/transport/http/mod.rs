pub mod auth;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod billing;
    pub mod catalog;
    pub mod communities;
    pub mod health;
    pub mod profiles;
    pub mod webhooks;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
