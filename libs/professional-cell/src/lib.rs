pub mod handlers;
pub mod models;
pub mod router;
pub mod seed;
pub mod services;
pub mod store;

pub use handlers::ProfessionalState;
pub use models::*;
pub use services::*;
pub use store::{InMemoryProfessionalStore, ProfessionalStore, SupabaseProfessionalStore};
