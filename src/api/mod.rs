pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use extract::{AuthUser, MaybeUser, USER_ID_HEADER};
pub use routes::create_router;
pub use state::AppState;
