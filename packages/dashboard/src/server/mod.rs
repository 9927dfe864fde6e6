pub mod app;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use app::build_app;
pub use error::{ApiError, ApiResult};
pub use session::{Session, USER_ID_HEADER};
pub use state::{AppState, SessionStores, StoreProvider};
