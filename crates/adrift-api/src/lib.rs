pub mod bottles;
pub mod error;
pub mod holds;
pub mod memorials;
pub mod players;
pub mod replies;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
