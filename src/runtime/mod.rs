pub mod frontend;
pub mod session;
pub mod worker;


pub use frontend::QueryObserver;
pub use session::QuerySession;
pub use worker::{StreamEnd, StreamOptions};
