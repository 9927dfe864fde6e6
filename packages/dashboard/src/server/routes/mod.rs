// HTTP routes
pub mod crawl;
pub mod health;
pub mod jobs;
pub mod stream;

pub use crawl::*;
pub use health::*;
pub use jobs::*;
pub use stream::*;
