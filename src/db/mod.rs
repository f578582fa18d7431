pub mod logger;
pub mod pool;
pub mod schema;

pub use logger::OperatorLogger;
pub use pool::ConnectionPool;
