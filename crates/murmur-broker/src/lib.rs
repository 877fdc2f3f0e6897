pub mod broker;
pub mod error;
pub mod memory;
pub mod redis_broker;

pub use broker::{Broker, Delivery};
pub use error::{BrokerError, Result};
pub use memory::MemoryBroker;
pub use redis_broker::RedisBroker;
