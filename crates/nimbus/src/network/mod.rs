mod session;

pub use session::{BusError, Inbound, MqttSession, SessionOptions};
