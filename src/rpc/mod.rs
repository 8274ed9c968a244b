pub mod dispatch;
pub mod protocol;
pub mod server;
