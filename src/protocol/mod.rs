pub mod command;
pub mod connection;
pub mod datatypes;
pub mod dispatch;
pub mod frame;
pub mod message;
pub mod notice;
pub mod primitive;
pub mod r#trait;

pub use message::{ClientMessage, Message, ServerMessage};
pub use r#trait::{Processor, RowProcessor, SessionStateProcessor};
