mod conn;
mod cursor;
mod reply;
mod session;
mod stream;

pub use cursor::{Cursor, RowFetch};
pub use reply::Reply;
pub use session::Session;
pub use stream::{Stream, Transport};
