mod dictionary;
mod primitive;

pub use dictionary::Dictionary;
pub use primitive::{escape_string, write_name, Object, ObjectId};
