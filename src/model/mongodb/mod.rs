mod bson;
mod collection;
mod errors;

pub use bson::Id;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection, SINGLE_ADMIN_INDEX};
pub use errors::{duplicate_key_message, DUPLICATE_KEY};
