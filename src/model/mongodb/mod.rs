mod bson;
mod collection;
mod counter;
pub mod errors;
pub mod transaction;

pub use bson::{u32_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_counter_exists, Counter, CANDIDATE_ID_COUNTER_ID};
