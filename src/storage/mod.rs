//! Learned-state persistence
//!
//! Plain JSON records in a key-value store. The service writes through after
//! every mutation and reads back lazily the first time a session or tool
//! instance is touched.

mod state_store;

pub use state_store::{
    belief_key, feedback_key, feedback_prefix, gp_key, load_json, save_json, wear_key, InMemoryStore, SledStore,
    StateStore, StorageError,
};
