// Offline cache: versioned stores + the cache-first controller

pub mod controller;
pub mod store;

pub use controller::{
    CacheController, ControllerState, Registration, RegistrationState, ResponseSource, Served,
};
pub use store::{body_digest, CacheStore, CachedEntry, MemoryCacheStore, SqliteCacheStore};
