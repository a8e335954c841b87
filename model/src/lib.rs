pub mod endpoint;
pub mod query;

#[cfg(feature = "testing")]
pub mod testing;
