//! Backend implementations.

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "azure")]
pub mod azure;

/// Registers all compiled backends with the factory.
///
/// Called by [`crate::init`]; safe to call more than once.
pub fn register_all() {
    #[cfg(feature = "mock")]
    mock::register();

    #[cfg(feature = "azure")]
    azure::register();
}
