use axum::Router;

/// A service module that contributes HTTP routes.
///
/// The server binary collects every module and merges its router into
/// the application. Routes are returned fully stated (`Router<()>`).
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes. Paths are absolute (e.g. `/api/...`).
    fn routes(&self) -> Router;
}
