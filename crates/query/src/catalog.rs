//! The external galaxy catalog, as consumed by the bot.

use rampart_core::Result;

/// Read access to the static system catalog.
///
/// The catalog itself (loading, indexing, pathfinding) is an external
/// collaborator; the bot only asks these two questions. Implementations
/// must be cheap enough to call from handlers or be offloaded by the
/// caller.
pub trait SystemCatalog: Send + Sync {
    /// Names of every catalogued system within `dist_ly` of `centre`,
    /// including `centre` itself.
    fn systems_within(&self, centre: &str, dist_ly: f64) -> Result<Vec<String>>;

    /// Straight-line distance between two systems in light years.
    fn distance(&self, from: &str, to: &str) -> Result<f64>;
}
