//! Proximity of amino-acid changes to post-translational modification sites.
//!
//! Every query runs on one protein's site positions, which the caller keeps
//! sorted strictly ascending. A single primitive, [ProximityMatcher::locate],
//! bisects to one site whose window covers the query position and then walks
//! outwards to the whole contiguous run of such sites. Existence, counting
//! and classification are that primitive with different windows.
//!
//! ```rust
//! use varmap_proximity::{ProximityMatcher, PtmImpact, Window};
//!
//! let sites: Vec<u32> = vec![10, 50, 100];
//! let matcher = ProximityMatcher::new(&sites);
//!
//! assert!(matcher.any_within(53, Window::symmetric(7)));
//! assert_eq!(matcher.sites_within(53, Window::symmetric(7)), &[50]);
//! assert_eq!(matcher.classify(52, false), PtmImpact::Proximal);
//! ```

/// Classification of a change by its closest PTM site.
///
/// See [`PtmImpact`] for details.
pub mod impact;

/// The bisection search.
///
/// See [`ProximityMatcher`] for details.
pub mod matcher;

/// Windows around a site.
pub mod window;

// re-exports
pub use self::impact::PtmImpact;
pub use self::matcher::ProximityMatcher;
pub use self::window::Window;
