#[cfg(feature = "core")]
#[doc(inline)]
pub use varmap_core as core;

#[cfg(feature = "index")]
#[doc(inline)]
pub use varmap_index as index;

#[cfg(feature = "proximity")]
#[doc(inline)]
pub use varmap_proximity as proximity;

#[cfg(feature = "import")]
#[doc(inline)]
pub use varmap_import as import;

#[cfg(feature = "query")]
#[doc(inline)]
pub use varmap_query as query;
