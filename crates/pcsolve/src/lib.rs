//! `pcsolve`: dependency resolution and flag rendering for pkg-config descriptors.
//!
//! Given an ordered list of requested components, this crate loads their
//! `.pc` descriptors, walks the transitive requirement graph (tolerating
//! cycles and redundant requests), and renders the compiler or linker flags
//! of the resolved graph in a deterministic settlement order.
//!
//! # Architecture
//!
//! Leaf modules first:
//!
//! - [`error`]: Error types and result alias
//! - [`version`]: RPM-style version comparison and comparator operators
//! - [`dependency`]: `Requires:` list parsing
//! - [`parser`]: `.pc` text parsing and flag tokenisation
//! - [`path`]: Ordered search path used to locate `.pc` files
//! - [`loader`]: Where descriptor text comes from (filesystem or memory)
//! - [`variables`]: Scoped variable environment and `${name}` expansion
//! - [`descriptor`]: Parsed, immutable package descriptors
//! - [`registry`]: Arena of descriptors cached by name and variable fingerprint
//! - [`resolver`]: The world solver producing the settlement order
//! - [`fragment`]: Fragment collection, filtering, and rendering
//! - [`client`]: The public facade tying everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use pcsolve::client::Client;
//! use pcsolve::fragment::FragmentKind;
//!
//! let mut client = Client::builder().with_path("/usr/lib/pkgconfig").build();
//!
//! let filter = client.filter_config(FragmentKind::Libs);
//! let libs = client.libs(&["zlib"], &filter).unwrap();
//! println!("{libs}");
//!
//! assert!(pcsolve::version::compare("1.2.12", "1.2.11").is_gt());
//! ```

pub mod client;
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod fragment;
pub mod loader;
pub mod parser;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod variables;
pub mod version;

/// The version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The pkg-config protocol version we claim compatibility with.
pub const PKGCONFIG_COMPAT_VERSION: &str = "0.29.2";

/// Default maximum depth when traversing the dependency graph.
///
/// Depth is counted in edges from the synthetic world node, so directly
/// requested components sit at depth 1.
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 2000;

/// Default system library directories that are filtered from `-L` output.
pub const DEFAULT_SYSTEM_LIBDIRS: &[&str] = &["/usr/lib", "/lib"];

/// Default system include directories that are filtered from `-I` output.
pub const DEFAULT_SYSTEM_INCLUDEDIRS: &[&str] = &["/usr/include"];

/// Default `.pc` file search path.
pub const DEFAULT_PKGCONFIG_PATH: &[&str] = &[
    "/usr/local/lib/pkgconfig",
    "/usr/local/share/pkgconfig",
    "/usr/lib/pkgconfig",
    "/usr/share/pkgconfig",
];

/// The `PKG_CONFIG_PATH` environment variable name.
pub const ENV_PKG_CONFIG_PATH: &str = "PKG_CONFIG_PATH";

/// The `PKG_CONFIG_LIBDIR` environment variable name.
///
/// When set, this *replaces* the default search path instead of prepending to it.
pub const ENV_PKG_CONFIG_LIBDIR: &str = "PKG_CONFIG_LIBDIR";

/// The `PKG_CONFIG_SYSROOT_DIR` environment variable name.
pub const ENV_PKG_CONFIG_SYSROOT_DIR: &str = "PKG_CONFIG_SYSROOT_DIR";

/// The `PKG_CONFIG_ALLOW_SYSTEM_CFLAGS` environment variable name.
pub const ENV_PKG_CONFIG_ALLOW_SYSTEM_CFLAGS: &str = "PKG_CONFIG_ALLOW_SYSTEM_CFLAGS";

/// The `PKG_CONFIG_ALLOW_SYSTEM_LIBS` environment variable name.
pub const ENV_PKG_CONFIG_ALLOW_SYSTEM_LIBS: &str = "PKG_CONFIG_ALLOW_SYSTEM_LIBS";

/// The `PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH` environment variable name.
pub const ENV_PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH: &str = "PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH";
