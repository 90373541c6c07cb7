//! # Yamlet - lazy, composable configuration over YAML
//!
//! Yamlet turns YAML documents into lazy, dynamically scoped configuration
//! trees whose leaf values may be expressions referring to other values in
//! the same or imported documents. Naming two mappings side by side
//! composites them: the result takes the rightmost definitions, and
//! inherited expressions re-evaluate against the composite scope, so
//! overridden inputs flow into inherited formulas.
//!
//! ## Quick start
//!
//! ```
//! use yamlet::{Loader, LoaderOptions};
//!
//! let loader = Loader::new(LoaderOptions::default());
//! let config = loader.load_str(
//!     "\
//! base:
//!   name: world
//!   greeting: !fmt 'Hello, {name}!'
//! custom: !expr |
//!   base { name: 'Yamlet' }
//! ",
//!     "<example>",
//! )?;
//! let custom = config.tuple("custom")?;
//! assert_eq!(custom.get("greeting")?.as_str(), Some("Hello, Yamlet!"));
//! # Ok::<(), yamlet::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. **Preprocessor** - rewrites `!else:` so YAML sees a tagged key.
//! 2. **YAML collaborator** - a marked node tree with tags and spans.
//! 3. **Constructor** - nodes become tuples; tagged scalars become
//!    deferred expressions, format strings, imports, lambdas, composites.
//! 4. **Evaluator** - forces deferred values on access, memoizes results,
//!    detects cycles, and records provenance for `explain_value`.

pub mod builtins;
pub mod compose;
pub mod construct;
pub mod error;
pub mod eval;
pub mod expr;
pub mod explain;
pub mod loader;
pub mod preprocess;
pub mod scope;
pub mod tuple;
pub mod value;
pub mod yaml;

pub use error::{Error, ErrorKind, Result, SourceSpan};
pub use loader::{ConfigTuple, HostFn, Loader, LoaderOptions, StringifyStyle};
pub use scope::Scope;
pub use tuple::Tuple;
pub use value::Value;
