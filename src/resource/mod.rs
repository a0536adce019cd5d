/// Resource layer: typed data handles, file loading, and the session registry.
///
/// Architecture:
/// ```text
///  .wav / .wave / .csv          transform / features
///        │                              │
///        ▼                              │
///   ┌──────────┐                        │
///   │  loader   │  file → AudioData / CsvTable
///   └──────────┘                        │
///        │                              ▼
///        ▼                        ┌─────────────┐
///   ┌──────────────────┐ ◀─────── │ NumericArray │
///   │ ResourceRegistry  │          └─────────────┘
///   └──────────────────┘  alias → Resource (unique aliases, no duplicate paths)
/// ```

pub mod loader;
pub mod model;
pub mod registry;

pub use model::{NumericArray, Resource, ResourceKind};
pub use registry::{ResourceRecord, ResourceRegistry};
