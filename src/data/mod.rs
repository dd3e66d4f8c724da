/// Data layer: core types, loading, choices and display analytics.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (memoized per path)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Listing>, year range
///   └──────────┘
///        │                         │
///        ▼                         ▼
///   ┌──────────┐            ┌─────────────────────┐
///   │  filter   │ choices    │ transform → summary │ charts
///   └──────────┘            └─────────────────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod summary;
pub mod transform;
