/// Data layer: core types, loading, detection and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .xls / .xlsx
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ columns   │  header keywords → district / address / price
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  city     │  detect city, strip it from district labels
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ aggregate │  district ranking, price bands
///   └──────────┘
/// ```

pub mod aggregate;
pub mod city;
pub mod columns;
pub mod loader;
pub mod model;
