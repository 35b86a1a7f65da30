/// Chart layer: chart descriptions and their export.
///
/// ```text
///   rows + x/y columns + kind
///        │
///        ▼
///   ┌──────────┐
///   │ builder  │  one trace per y-column, palette colours
///   └──────────┘
///        │
///        ▼
///   Figure (serde, Plotly-shaped JSON)
///        │
///        ▼
///   ┌──────────┐
///   │  export  │  ChartExporter → JPEG / PNG bytes
///   └──────────┘
/// ```
pub mod builder;
pub mod export;
pub mod figure;
