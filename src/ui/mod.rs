/// egui rendering. Every function here draws from `AppState` and routes user
/// actions back through its methods; no business logic lives in this layer.
///
/// ```text
///   top bar      File menu (re-open dataset / model), status
///   side panel   view selector
///   central      insights | about | prediction
/// ```

pub mod about;
pub mod panels;
pub mod plot;
pub mod prediction;
pub mod table;
