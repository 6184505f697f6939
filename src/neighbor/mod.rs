mod grid;
mod list;
mod settings;

pub use grid::CellGrid;
pub use list::NeighborList;
pub use settings::UpdateSettings;
