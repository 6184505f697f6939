mod fcc;

pub use fcc::Fcc;

/// A Bravais lattice able to enumerate its site coordinates.
pub trait Lattice {
    fn cell_lengths(&self) -> [f64; 3];

    /// Site coordinates for a block of `cells` unit cells replicated from
    /// `origin`, one entry per basis site per cell.
    fn site_coords(&self, origin: [f64; 3], cells: [usize; 3]) -> Vec<[f64; 3]>;
}
