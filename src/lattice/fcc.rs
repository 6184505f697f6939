use super::Lattice;

/// Face-centered cubic lattice with four basis sites per unit cell.
#[derive(Clone, Copy, Debug)]
pub struct Fcc {
    a: f64,
}
impl Fcc {
    const BASIS: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [0.0, 0.5, 0.5],
        [0.5, 0.0, 0.5],
        [0.5, 0.5, 0.0],
    ];

    pub fn new(a: f64) -> Self {
        assert!(
            a.is_finite() && a > 0.0,
            "Lattice constant should be positive, found {}",
            a,
        );
        Self { a }
    }
    /// Lattice constant for a given number density (4 atoms per cell).
    pub fn from_density(rho: f64) -> Self {
        Self::new((4.0 / rho).cbrt())
    }
}
impl Lattice for Fcc {
    fn cell_lengths(&self) -> [f64; 3] {
        [self.a, self.a, self.a]
    }
    fn site_coords(&self, origin: [f64; 3], cells: [usize; 3]) -> Vec<[f64; 3]> {
        let mut coords = Vec::with_capacity(4 * cells[0] * cells[1] * cells[2]);
        for i in 0..cells[0] {
            for j in 0..cells[1] {
                for k in 0..cells[2] {
                    for basis in Self::BASIS {
                        coords.push([
                            origin[0] + self.a * (i as f64 + basis[0]),
                            origin[1] + self.a * (j as f64 + basis[1]),
                            origin[2] + self.a * (k as f64 + basis[2]),
                        ]);
                    }
                }
            }
        }
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon_block_has_4000_sites() {
        // 10x10x10 cells at the argon lattice constant
        let coords = Fcc::new(5.26).site_coords([0.0; 3], [10, 10, 10]);
        assert_eq!(coords.len(), 4000);
        // all sites inside the canonical 52.6 box
        assert!(coords
            .iter()
            .all(|c| c.iter().all(|&x| (0.0..52.6).contains(&x))));
    }

    #[test]
    fn nearest_neighbor_spacing() {
        let coords = Fcc::new(2.0).site_coords([0.0; 3], [2, 2, 2]);
        let mut min2 = f64::MAX;
        for i in 0..coords.len() {
            for j in (i + 1)..coords.len() {
                let d2 = (0..3)
                    .map(|k| (coords[i][k] - coords[j][k]).powi(2))
                    .sum::<f64>();
                min2 = min2.min(d2);
            }
        }
        // a / sqrt(2)
        assert!((min2.sqrt() - 2.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn density_round_trip() {
        let fcc = Fcc::from_density(0.5);
        let a = fcc.cell_lengths()[0];
        assert!((4.0 / a.powi(3) - 0.5).abs() < 1e-12);
    }
}
