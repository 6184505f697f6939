//! Internal unit system: lengths in angstroms, masses in unified atomic
//! mass units, energies in electron-volts. The derived time unit is
//! `sqrt(amu * A^2 / eV)`, about 10.18 fs.

/// Boltzmann constant in eV/K.
pub const BOLTZMANN: f64 = 8.617_333_262e-5;
