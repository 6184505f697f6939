use rmd::prelude::*;

/// A serial argon engine: a cubic FCC block filling a periodic box.
pub fn argon_engine(cells: usize, cutoff: f64) -> Engine<LennardJones> {
    const LP: f64 = 5.26;
    let mut engine: Engine<LennardJones> = Engine::new();
    engine
        .set_box(SimBox::new([cells as f64 * LP; 3], [true; 3], [1, 1, 1]).unwrap())
        .unwrap();
    engine
        .set_species(vec![Species::new("Ar", 39.948).unwrap()])
        .unwrap();
    let mut lj = LennardJones::new(1);
    lj.set_coeff(0, 0, 3.4, 0.0104, cutoff).unwrap();
    engine.set_potential(lj).unwrap();
    engine
        .create_lattice(&Fcc::new(LP), [0.0; 3], [cells; 3], 0)
        .unwrap();
    engine
}
