use std::path::PathBuf;

use rmd::{prelude::*, Checkpoint};

fn gathered_path() -> PathBuf {
    std::env::temp_dir().join(format!("rmd-parallel-{}.ckpt", std::process::id()))
}

fn simulate(engine: &mut Engine<LennardJones>) -> Result<(), Error> {
    const LP: f64 = 5.26;
    engine.set_box(SimBox::new([4.0 * LP; 3], [true; 3], [1, 2, 1])?)?;
    engine.set_species(vec![Species::new("Ar", 39.948)?])?;

    let mut lj = LennardJones::new(1);
    lj.set_coeff(0, 0, 3.4, 0.0104, 8.5)?;
    engine.set_potential(lj)?;

    engine.create_lattice(&Fcc::new(LP), [0.0; 3], [4, 4, 4], 0)?;
    engine.seed_velocities(100.0, 3)?;

    // exercise halo exchange, migration, reductions and the gather path
    engine.equilibrate(0.05, 2e-3, 2e-2, 100.0)?;
    engine.run(0.05, 2e-3)?;

    let temperature = engine.temperature()?;
    if !(10.0..500.0).contains(&temperature) {
        return Err(Error::InvalidRun(format!(
            "implausible temperature {}",
            temperature
        )));
    }
    if engine.num_atoms()? != 256 {
        return Err(Error::InvalidRun("an atom went missing".into()));
    }

    engine.save_checkpoint(&gathered_path())
}

#[test]
fn two_workers_run_in_lockstep_and_gather_one_checkpoint() {
    let mut runtime: Runtime<LennardJones> = Runtime::new();
    runtime.run(2, simulate).unwrap();

    let checkpoint = Checkpoint::load(&gathered_path()).unwrap();
    assert_eq!(checkpoint.num_atoms(), 256);
    assert_eq!(checkpoint.species.len(), 1);
    assert_eq!(checkpoint.species[0].name(), "Ar");
    assert!((checkpoint.time - 0.1).abs() < 1e-9);
    assert_eq!(checkpoint.step, 50);

    // gathered atoms are id-ordered with canonical coordinates
    let edge = 4.0 * 5.26;
    assert!(checkpoint
        .positions
        .iter()
        .all(|p| p.iter().all(|&c| (0.0..edge).contains(&c))));

    std::fs::remove_file(gathered_path()).ok();
}

fn fail_on_purpose(engine: &mut Engine<LennardJones>) -> Result<(), Error> {
    engine.set_box(SimBox::new([10.0; 3], [true; 3], [1, 2, 1])?)?;
    // species table never configured: pre_check must reject the run
    let mut lj = LennardJones::new(1);
    lj.set_coeff(0, 0, 1.0, 1.0, 2.5)?;
    engine.set_potential(lj)
}

#[test]
fn a_worker_failure_surfaces_through_the_manager() {
    let mut runtime: Runtime<LennardJones> = Runtime::new();
    let result = runtime.run(2, fail_on_purpose);
    assert!(matches!(result, Err(Error::SpeciesCountMismatch { .. })));
}
