mod common;

use common::argon_engine;

const DT: f64 = 2e-3;

#[test]
fn total_energy_is_conserved_in_free_mode() {
    let mut engine = argon_engine(4, 8.5);
    engine.seed_velocities(100.0, 42).unwrap();

    // one step to establish the reference energy after the bootstrap
    // force pass
    engine.run(DT, DT).unwrap();
    let initial = engine.total_energy().unwrap();
    assert!(initial.is_finite());

    engine.run(999.0 * DT, DT).unwrap();
    let final_energy = engine.total_energy().unwrap();

    let drift = (final_energy - initial).abs();
    assert!(
        drift < 0.01 * initial.abs(),
        "energy drifted by {} over 1000 steps, initial {}",
        drift,
        initial,
    );
    assert_eq!(engine.step_index(), 1000);
}

#[test]
fn equilibration_drives_temperature_to_the_target_and_reverts_to_free_mode() {
    let mut engine = argon_engine(4, 8.5);
    engine.seed_velocities(40.0, 7).unwrap();

    engine.equilibrate(0.4, DT, 2e-2, 120.0).unwrap();
    let equilibrated = engine.temperature().unwrap();
    assert!(
        (equilibrated - 120.0).abs() < 12.0,
        "temperature {} after equilibration",
        equilibrated,
    );

    // free mode afterwards: energy stays put while temperature floats
    engine.run(0.05, DT).unwrap();
    let e0 = engine.total_energy().unwrap();
    engine.run(0.05, DT).unwrap();
    let e1 = engine.total_energy().unwrap();
    assert!((e1 - e0).abs() < 0.01 * e0.abs());
}
