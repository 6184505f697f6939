mod common;

use common::argon_engine;
use rmd::prelude::*;
use tempfile::tempdir;

#[test]
fn checkpoint_round_trip_restores_identical_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.ckpt");

    let mut engine = argon_engine(3, 5.0);
    engine.seed_velocities(100.0, 1).unwrap();
    engine.run(0.02, 2e-3).unwrap();
    engine.save_checkpoint(&path).unwrap();

    let mut restored = argon_engine(3, 5.0);
    restored.load_checkpoint(&path).unwrap();

    assert_eq!(restored.time(), engine.time());
    assert_eq!(restored.step_index(), engine.step_index());

    let a = engine.atoms();
    let b = restored.atoms();
    assert_eq!(b.nlocal(), a.nlocal());
    assert_eq!(b.ids, a.ids);
    assert_eq!(b.species, a.species);
    // bit-exact restoration of the trajectory state
    assert_eq!(b.positions, a.positions);
    assert_eq!(b.velocities, a.velocities);
    assert_eq!(
        b.species_table()[0].name(),
        a.species_table()[0].name()
    );
}

#[test]
fn a_restored_run_continues_the_trajectory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fork.ckpt");

    let mut original = argon_engine(3, 5.0);
    original.seed_velocities(80.0, 5).unwrap();
    original.run(0.02, 2e-3).unwrap();
    original.save_checkpoint(&path).unwrap();

    let mut fork = argon_engine(3, 5.0);
    fork.load_checkpoint(&path).unwrap();

    original.run(0.02, 2e-3).unwrap();
    fork.run(0.02, 2e-3).unwrap();

    // the fork rebuilds its pair list at the restored configuration, so
    // force summation order (and the last few ulps) may differ from the
    // original; the trajectories still have to agree to high precision
    for (p, q) in fork
        .atoms()
        .positions
        .iter()
        .zip(original.atoms().positions.iter())
    {
        for k in 0..3 {
            assert!((p[k] - q[k]).abs() < 1e-9, "{} vs {}", p[k], q[k]);
        }
    }
}

#[test]
fn loading_into_a_mismatched_box_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.ckpt");

    let mut engine = argon_engine(3, 5.0);
    engine.seed_velocities(100.0, 1).unwrap();
    engine.save_checkpoint(&path).unwrap();

    let mut other = argon_engine(4, 5.0);
    assert!(matches!(
        other.load_checkpoint(&path),
        Err(Error::InvalidBox(_))
    ));
}
