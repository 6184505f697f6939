//! Argon in a periodic box: equilibrate a 4000-atom FCC block under a
//! Lennard-Jones potential across two subdomain workers, sampling
//! observables and saving checkpoints from timers.

use std::path::Path;

use rmd::prelude::*;

const LP: f64 = 5.26;

fn handle_event(engine: &mut Engine<LennardJones>, event: Event) {
    let Event::TimerFired { timer } = event;
    match timer.index() {
        // observable sampler
        0 => {
            let (Ok(temperature), Ok(energy)) = (engine.temperature(), engine.total_energy())
            else {
                return;
            };
            if engine.is_root() {
                println!("{:.3}\t{:.3}\t{:e}", engine.time(), temperature, energy);
            }
        }
        // periodic checkpoint
        1 => engine.request_checkpoint("argon.ckpt"),
        _ => {}
    }
}

fn simulate(engine: &mut Engine<LennardJones>) -> Result<(), Error> {
    engine.set_box(SimBox::new([10.0 * LP; 3], [true; 3], [1, 2, 1])?)?;
    engine.set_species(vec![Species::new("Ar", 39.948)?])?;

    let (sigma, epsilon) = (3.4, 0.0104);
    let mut lj = LennardJones::new(1);
    lj.set_coeff(0, 0, sigma, epsilon, 2.5 * sigma)?;
    engine.set_potential(lj)?;
    engine.set_neighbor(0.3, UpdateSettings::default());

    engine.create_lattice(&Fcc::new(LP), [0.0; 3], [10, 10, 10], 0)?;
    engine.seed_velocities(100.0, 2027)?;

    engine.make_timer(0.0, 0.05, -1.0)?;
    engine.make_timer(0.0, 0.04, -1.0)?;
    engine.set_event_handler(handle_event);

    engine.equilibrate(1.0, 2e-3, 2e-2, 100.0)?;
    engine.save_checkpoint(Path::new("argon-final.ckpt"))?;

    if engine.is_root() {
        println!(
            "The run took about {:.3} seconds to finish.",
            engine.wall_time()
        );
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Runtime::new().run(2, simulate)
}
