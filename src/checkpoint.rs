//! Binary checkpoint format.
//!
//! Little-endian layout, in order:
//! - header: magic, format version (u32), atom count (u64), species count
//!   (u32), box edges (3 x f64), periodic flags (3 x u8)
//! - species table: per species, name length (u16), UTF-8 name bytes,
//!   mass (f64)
//! - atom records in ascending global-id order: species id (u32),
//!   position (3 x f64), velocity (3 x f64)
//! - trailer: simulation time (f64), step index (u64)
//!
//! Loading restores the identical logical state that was active at save
//! time; a version mismatch is rejected before any payload is read.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use tracing::info;

use crate::{error::Error, species::Species};

const MAGIC: [u8; 4] = *b"RMDC";
const FORMAT_VERSION: u32 = 1;

/// A persisted snapshot of full simulation state.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub edges: [f64; 3],
    pub periodic: [bool; 3],
    pub species: Vec<Species>,
    pub atom_species: Vec<usize>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub time: f64,
    pub step: usize,
}
impl Checkpoint {
    pub fn num_atoms(&self) -> usize {
        self.atom_species.len()
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), atoms = self.num_atoms(), "saved checkpoint");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        let checkpoint = Self::read_from(&mut reader)?;
        info!(path = %path.display(), atoms = checkpoint.num_atoms(), "loaded checkpoint");
        Ok(checkpoint)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        debug_assert_eq!(self.positions.len(), self.atom_species.len());
        debug_assert_eq!(self.velocities.len(), self.atom_species.len());

        w.write_all(&MAGIC)?;
        write_u32(w, FORMAT_VERSION)?;
        write_u64(w, self.num_atoms() as u64)?;
        write_u32(w, self.species.len() as u32)?;
        for &edge in &self.edges {
            write_f64(w, edge)?;
        }
        for &flag in &self.periodic {
            w.write_all(&[flag as u8])?;
        }

        for species in &self.species {
            let name = species.name().as_bytes();
            write_u16(w, name.len() as u16)?;
            w.write_all(name)?;
            write_f64(w, species.mass())?;
        }

        for i in 0..self.num_atoms() {
            write_u32(w, self.atom_species[i] as u32)?;
            for &c in &self.positions[i] {
                write_f64(w, c)?;
            }
            for &c in &self.velocities[i] {
                write_f64(w, c)?;
            }
        }

        write_f64(w, self.time)?;
        write_u64(w, self.step as u64)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, Error> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::CheckpointIo("bad magic bytes".into()));
        }
        let version = read_u32(r)?;
        if version != FORMAT_VERSION {
            return Err(Error::IncompatibleCheckpoint {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let natoms = read_u64(r)? as usize;
        let nspecies = read_u32(r)? as usize;
        let mut edges = [0.0; 3];
        for edge in &mut edges {
            *edge = read_f64(r)?;
        }
        let mut periodic = [false; 3];
        for flag in &mut periodic {
            let mut byte = [0u8; 1];
            r.read_exact(&mut byte)?;
            *flag = byte[0] != 0;
        }

        let mut species = Vec::with_capacity(nspecies);
        for _ in 0..nspecies {
            let len = read_u16(r)? as usize;
            let mut name = vec![0u8; len];
            r.read_exact(&mut name)?;
            let name = String::from_utf8(name)
                .map_err(|e| Error::CheckpointIo(format!("species name is not UTF-8: {}", e)))?;
            let mass = read_f64(r)?;
            species.push(
                Species::new(&name, mass)
                    .map_err(|e| Error::CheckpointIo(format!("bad species record: {}", e)))?,
            );
        }

        let mut atom_species = Vec::with_capacity(natoms);
        let mut positions = Vec::with_capacity(natoms);
        let mut velocities = Vec::with_capacity(natoms);
        for _ in 0..natoms {
            let s = read_u32(r)? as usize;
            if s >= nspecies {
                return Err(Error::CheckpointIo(format!("atom references species {}", s)));
            }
            atom_species.push(s);
            let mut pos = [0.0; 3];
            for c in &mut pos {
                *c = read_f64(r)?;
            }
            positions.push(pos);
            let mut vel = [0.0; 3];
            for c in &mut vel {
                *c = read_f64(r)?;
            }
            velocities.push(vel);
        }

        let time = read_f64(r)?;
        let step = read_u64(r)? as usize;

        Ok(Self {
            edges,
            periodic,
            species,
            atom_species,
            positions,
            velocities,
            time,
            step,
        })
    }
}

fn write_u16<W: Write>(w: &mut W, v: u16) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}
fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}
fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}
fn write_f64<W: Write>(w: &mut W, v: f64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}
fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}
fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checkpoint {
        Checkpoint {
            edges: [52.6, 52.6, 52.6],
            periodic: [true, true, false],
            species: vec![Species::new("Ar", 39.948).unwrap()],
            atom_species: vec![0, 0, 0],
            positions: vec![[0.1, 0.2, 0.3], [5.0, 5.0, 5.0], [52.0, 0.5, 1.5]],
            velocities: vec![[0.01, -0.02, 0.03], [0.0; 3], [-0.4, 0.0, 0.2]],
            time: 1.234,
            step: 617,
        }
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let original = sample();
        let mut buf = Vec::new();
        original.write_to(&mut buf).unwrap();
        let restored = Checkpoint::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        // bump the version field just past the magic
        buf[4] = FORMAT_VERSION as u8 + 1;
        assert!(matches!(
            Checkpoint::read_from(&mut buf.as_slice()),
            Err(Error::IncompatibleCheckpoint {
                found,
                expected: FORMAT_VERSION,
            }) if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let buf = b"definitely not a checkpoint".to_vec();
        assert!(Checkpoint::read_from(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn truncated_files_error_instead_of_panicking() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 10);
        assert!(matches!(
            Checkpoint::read_from(&mut buf.as_slice()),
            Err(Error::Io(_))
        ));
    }
}
