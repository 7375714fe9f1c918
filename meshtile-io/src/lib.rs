//! I/O operations for meshes
//!
//! This crate reads and writes Wavefront OBJ meshes together with their MTL
//! material libraries. Tiles produced by the tiler are written back out as
//! OBJ files.

pub mod error;
pub mod mtl;
pub mod obj;

pub use error::*;
pub use mtl::{MtlReader, MtlWriter};
pub use obj::{ObjReader, ObjWriteOptions, ObjWriter};

use meshtile_core::{Mesh, Result};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()>;
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjReader::read_mesh(path),
        _ => Err(meshtile_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjWriter::write_mesh(mesh, path),
        _ => Err(meshtile_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtile_core::{Error, Point3d};

    #[test]
    fn test_unsupported_extension() {
        let mesh = Mesh::new();
        assert!(matches!(
            write_mesh(&mesh, "tile.ply"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            read_mesh("tile.glb"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_mesh("/definitely/not/here.obj"),
            Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound
        ));
    }

    #[test]
    fn test_dispatch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.OBJ");
        let mesh = Mesh::from_vertices_and_faces(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        write_mesh(&mesh, &path).unwrap();
        let back = read_mesh(&path).unwrap();
        assert_eq!(back.face_count(), 1);
        assert_eq!(back.vertices, mesh.vertices);
    }
}
