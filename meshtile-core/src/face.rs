//! Faces and edges

use serde::{Deserialize, Serialize};

/// Texture corners and material of a textured face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceTexture {
    /// Indices into the owning mesh's texture vertex list
    pub indices: [usize; 3],
    /// Index into the owning mesh's material list
    pub material: usize,
}

/// A triangle referencing three vertices of its mesh, optionally textured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Face {
    pub indices: [usize; 3],
    pub texture: Option<FaceTexture>,
}

impl Face {
    /// Create an untextured face
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self {
            indices: [a, b, c],
            texture: None,
        }
    }

    /// Create a textured face
    pub fn textured(indices: [usize; 3], texture_indices: [usize; 3], material: usize) -> Self {
        Self {
            indices,
            texture: Some(FaceTexture {
                indices: texture_indices,
                material,
            }),
        }
    }

    pub fn is_textured(&self) -> bool {
        self.texture.is_some()
    }

    pub fn material(&self) -> Option<usize> {
        self.texture.map(|t| t.material)
    }
}

impl From<[usize; 3]> for Face {
    fn from(indices: [usize; 3]) -> Self {
        Self {
            indices,
            texture: None,
        }
    }
}

/// An unordered pair of vertex indices, stored smaller index first.
///
/// Two edges compare (and hash) equal iff they join the same two vertices,
/// regardless of the order the endpoints were given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    v1: usize,
    v2: usize,
}

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { v1: a, v2: b }
        } else {
            Self { v1: b, v2: a }
        }
    }
}
