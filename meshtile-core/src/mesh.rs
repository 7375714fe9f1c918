//! Mesh data structures and functionality

use crate::bounds::BoundingBox;
use crate::error::{Error, Result};
use crate::face::{Face, FaceTexture};
use crate::point::*;
use serde::{Deserialize, Serialize};

const UNUSED: usize = usize::MAX;

/// A surface material as referenced by textured faces
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Diffuse color (`Kd`)
    pub diffuse: Option<[f64; 3]>,
    /// Diffuse texture map path (`map_Kd`), as written in the material library
    pub texture: Option<String>,
}

impl Material {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_texture<S: Into<String>>(mut self, texture: S) -> Self {
        self.texture = Some(texture.into());
        self
    }

    pub fn with_diffuse(mut self, diffuse: [f64; 3]) -> Self {
        self.diffuse = Some(diffuse);
        self
    }
}

/// An indexed triangle mesh with optional texture coordinates and materials.
///
/// Every face index must stay within the vertex list, and textured faces must
/// also index valid texture vertices and materials. Bounds and centroid are
/// derived on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3d>,
    pub faces: Vec<Face>,
    pub texture_vertices: Vec<TexCoord>,
    pub materials: Vec<Material>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an untextured mesh from vertices and index triples
    pub fn from_vertices_and_faces(vertices: Vec<Point3d>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces: faces.into_iter().map(Face::from).collect(),
            texture_vertices: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no faces
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// True if any face carries texture corners
    pub fn is_textured(&self) -> bool {
        self.faces.iter().any(Face::is_textured)
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3d) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a texture vertex to the mesh
    pub fn add_texture_vertex(&mut self, uv: TexCoord) -> usize {
        let index = self.texture_vertices.len();
        self.texture_vertices.push(uv);
        index
    }

    /// Add a material to the mesh
    pub fn add_material(&mut self, material: Material) -> usize {
        let index = self.materials.len();
        self.materials.push(material);
        index
    }

    /// Find a material by name
    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Add an untextured face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(Face::from(face));
    }

    /// Add a textured face to the mesh
    pub fn add_textured_face(&mut self, indices: [usize; 3], texture: [usize; 3], material: usize) {
        self.faces.push(Face::textured(indices, texture, material));
    }

    /// The corner positions of a face
    #[inline]
    pub fn face_vertices(&self, face: &Face) -> [Point3d; 3] {
        let [a, b, c] = face.indices;
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Area of a face
    pub fn face_area(&self, face: &Face) -> f64 {
        let [a, b, c] = self.face_vertices(face);
        triangle_area(&a, &b, &c)
    }

    /// Total triangle area
    pub fn surface_area(&self) -> f64 {
        self.faces.iter().map(|f| self.face_area(f)).sum()
    }

    /// Calculate unit face normals. Degenerate faces yield a zero vector.
    pub fn calculate_face_normals(&self) -> Vec<Vector3d> {
        self.faces
            .iter()
            .map(|face| {
                let [v0, v1, v2] = self.face_vertices(face);
                (v1 - v0)
                    .cross(&(v2 - v0))
                    .try_normalize(f64::EPSILON)
                    .unwrap_or_else(Vector3d::zeros)
            })
            .collect()
    }

    /// Tight bounds of the vertex list, `None` for a mesh without vertices
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Mean of all vertex positions, `None` for a mesh without vertices
    pub fn vertex_centroid(&self) -> Option<Point3d> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3d::zeros(), |acc, v| acc + v.coords);
        Some(Point3d::from(sum / self.vertices.len() as f64))
    }

    /// Check the index and texture invariants.
    ///
    /// Fails with [`Error::InvalidData`] on the first out-of-range vertex,
    /// texture or material index, or on a negative texture coordinate.
    pub fn validate(&self) -> Result<()> {
        if let Some((i, uv)) = self
            .texture_vertices
            .iter()
            .enumerate()
            .find(|(_, uv)| uv.x < 0.0 || uv.y < 0.0)
        {
            return Err(Error::InvalidData(format!(
                "texture vertex {} has negative coordinates ({}, {})",
                i, uv.x, uv.y
            )));
        }

        let nv = self.vertices.len();
        let nt = self.texture_vertices.len();
        let nm = self.materials.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.indices.iter().find(|&&v| v >= nv) {
                return Err(Error::InvalidData(format!(
                    "face {} references vertex {} but mesh has {} vertices",
                    fi, bad, nv
                )));
            }
            if let Some(FaceTexture { indices, material }) = face.texture {
                if let Some(&bad) = indices.iter().find(|&&t| t >= nt) {
                    return Err(Error::InvalidData(format!(
                        "face {} references texture vertex {} but mesh has {}",
                        fi, bad, nt
                    )));
                }
                if material >= nm {
                    return Err(Error::InvalidData(format!(
                        "face {} references material {} but mesh has {}",
                        fi, material, nm
                    )));
                }
            }
        }
        Ok(())
    }

    /// Drop vertices and texture vertices no face references, remapping the
    /// face indices. Returns the number of vertices removed.
    pub fn remove_unused_vertices(&mut self) -> usize {
        let mut vertex_map = vec![UNUSED; self.vertices.len()];
        let mut tex_map = vec![UNUSED; self.texture_vertices.len()];
        let mut new_vertices = Vec::with_capacity(self.vertices.len());
        let mut new_tex = Vec::with_capacity(self.texture_vertices.len());

        for face in &mut self.faces {
            for idx in face.indices.iter_mut() {
                if vertex_map[*idx] == UNUSED {
                    vertex_map[*idx] = new_vertices.len();
                    new_vertices.push(self.vertices[*idx]);
                }
                *idx = vertex_map[*idx];
            }
            if let Some(texture) = face.texture.as_mut() {
                for idx in texture.indices.iter_mut() {
                    if tex_map[*idx] == UNUSED {
                        tex_map[*idx] = new_tex.len();
                        new_tex.push(self.texture_vertices[*idx]);
                    }
                    *idx = tex_map[*idx];
                }
            }
        }

        let removed = self.vertices.len() - new_vertices.len();
        self.vertices = new_vertices;
        self.texture_vertices = new_tex;
        removed
    }

    /// Drop materials no face references, remapping face material indices.
    pub fn remove_unused_materials(&mut self) -> usize {
        let mut used = vec![false; self.materials.len()];
        for face in &self.faces {
            if let Some(m) = face.material() {
                used[m] = true;
            }
        }

        let mut remap = vec![UNUSED; self.materials.len()];
        let mut kept = Vec::new();
        for (i, material) in self.materials.drain(..).enumerate() {
            if used[i] {
                remap[i] = kept.len();
                kept.push(material);
            }
        }
        let removed = used.len() - kept.len();
        self.materials = kept;

        for face in &mut self.faces {
            if let Some(texture) = face.texture.as_mut() {
                texture.material = remap[texture.material];
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_quad() -> Mesh {
        Mesh::from_vertices_and_faces(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn make_textured_quad() -> Mesh {
        let mut mesh = make_quad();
        mesh.faces.clear();
        for uv in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
            mesh.add_texture_vertex(TexCoord::new(uv[0], uv[1]));
        }
        let m = mesh.add_material(Material::new("stone").with_texture("stone.jpg"));
        mesh.add_textured_face([0, 1, 2], [0, 1, 2], m);
        mesh.add_textured_face([0, 2, 3], [0, 2, 3], m);
        mesh
    }

    #[test]
    fn test_counts() {
        let mesh = make_quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert!(!mesh.is_empty());
        assert!(!mesh.is_textured());
        assert!(Mesh::new().is_empty());
        assert!(make_textured_quad().is_textured());
    }

    #[test]
    fn test_area_and_normals() {
        let mesh = make_quad();
        assert_relative_eq!(mesh.surface_area(), 1.0);
        for n in mesh.calculate_face_normals() {
            assert_relative_eq!(n, Vector3d::new(0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn test_bounds_and_centroid() {
        let mesh = make_quad();
        let bb = mesh.bounding_box().unwrap();
        assert_eq!(bb.min, Point3d::new(0.0, 0.0, 0.0));
        assert_eq!(bb.max, Point3d::new(1.0, 1.0, 0.0));
        assert_relative_eq!(mesh.vertex_centroid().unwrap(), Point3d::new(0.5, 0.5, 0.0));
        assert!(Mesh::new().bounding_box().is_none());
        assert!(Mesh::new().vertex_centroid().is_none());
    }

    #[test]
    fn test_validate_ok() {
        assert!(make_quad().validate().is_ok());
        assert!(make_textured_quad().validate().is_ok());
    }

    #[test]
    fn test_validate_out_of_range_vertex() {
        let mut mesh = make_quad();
        mesh.add_face([0, 1, 7]);
        assert!(matches!(mesh.validate(), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_validate_texture_errors() {
        let mut mesh = make_textured_quad();
        mesh.texture_vertices[1] = TexCoord::new(-0.1, 0.5);
        assert!(mesh.validate().is_err());

        let mut mesh = make_textured_quad();
        mesh.add_textured_face([0, 1, 2], [0, 1, 9], 0);
        assert!(mesh.validate().is_err());

        let mut mesh = make_textured_quad();
        mesh.add_textured_face([0, 1, 2], [0, 1, 2], 3);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_remove_unused_vertices() {
        let mut mesh = make_textured_quad();
        mesh.add_vertex(Point3d::new(5.0, 5.0, 5.0));
        mesh.add_texture_vertex(TexCoord::new(0.5, 0.5));
        mesh.faces.pop();

        let removed = mesh.remove_unused_vertices();
        assert_eq!(removed, 2);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.texture_vertices.len(), 3);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.faces[0].indices, [0, 1, 2]);
    }

    #[test]
    fn test_remove_unused_materials() {
        let mut mesh = make_textured_quad();
        mesh.materials.insert(0, Material::new("unused"));
        for face in &mut mesh.faces {
            if let Some(t) = face.texture.as_mut() {
                t.material = 1;
            }
        }
        assert_eq!(mesh.remove_unused_materials(), 1);
        assert_eq!(mesh.materials.len(), 1);
        assert_eq!(mesh.faces[0].material(), Some(0));
    }
}
