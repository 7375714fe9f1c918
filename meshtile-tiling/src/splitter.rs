//! Plane splitting of meshes
//!
//! A mesh is cut by the plane `axis = value` into a left part (below the
//! plane) and a right part (above it). Faces on one side are copied as they
//! are. Faces crossing the plane are clipped on each side, with new vertices
//! at the exact crossing points, and re-triangulated.

use meshtile_core::{lerp_tex, Axis, Edge, Face, FaceTexture, Mesh, Point3d, Result, TexCoord};
use std::collections::HashMap;

const UNUSED: usize = usize::MAX;

/// The two halves of a split and the work it took
#[derive(Debug, Clone, Default)]
pub struct SplitResult {
    pub left: Mesh,
    pub right: Mesh,
    /// Faces routed plus crossing vertices created
    pub operations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Both,
}

/// A crossing of a face edge with the plane
#[derive(Debug, Clone, Copy)]
struct Crossing {
    edge: Edge,
    point: Point3d,
    /// Texture corners in canonical vertex order and the interpolated value
    texture: Option<([usize; 2], TexCoord)>,
}

/// A corner of a clipped polygon
#[derive(Debug, Clone, Copy)]
enum Corner {
    Original(usize),
    Cut(Crossing),
}

/// Builds one side's mesh with compact vertex and texture lists.
struct SideBuilder<'a> {
    source: &'a Mesh,
    mesh: Mesh,
    vertex_map: Vec<usize>,
    tex_map: Vec<usize>,
    cut_vertices: HashMap<Edge, usize>,
    cut_tex: HashMap<(Edge, [usize; 2]), usize>,
    created: usize,
}

impl<'a> SideBuilder<'a> {
    fn new(source: &'a Mesh) -> Self {
        Self {
            source,
            mesh: Mesh {
                materials: source.materials.clone(),
                ..Mesh::default()
            },
            vertex_map: vec![UNUSED; source.vertices.len()],
            tex_map: vec![UNUSED; source.texture_vertices.len()],
            cut_vertices: HashMap::new(),
            cut_tex: HashMap::new(),
            created: 0,
        }
    }

    fn vertex(&mut self, src: usize) -> usize {
        if self.vertex_map[src] == UNUSED {
            self.vertex_map[src] = self.mesh.add_vertex(self.source.vertices[src]);
        }
        self.vertex_map[src]
    }

    fn tex(&mut self, src: usize) -> usize {
        if self.tex_map[src] == UNUSED {
            self.tex_map[src] = self
                .mesh
                .add_texture_vertex(self.source.texture_vertices[src]);
        }
        self.tex_map[src]
    }

    fn cut_vertex(&mut self, crossing: &Crossing) -> usize {
        if let Some(&index) = self.cut_vertices.get(&crossing.edge) {
            return index;
        }
        let index = self.mesh.add_vertex(crossing.point);
        self.cut_vertices.insert(crossing.edge, index);
        self.created += 1;
        index
    }

    fn cut_tex(&mut self, edge: Edge, corners: [usize; 2], uv: TexCoord) -> usize {
        *self
            .cut_tex
            .entry((edge, corners))
            .or_insert_with(|| self.mesh.add_texture_vertex(uv))
    }

    fn copy_face(&mut self, face: &Face) {
        let indices = face.indices.map(|i| self.vertex(i));
        let texture = face.texture.map(|t| FaceTexture {
            indices: t.indices.map(|i| self.tex(i)),
            material: t.material,
        });
        self.mesh.faces.push(Face { indices, texture });
    }

    /// Emit a clipped polygon as a fan from its first cut corner.
    fn add_polygon(&mut self, face: &Face, corners: &[Corner]) {
        let mut vertices = Vec::with_capacity(corners.len());
        let mut uvs = Vec::with_capacity(corners.len());
        for corner in corners {
            match corner {
                Corner::Original(k) => {
                    vertices.push(self.vertex(face.indices[*k]));
                    if let Some(t) = face.texture {
                        uvs.push(self.tex(t.indices[*k]));
                    }
                }
                Corner::Cut(crossing) => {
                    vertices.push(self.cut_vertex(crossing));
                    if let Some((tex_corners, uv)) = crossing.texture {
                        uvs.push(self.cut_tex(crossing.edge, tex_corners, uv));
                    }
                }
            }
        }

        let start = corners
            .iter()
            .position(|c| matches!(c, Corner::Cut(_)))
            .unwrap_or(0);
        let n = corners.len();
        for k in 1..n - 1 {
            let (a, b, c) = (start, (start + k) % n, (start + k + 1) % n);
            let indices = [vertices[a], vertices[b], vertices[c]];
            let texture = face.texture.map(|t| FaceTexture {
                indices: [uvs[a], uvs[b], uvs[c]],
                material: t.material,
            });
            self.mesh.faces.push(Face { indices, texture });
        }
    }
}

fn classify(mesh: &Mesh, face: &Face, axis: Axis, value: f64) -> Side {
    let mut below = false;
    let mut above = false;
    for &i in &face.indices {
        let c = axis.component(&mesh.vertices[i]);
        below |= c < value;
        above |= c > value;
    }
    match (below, above) {
        (true, true) => Side::Both,
        (true, false) => Side::Left,
        // on the plane or above it
        (false, _) => Side::Right,
    }
}

/// Crossing of edge `a`-`b` (face corners `ka`, `kb`), computed from the
/// lower vertex index so both neighbours of the edge get the same point.
fn crossing(mesh: &Mesh, face: &Face, ka: usize, kb: usize, axis: Axis, value: f64) -> Crossing {
    let (ka, kb) = if face.indices[ka] <= face.indices[kb] {
        (ka, kb)
    } else {
        (kb, ka)
    };
    let (a, b) = (face.indices[ka], face.indices[kb]);
    let (point, t) = axis.cut(&mesh.vertices[a], &mesh.vertices[b], value);
    let texture = face.texture.map(|tex| {
        let corners = [tex.indices[ka], tex.indices[kb]];
        let uv = lerp_tex(
            &mesh.texture_vertices[corners[0]],
            &mesh.texture_vertices[corners[1]],
            t,
        );
        (corners, uv)
    });
    Crossing {
        edge: Edge::new(a, b),
        point,
        texture,
    }
}

/// Clip a straddling face against both half-spaces. Plane vertices belong
/// to both polygons.
fn clip(mesh: &Mesh, face: &Face, axis: Axis, value: f64) -> (Vec<Corner>, Vec<Corner>) {
    let c = face.indices.map(|i| axis.component(&mesh.vertices[i]));
    let mut left = Vec::with_capacity(4);
    let mut right = Vec::with_capacity(4);

    for k in 0..3 {
        let next = (k + 1) % 3;
        if c[k] <= value {
            left.push(Corner::Original(k));
        }
        if c[k] >= value {
            right.push(Corner::Original(k));
        }
        if (c[k] < value && c[next] > value) || (c[k] > value && c[next] < value) {
            let cut = Corner::Cut(crossing(mesh, face, k, next, axis, value));
            left.push(cut);
            right.push(cut);
        }
    }
    (left, right)
}

/// Split `mesh` by the plane `axis = value`.
///
/// A face with no vertex strictly below `value` goes right, including faces
/// lying in the plane; a face with no vertex strictly above it goes left.
/// Both halves carry the parent's material list.
pub fn split_mesh(mesh: &Mesh, axis: Axis, value: f64) -> Result<SplitResult> {
    mesh.validate()?;

    let sides: Vec<Side> = mesh
        .faces
        .iter()
        .map(|f| classify(mesh, f, axis, value))
        .collect();

    let mut operations = mesh.faces.len();
    if sides.iter().all(|&s| s == Side::Right) || sides.iter().all(|&s| s == Side::Left) {
        let empty = Mesh {
            materials: mesh.materials.clone(),
            ..Mesh::default()
        };
        let (left, right) = match sides.first() {
            Some(Side::Left) => (mesh.clone(), empty),
            _ => (empty, mesh.clone()),
        };
        return Ok(SplitResult {
            left,
            right,
            operations,
        });
    }

    let mut left = SideBuilder::new(mesh);
    let mut right = SideBuilder::new(mesh);
    for (face, side) in mesh.faces.iter().zip(&sides) {
        match side {
            Side::Left => left.copy_face(face),
            Side::Right => right.copy_face(face),
            Side::Both => {
                let (l, r) = clip(mesh, face, axis, value);
                left.add_polygon(face, &l);
                right.add_polygon(face, &r);
            }
        }
    }

    operations += left.created + right.created;
    Ok(SplitResult {
        left: left.mesh,
        right: right.mesh,
        operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshtile_core::{Material, Vector3d};

    fn make_strip() -> Mesh {
        // two triangles spanning x in [0, 2]
        Mesh::from_vertices_and_faces(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(2.0, 0.0, 0.0),
                Point3d::new(2.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn normals_agree(mesh: &Mesh, expected: Vector3d) -> bool {
        mesh.calculate_face_normals()
            .iter()
            .all(|n| (n - expected).norm() < 1e-9)
    }

    #[test]
    fn test_split_preserves_area() {
        let mesh = make_strip();
        for value in [0.3, 0.5, 1.0, 1.7] {
            let r = split_mesh(&mesh, Axis::X, value).unwrap();
            assert_relative_eq!(
                r.left.surface_area() + r.right.surface_area(),
                mesh.surface_area(),
                epsilon = 1e-12
            );
            assert!(r.left.vertices.iter().all(|p| p.x <= value));
            assert!(r.right.vertices.iter().all(|p| p.x >= value));
            assert!(r.left.validate().is_ok());
            assert!(r.right.validate().is_ok());
        }
    }

    #[test]
    fn test_split_keeps_winding() {
        let mesh = make_strip();
        let r = split_mesh(&mesh, Axis::X, 0.5).unwrap();
        let up = Vector3d::new(0.0, 0.0, 1.0);
        assert!(normals_agree(&r.left, up));
        assert!(normals_agree(&r.right, up));
    }

    #[test]
    fn test_one_sided_split_returns_input() {
        let mesh = make_strip();
        let r = split_mesh(&mesh, Axis::X, -1.0).unwrap();
        assert!(r.left.is_empty());
        assert_eq!(r.right.vertices, mesh.vertices);
        assert_eq!(r.right.faces, mesh.faces);

        let r = split_mesh(&mesh, Axis::Y, 5.0).unwrap();
        assert!(r.right.is_empty());
        assert_eq!(r.left.faces, mesh.faces);
        assert_eq!(r.operations, 2);
    }

    #[test]
    fn test_plane_touching_faces_stay_whole() {
        let mesh = make_strip();
        // x = 0 and x = 2 only touch the strip
        let r = split_mesh(&mesh, Axis::X, 0.0).unwrap();
        assert!(r.left.is_empty());
        assert_eq!(r.right.face_count(), 2);

        let r = split_mesh(&mesh, Axis::X, 2.0).unwrap();
        assert!(r.right.is_empty());
        assert_eq!(r.left.face_count(), 2);
    }

    #[test]
    fn test_crossing_vertices_are_shared() {
        // the cut at x = 1 crosses the shared diagonal once
        let mesh = make_strip();
        let r = split_mesh(&mesh, Axis::X, 1.0).unwrap();
        let on_plane = |m: &Mesh| m.vertices.iter().filter(|p| p.x == 1.0).count();
        // bottom edge, diagonal and top edge
        assert_eq!(on_plane(&r.left), 3);
        assert_eq!(on_plane(&r.right), 3);
        assert_eq!(r.operations, 2 + 6);
    }

    #[test]
    fn test_plane_through_vertex() {
        // vertex 2 lies on the plane, vertices 0 and 1 straddle it
        let mesh = Mesh::from_vertices_and_faces(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(2.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let r = split_mesh(&mesh, Axis::X, 1.0).unwrap();
        assert_eq!(r.left.face_count(), 1);
        assert_eq!(r.right.face_count(), 1);
        assert_relative_eq!(r.left.surface_area(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(r.right.surface_area(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_textured_split_interpolates() {
        let mut mesh = Mesh::new();
        for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]] {
            mesh.add_vertex(Point3d::new(p[0], p[1], 0.0));
            mesh.add_texture_vertex(TexCoord::new(p[0] / 4.0, p[1] / 4.0));
        }
        let m = mesh.add_material(Material::new("a").with_texture("a.png"));
        mesh.add_textured_face([0, 1, 2], [0, 1, 2], m);

        let r = split_mesh(&mesh, Axis::X, 1.0).unwrap();
        for side in [&r.left, &r.right] {
            assert!(side.validate().is_ok());
            assert_eq!(side.materials.len(), 1);
            for face in &side.faces {
                let t = face.texture.unwrap();
                for k in 0..3 {
                    let p = side.vertices[face.indices[k]];
                    let uv = side.texture_vertices[t.indices[k]];
                    // the texture is a linear function of position
                    assert_relative_eq!(uv.x, p.x / 4.0, epsilon = 1e-12);
                    assert_relative_eq!(uv.y, p.y / 4.0, epsilon = 1e-12);
                }
            }
        }
        assert_eq!(r.left.face_count() + r.right.face_count(), 3);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut mesh = make_strip();
        mesh.add_face([0, 1, 9]);
        assert!(split_mesh(&mesh, Axis::X, 1.0).is_err());
    }
}
