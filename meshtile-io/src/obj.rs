//! OBJ format support
//!
//! The reader accepts triangulated, optionally textured OBJ files with their
//! MTL libraries and rejects anything the tiling pipeline cannot represent:
//! polygons with more than three corners, free-form geometry, negative texture
//! coordinates and references to undefined materials. Indices are 1-based in
//! the file and 0-based in [`Mesh`].

use crate::error::IoError;
use crate::mtl::{MtlReader, MtlWriter};
use crate::{MeshReader, MeshWriter};
use meshtile_core::{Face, Material, Mesh, Point3d, Result, TexCoord};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::SplitWhitespace;
use tracing::{debug, warn};

/// Free-form geometry statements we refuse to load
const FREE_FORM_DIRECTIVES: &[&str] = &[
    "vp", "cstype", "deg", "bmat", "step", "curv", "curv2", "surf", "parm", "trim", "hole",
    "scrv", "sp", "end", "con",
];

const DEFAULT_MATERIAL: &str = "default";

pub struct ObjReader;
pub struct ObjWriter;

/// Options controlling OBJ output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjWriteOptions {
    /// Compact the vertex lists to entries referenced by faces before writing
    pub remove_unused_vertices: bool,
    /// Emit `mtllib`/`usemtl` statements and a sibling `.mtl` file
    pub write_materials: bool,
}

impl Default for ObjWriteOptions {
    fn default() -> Self {
        Self {
            remove_unused_vertices: true,
            write_materials: true,
        }
    }
}

impl ObjWriteOptions {
    pub fn with_remove_unused_vertices(mut self, remove: bool) -> Self {
        self.remove_unused_vertices = remove;
        self
    }

    pub fn with_write_materials(mut self, write: bool) -> Self {
        self.write_materials = write;
        self
    }
}

/// Parser state while walking an OBJ file
struct ObjParser<'a> {
    base_dir: Option<&'a Path>,
    mesh: Mesh,
    library: Vec<Material>,
    current_material: Option<usize>,
}

impl<'a> ObjParser<'a> {
    fn new(base_dir: Option<&'a Path>) -> Self {
        Self {
            base_dir,
            mesh: Mesh::new(),
            library: Vec::new(),
            current_material: None,
        }
    }

    fn parse_line(&mut self, line_no: usize, line: &str) -> std::result::Result<(), IoError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(line_no, "v", &mut tokens, None)?;
                self.mesh.add_vertex(Point3d::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(line_no, "vt", &mut tokens, Some(0.0))?;
                if u < 0.0 || v < 0.0 {
                    return Err(IoError::parse(
                        line_no,
                        format!("negative texture coordinate ({}, {})", u, v),
                    ));
                }
                self.mesh.add_texture_vertex(TexCoord::new(u, v));
            }
            "f" => {
                let corners: Vec<&str> = tokens.collect();
                if corners.len() != 3 {
                    return Err(IoError::unsupported(
                        line_no,
                        format!("face with {} vertices, only triangles are supported", corners.len()),
                    ));
                }
                self.parse_face(line_no, &corners)?;
            }
            "mtllib" => {
                let rest = line[keyword.len()..].trim();
                self.load_library(line_no, rest)?;
            }
            "usemtl" => {
                let name = line[keyword.len()..].trim();
                self.use_material(line_no, name)?;
            }
            "vn" | "o" | "g" | "s" | "mg" | "l" | "p" => {}
            k if FREE_FORM_DIRECTIVES.contains(&k) => {
                return Err(IoError::unsupported(
                    line_no,
                    format!("free-form directive '{}'", k),
                ));
            }
            other => {
                debug!(line = line_no, keyword = other, "Skipping unknown OBJ statement");
            }
        }
        Ok(())
    }

    fn parse_face(&mut self, line_no: usize, corners: &[&str]) -> std::result::Result<(), IoError> {
        let mut indices = [0usize; 3];
        let mut tex = [None; 3];

        for (k, corner) in corners.iter().enumerate() {
            let mut parts = corner.split('/');
            let v = parts.next().unwrap_or_default();
            indices[k] = resolve_index(line_no, v, self.mesh.vertices.len(), "vertex")?;
            if let Some(t) = parts.next().filter(|t| !t.is_empty()) {
                tex[k] = Some(resolve_index(
                    line_no,
                    t,
                    self.mesh.texture_vertices.len(),
                    "texture vertex",
                )?);
            }
        }

        match tex {
            [Some(ta), Some(tb), Some(tc)] => {
                let material = self.current_or_default_material();
                self.mesh
                    .faces
                    .push(Face::textured(indices, [ta, tb, tc], material));
            }
            [None, None, None] => self.mesh.faces.push(Face::from(indices)),
            _ => {
                return Err(IoError::parse(
                    line_no,
                    "face mixes corners with and without texture coordinates",
                ))
            }
        }
        Ok(())
    }

    fn current_or_default_material(&mut self) -> usize {
        if let Some(m) = self.current_material {
            return m;
        }
        let m = match self.mesh.material_index(DEFAULT_MATERIAL) {
            Some(m) => m,
            None => self.mesh.add_material(Material::new(DEFAULT_MATERIAL)),
        };
        self.current_material = Some(m);
        m
    }

    fn load_library(&mut self, line_no: usize, file: &str) -> std::result::Result<(), IoError> {
        if file.is_empty() {
            return Err(IoError::parse(line_no, "mtllib without a file name"));
        }
        let path = match self.base_dir {
            Some(dir) => dir.join(file),
            None => Path::new(file).to_path_buf(),
        };
        match File::open(&path) {
            Ok(f) => {
                let materials = MtlReader::read_from(BufReader::new(f))?;
                debug!(path = %path.display(), count = materials.len(), "Loaded material library");
                self.library.extend(materials);
            }
            // an unresolved library only matters once a usemtl needs it
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Material library not found");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn use_material(&mut self, line_no: usize, name: &str) -> std::result::Result<(), IoError> {
        if let Some(m) = self.mesh.material_index(name) {
            self.current_material = Some(m);
            return Ok(());
        }
        let material = self
            .library
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| IoError::MissingMaterial {
                name: name.to_string(),
                line: line_no,
            })?;
        self.current_material = Some(self.mesh.add_material(material));
        Ok(())
    }
}

fn parse_floats<const N: usize>(
    line_no: usize,
    keyword: &str,
    tokens: &mut SplitWhitespace<'_>,
    fill: Option<f64>,
) -> std::result::Result<[f64; N], IoError> {
    let mut out = [0.0; N];
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = match tokens.next() {
            Some(t) => t.parse::<f64>().map_err(|_| {
                IoError::parse(line_no, format!("invalid number '{}' in {} statement", t, keyword))
            })?,
            None if k > 0 && fill.is_some() => fill.unwrap_or_default(),
            None => {
                return Err(IoError::parse(
                    line_no,
                    format!("{} statement needs {} components", keyword, N),
                ))
            }
        };
    }
    Ok(out)
}

/// Turn a 1-based (or negative, relative) OBJ index into a 0-based one.
fn resolve_index(
    line_no: usize,
    token: &str,
    count: usize,
    what: &str,
) -> std::result::Result<usize, IoError> {
    let raw: i64 = token
        .parse()
        .map_err(|_| IoError::parse(line_no, format!("invalid {} index '{}'", what, token)))?;
    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        count as i64 + raw
    } else {
        return Err(IoError::parse(line_no, format!("{} index 0 is not valid", what)));
    };
    if resolved < 0 || resolved as usize >= count {
        return Err(IoError::parse(
            line_no,
            format!("{} index {} out of range ({} defined)", what, raw, count),
        ));
    }
    Ok(resolved as usize)
}

impl ObjReader {
    /// Parse OBJ text. `base_dir` resolves `mtllib` paths; without it
    /// libraries are looked up relative to the working directory.
    pub fn read_from<R: BufRead>(reader: R, base_dir: Option<&Path>) -> Result<Mesh> {
        let mut parser = ObjParser::new(base_dir);
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(IoError::from)?;
            parser.parse_line(i + 1, &line)?;
        }
        let mesh = parser.mesh;
        mesh.validate()?;
        debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            materials = mesh.materials.len(),
            "Parsed OBJ"
        );
        Ok(mesh)
    }
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => IoError::Io(e),
        })?;
        Self::read_from(BufReader::new(file), path.parent())
    }
}

impl ObjWriter {
    /// Write OBJ text. When `mtllib` is given it is referenced from the file
    /// and `usemtl` groups are emitted for textured faces.
    pub fn write_to<W: Write>(mesh: &Mesh, writer: &mut W, mtllib: Option<&str>) -> Result<()> {
        writeln!(writer, "# meshtile")?;
        if let Some(lib) = mtllib {
            writeln!(writer, "mtllib {}", lib)?;
        }

        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for vt in &mesh.texture_vertices {
            writeln!(writer, "vt {} {}", vt.x, vt.y)?;
        }

        let mut active_material = None;
        for face in &mesh.faces {
            let [a, b, c] = face.indices;
            match face.texture {
                Some(texture) => {
                    if mtllib.is_some() && active_material != Some(texture.material) {
                        let name = mesh
                            .materials
                            .get(texture.material)
                            .map(|m| m.name.as_str())
                            .unwrap_or(DEFAULT_MATERIAL);
                        writeln!(writer, "usemtl {}", name)?;
                        active_material = Some(texture.material);
                    }
                    let [ta, tb, tc] = texture.indices;
                    writeln!(
                        writer,
                        "f {}/{} {}/{} {}/{}",
                        a + 1,
                        ta + 1,
                        b + 1,
                        tb + 1,
                        c + 1,
                        tc + 1
                    )?;
                }
                None => writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?,
            }
        }
        Ok(())
    }

    /// Write `mesh` to `path`, plus a sibling `.mtl` when it has materials.
    pub fn write_mesh_with_options<P: AsRef<Path>>(
        mesh: &Mesh,
        path: P,
        options: &ObjWriteOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        let mesh: Cow<'_, Mesh> = if options.remove_unused_vertices {
            let mut compact = mesh.clone();
            let removed = compact.remove_unused_vertices();
            compact.remove_unused_materials();
            debug!(removed, "Removed unused vertices before writing");
            Cow::Owned(compact)
        } else {
            Cow::Borrowed(mesh)
        };

        let mtllib = if options.write_materials && !mesh.materials.is_empty() {
            let mtl_path = path.with_extension("mtl");
            let mut mtl = BufWriter::new(File::create(&mtl_path)?);
            MtlWriter::write_to(&mesh.materials, &mut mtl)?;
            mtl.flush()?;
            mtl_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        } else {
            None
        };

        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_to(&mesh, &mut writer, mtllib.as_deref())?;
        writer.flush()?;
        Ok(())
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
        Self::write_mesh_with_options(mesh, path, &ObjWriteOptions::default())
    }
}
