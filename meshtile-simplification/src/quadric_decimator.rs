//! Quadric edge-collapse decimation
//!
//! The working mesh is an arena of vertex and triangle slots. Collapsed
//! vertices and the faces they degenerate are tombstoned in place and the
//! arena is compacted once, when the result is taken with `to_mesh`.
//!
//! Positions are moved into a unit frame (centred on the bounding box and
//! scaled by its diagonal) for the duration of a run, so errors and
//! thresholds do not depend on the model's units or placement. Vertices that
//! never move are handed back with their exact input coordinates.
//!
//! Each pass gathers every edge whose cached error is below the pass
//! threshold and collapses them in ascending error order. The threshold grows
//! with the pass index, so cheap collapses happen first and the mesh degrades
//! gradually. A collapse is rejected when any surviving face around either
//! endpoint would become degenerate or flip.

use crate::options::DecimatorOptions;
use crate::quadric::SymmetricMatrix;
use crate::{DecimationAlgorithm, DecimationStatus, DecimatorState};
use meshtile_core::{
    lerp_point, BoundingBox, Edge, Error, Face, FaceTexture, Material, Mesh, Point3d, Result,
    TexCoord, Vector3d,
};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Fixed pass threshold used by lossless decimation, in squared units of the
/// bounding-box diagonal. Only collapses that leave the surface where it was,
/// up to rounding, pass.
pub const LOSSLESS_THRESHOLD: f64 = 64.0 * f64::EPSILON;

/// Below this the quadric's 3x3 block is treated as singular
const DET_EPSILON: f64 = 1e-10;

/// Two remaining edges this close to parallel make a sliver
const PARALLEL_LIMIT: f64 = 0.999;

/// Minimum cosine between a face normal before and after a collapse
const FLIP_LIMIT: f64 = 0.2;

const UNUSED: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Vertex {
    /// Position in the unit frame
    p: Point3d,
    /// Input position, kept while the vertex sits where it started
    exact: Option<Point3d>,
    q: SymmetricMatrix,
    /// Incident faces live in `refs[tstart..tstart + tcount]`
    tstart: usize,
    tcount: usize,
    border: bool,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct Triangle {
    v: [usize; 3],
    texture: Option<FaceTexture>,
    /// Collapse error of edges (0,1), (1,2), (2,0) and their minimum
    err: [f64; 4],
    n: Vector3d,
    deleted: bool,
    /// Touched by a collapse in the current pass; cached errors are stale
    dirty: bool,
}

/// A face incident to a vertex, and which corner the vertex is
#[derive(Debug, Clone, Copy, Default)]
struct Ref {
    tid: usize,
    tvertex: usize,
}

#[derive(Debug, Clone, Copy)]
struct CollapseCost {
    cost: f64,
    tid: usize,
    edge: usize,
}

impl PartialEq for CollapseCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for CollapseCost {}

impl PartialOrd for CollapseCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapseCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first, then lowest triangle and edge
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.tid.cmp(&self.tid))
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

#[derive(Debug, Default)]
struct PassOutcome {
    collapses: usize,
    /// Candidates left for a later pass because their error was too high
    deferred: usize,
    /// Collapses refused because they would undershoot the target
    overshoot: usize,
    floor_reached: bool,
}

/// Quadric error metric edge-collapse decimator.
///
/// ```
/// use meshtile_core::{Mesh, Point3d};
/// use meshtile_simplification::{DecimationAlgorithm, DecimatorOptions, QuadricDecimator};
///
/// let mesh = Mesh::from_vertices_and_faces(
///     vec![
///         Point3d::new(0.0, 0.0, 0.0),
///         Point3d::new(1.0, 0.0, 0.0),
///         Point3d::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// );
/// let mut decimator = QuadricDecimator::new(DecimatorOptions::default());
/// decimator.initialize(&mesh).unwrap();
/// decimator.decimate_mesh(1, &mut |_| {}).unwrap();
/// assert_eq!(decimator.to_mesh().unwrap().face_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct QuadricDecimator {
    options: DecimatorOptions,
    state: DecimatorState,
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
    refs: Vec<Ref>,
    texture_vertices: Vec<TexCoord>,
    materials: Vec<Material>,
    /// Unit frame: input = center + p * scale
    center: Point3d,
    scale: f64,
    original_triangles: usize,
    live_triangles: usize,
    live_vertices: usize,
    collapsed: bool,
    removed0: Vec<bool>,
    removed1: Vec<bool>,
}

impl Default for QuadricDecimator {
    fn default() -> Self {
        Self::new(DecimatorOptions::default())
    }
}

impl QuadricDecimator {
    pub fn new(options: DecimatorOptions) -> Self {
        Self {
            options,
            state: DecimatorState::Uninitialized,
            vertices: Vec::new(),
            triangles: Vec::new(),
            refs: Vec::new(),
            texture_vertices: Vec::new(),
            materials: Vec::new(),
            center: Point3d::origin(),
            scale: 1.0,
            original_triangles: 0,
            live_triangles: 0,
            live_vertices: 0,
            collapsed: false,
            removed0: Vec::new(),
            removed1: Vec::new(),
        }
    }

    pub fn options(&self) -> &DecimatorOptions {
        &self.options
    }

    /// Triangles not yet collapsed away
    pub fn live_triangle_count(&self) -> usize {
        self.live_triangles
    }

    /// Vertices referenced by at least one live triangle
    pub fn live_vertex_count(&self) -> usize {
        self.live_vertices
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            DecimatorState::Initialized => Ok(()),
            DecimatorState::Uninitialized => Err(Error::Algorithm(
                "decimator has not been initialized".to_string(),
            )),
            DecimatorState::Decimated | DecimatorState::Finalized => Err(Error::Algorithm(
                "decimator already ran; initialize it again first".to_string(),
            )),
        }
    }

    fn vertex_floor_reached(&self) -> bool {
        self.options.max_vertex_count > 0 && self.live_vertices <= self.options.max_vertex_count
    }

    /// Rebuild the vertex to face references from the live triangles.
    fn update_references(&mut self) {
        for v in &mut self.vertices {
            v.tstart = 0;
            v.tcount = 0;
        }
        for t in self.triangles.iter().filter(|t| !t.deleted) {
            for &i in &t.v {
                self.vertices[i].tcount += 1;
            }
        }

        let mut tstart = 0;
        for v in &mut self.vertices {
            v.tstart = tstart;
            tstart += v.tcount;
            v.tcount = 0;
        }

        self.refs.clear();
        self.refs.resize(tstart, Ref::default());
        for (tid, t) in self.triangles.iter().enumerate() {
            if t.deleted {
                continue;
            }
            for (tvertex, &i) in t.v.iter().enumerate() {
                let v = &mut self.vertices[i];
                self.refs[v.tstart + v.tcount] = Ref { tid, tvertex };
                v.tcount += 1;
            }
        }
    }

    /// Seed quadrics from face planes, flag borders and cache edge errors.
    fn prepare(&mut self) {
        let mut edge_uses: HashMap<Edge, u32> = HashMap::with_capacity(self.triangles.len() * 2);
        for t in &self.triangles {
            for j in 0..3 {
                *edge_uses
                    .entry(Edge::new(t.v[j], t.v[(j + 1) % 3]))
                    .or_insert(0) += 1;
            }
        }

        for tid in 0..self.triangles.len() {
            let v = self.triangles[tid].v;
            let [pa, pb, pc] = v.map(|i| self.vertices[i].p);
            let normal = face_normal(&pa, &pb, &pc);

            if let Some(n) = normal {
                self.triangles[tid].n = n;
                let q = SymmetricMatrix::from_point_normal(&pa, &n);
                for &i in &v {
                    self.vertices[i].q += q;
                }
            }

            for j in 0..3 {
                let (i0, i1) = (v[j], v[(j + 1) % 3]);
                if edge_uses.get(&Edge::new(i0, i1)) != Some(&1) {
                    continue;
                }
                self.vertices[i0].border = true;
                self.vertices[i1].border = true;

                // constraint plane through the border edge, perpendicular to the face
                let (p0, p1) = (self.vertices[i0].p, self.vertices[i1].p);
                if let Some(side) = normal.and_then(|n| (p1 - p0).cross(&n).try_normalize(f64::EPSILON)) {
                    let q = SymmetricMatrix::from_point_normal(&p0, &side);
                    self.vertices[i0].q += q;
                    self.vertices[i1].q += q;
                }
            }
        }

        for tid in 0..self.triangles.len() {
            self.refresh_errors(tid);
        }
    }

    /// Error of collapsing `i0`-`i1` and the position the survivor moves to.
    ///
    /// Uses the quadric minimiser when it exists. Border edges and singular
    /// quadrics fall back to the best of the midpoint and the two endpoints,
    /// the midpoint winning ties.
    fn calculate_error(&self, i0: usize, i1: usize) -> (f64, Point3d) {
        let (v0, v1) = (&self.vertices[i0], &self.vertices[i1]);
        let q = v0.q + v1.q;

        if !(v0.border && v1.border) {
            if let Some(p) = q.minimizer(DET_EPSILON) {
                return (q.evaluate(&p), p);
            }
        }

        let mid = lerp_point(&v0.p, &v1.p, 0.5);
        [mid, v0.p, v1.p]
            .into_iter()
            .map(|p| (q.evaluate(&p), p))
            .fold((f64::INFINITY, mid), |best, candidate| {
                if candidate.0 < best.0 {
                    candidate
                } else {
                    best
                }
            })
    }

    fn refresh_errors(&mut self, tid: usize) {
        let [a, b, c] = self.triangles[tid].v;
        let e0 = self.calculate_error(a, b).0;
        let e1 = self.calculate_error(b, c).0;
        let e2 = self.calculate_error(c, a).0;
        self.triangles[tid].err = [e0, e1, e2, e0.min(e1).min(e2)];
    }

    /// Would moving `i0` to `p` degenerate or flip one of its faces?
    /// Faces shared with `i1` are flagged in `removed` instead.
    fn flipped(&self, p: &Point3d, i0: usize, i1: usize, removed: &mut Vec<bool>) -> bool {
        let v = &self.vertices[i0];
        removed.clear();
        removed.resize(v.tcount, false);

        for k in 0..v.tcount {
            let r = self.refs[v.tstart + k];
            let t = &self.triangles[r.tid];
            if t.deleted {
                continue;
            }

            let id1 = t.v[(r.tvertex + 1) % 3];
            let id2 = t.v[(r.tvertex + 2) % 3];
            if id1 == i1 || id2 == i1 {
                removed[k] = true;
                continue;
            }

            let d1 = (self.vertices[id1].p - p).try_normalize(f64::EPSILON);
            let d2 = (self.vertices[id2].p - p).try_normalize(f64::EPSILON);
            let (Some(d1), Some(d2)) = (d1, d2) else {
                return true;
            };
            if d1.dot(&d2).abs() > PARALLEL_LIMIT {
                return true;
            }
            let Some(n) = d1.cross(&d2).try_normalize(f64::EPSILON) else {
                return true;
            };
            if t.n != Vector3d::zeros() && n.dot(&t.n) < FLIP_LIMIT {
                return true;
            }
        }
        false
    }

    /// Re-map the texture corners at `vid` for the new position `p` by
    /// barycentric interpolation inside each surviving textured face.
    fn update_texture_coordinates(&mut self, vid: usize, p: &Point3d, removed: &[bool]) {
        let (tstart, tcount) = (self.vertices[vid].tstart, self.vertices[vid].tcount);
        for (k, &gone) in removed.iter().enumerate().take(tcount) {
            if gone {
                continue;
            }
            let r = self.refs[tstart + k];
            let t = &self.triangles[r.tid];
            let Some(texture) = t.texture.filter(|_| !t.deleted) else {
                continue;
            };
            let [a, b, c] = t.v.map(|i| self.vertices[i].p);
            let Some(w) = barycentric(p, &a, &b, &c) else {
                continue;
            };

            let [ta, tb, tc] = texture.indices.map(|i| self.texture_vertices[i].coords);
            let uv = ta * w[0] + tb * w[1] + tc * w[2];
            let index = self.texture_vertices.len();
            self.texture_vertices
                .push(TexCoord::new(uv.x.max(0.0), uv.y.max(0.0)));
            if let Some(texture) = self.triangles[r.tid].texture.as_mut() {
                texture.indices[r.tvertex] = index;
            }
        }
    }

    /// Point the live faces of `vid` at `i0`, tombstone the ones flagged in
    /// `removed` and append the survivors' references to `refs`.
    fn update_triangles(&mut self, i0: usize, vid: usize, removed: &[bool]) {
        let (tstart, tcount) = (self.vertices[vid].tstart, self.vertices[vid].tcount);
        for (k, &gone) in removed.iter().enumerate().take(tcount) {
            let r = self.refs[tstart + k];
            let t = &mut self.triangles[r.tid];
            if t.deleted {
                continue;
            }
            if gone {
                t.deleted = true;
                self.live_triangles -= 1;
                continue;
            }

            t.v[r.tvertex] = i0;
            t.dirty = true;
            let [a, b, c] = t.v.map(|i| self.vertices[i].p);
            if let Some(n) = face_normal(&a, &b, &c) {
                self.triangles[r.tid].n = n;
            }
            self.refresh_errors(r.tid);
            self.refs.push(r);
        }
    }

    /// Collapse `i1` into `i0` unless the move is refused.
    fn try_collapse(&mut self, i0: usize, i1: usize, target: usize, outcome: &mut PassOutcome) -> bool {
        let (v0, v1) = (&self.vertices[i0], &self.vertices[i1]);
        if v0.border != v1.border {
            return false;
        }
        if self.options.preserve_borders && (v0.border || v1.border) {
            return false;
        }

        let (_, p) = self.calculate_error(i0, i1);
        let exact = if p == v0.p {
            v0.exact
        } else if p == v1.p {
            v1.exact
        } else {
            None
        };

        let mut removed0 = std::mem::take(&mut self.removed0);
        let mut removed1 = std::mem::take(&mut self.removed1);

        let mut accepted =
            !self.flipped(&p, i0, i1, &mut removed0) && !self.flipped(&p, i1, i0, &mut removed1);

        if accepted {
            let doomed = removed0.iter().filter(|&&r| r).count();
            if self.live_triangles.saturating_sub(doomed) < target {
                outcome.overshoot += 1;
                accepted = false;
            }
        }

        if accepted {
            if !self.texture_vertices.is_empty() {
                self.update_texture_coordinates(i0, &p, &removed0);
                self.update_texture_coordinates(i1, &p, &removed1);
            }

            self.vertices[i0].p = p;
            self.vertices[i0].exact = exact;
            let q1 = self.vertices[i1].q;
            self.vertices[i0].q += q1;

            let tstart = self.refs.len();
            self.update_triangles(i0, i0, &removed0);
            self.update_triangles(i0, i1, &removed1);
            let tcount = self.refs.len() - tstart;

            let v0 = &mut self.vertices[i0];
            if tcount <= v0.tcount {
                // reuse the old slot range
                self.refs.copy_within(tstart..tstart + tcount, v0.tstart);
                self.refs.truncate(tstart);
            } else {
                v0.tstart = tstart;
            }
            v0.tcount = tcount;

            let v1 = &mut self.vertices[i1];
            v1.deleted = true;
            v1.tcount = 0;
            self.live_vertices -= 1;
            self.collapsed = true;
        }

        self.removed0 = removed0;
        self.removed1 = removed1;
        accepted
    }

    /// Collapse every candidate below `threshold` in ascending error order.
    fn collapse_pass(&mut self, threshold: f64, target: usize) -> PassOutcome {
        let mut outcome = PassOutcome::default();

        for t in &mut self.triangles {
            t.dirty = false;
        }

        let mut queue = PriorityQueue::new();
        for (tid, t) in self.triangles.iter().enumerate() {
            if t.deleted {
                continue;
            }
            if t.err[3] >= threshold {
                outcome.deferred += 3;
                continue;
            }
            for edge in 0..3 {
                if t.err[edge] < threshold {
                    queue.push(
                        (tid, edge),
                        CollapseCost {
                            cost: t.err[edge],
                            tid,
                            edge,
                        },
                    );
                } else {
                    outcome.deferred += 1;
                }
            }
        }

        while let Some(((tid, edge), _)) = queue.pop() {
            if self.live_triangles <= target {
                break;
            }
            if self.vertex_floor_reached() {
                outcome.floor_reached = true;
                break;
            }

            let t = &self.triangles[tid];
            if t.deleted || t.dirty {
                continue;
            }
            let (i0, i1) = (t.v[edge], t.v[(edge + 1) % 3]);
            if self.try_collapse(i0, i1, target, &mut outcome) {
                outcome.collapses += 1;
            }
        }

        outcome
    }

    fn status(&self, iteration: usize, target: Option<usize>) -> DecimationStatus {
        DecimationStatus {
            iteration,
            original_triangles: self.original_triangles,
            current_triangles: self.live_triangles,
            target_triangles: target,
        }
    }
}

impl DecimationAlgorithm for QuadricDecimator {
    fn initialize(&mut self, mesh: &Mesh) -> Result<()> {
        mesh.validate()?;

        let (center, scale) = match BoundingBox::from_points(&mesh.vertices) {
            Some(bounds) => {
                let diagonal = bounds.size().norm();
                let scale = if diagonal.is_finite() && diagonal > 0.0 {
                    diagonal
                } else {
                    1.0
                };
                (bounds.center(), scale)
            }
            None => (Point3d::origin(), 1.0),
        };
        self.center = center;
        self.scale = scale;

        self.vertices = mesh
            .vertices
            .iter()
            .map(|&p| Vertex {
                p: Point3d::from((p - center) / scale),
                exact: Some(p),
                q: SymmetricMatrix::zero(),
                tstart: 0,
                tcount: 0,
                border: false,
                deleted: false,
            })
            .collect();
        self.triangles = mesh
            .faces
            .iter()
            .map(|face| Triangle {
                v: face.indices,
                texture: face.texture,
                err: [0.0; 4],
                n: Vector3d::zeros(),
                deleted: false,
                dirty: false,
            })
            .collect();
        self.texture_vertices = mesh.texture_vertices.clone();
        self.materials = mesh.materials.clone();

        self.update_references();
        self.prepare();

        self.original_triangles = self.triangles.len();
        self.live_triangles = self.triangles.len();
        self.live_vertices = self.vertices.iter().filter(|v| v.tcount > 0).count();
        self.collapsed = false;
        self.state = DecimatorState::Initialized;

        debug!(
            vertices = self.live_vertices,
            triangles = self.live_triangles,
            border_vertices = self.vertices.iter().filter(|v| v.border).count(),
            "Decimator initialized"
        );
        Ok(())
    }

    fn decimate_mesh(
        &mut self,
        target_triangle_count: isize,
        observer: &mut dyn FnMut(&DecimationStatus),
    ) -> Result<()> {
        self.ensure_ready()?;

        let target = usize::try_from(target_triangle_count)
            .unwrap_or(0)
            .min(self.live_triangles);
        let interval = self.options.update_interval.max(1);

        info!(
            original = self.live_triangles,
            target,
            "Starting mesh decimation"
        );

        let mut iteration = 0;
        while self.live_triangles > target {
            if iteration % interval == 0 {
                self.update_references();
            }

            // past the schedule every finite-error candidate is admitted
            let threshold = if iteration < self.options.max_iteration_count {
                self.options.threshold(iteration)
            } else {
                f64::MAX
            };
            let outcome = self.collapse_pass(threshold, target);
            trace!(
                iteration,
                threshold,
                collapses = outcome.collapses,
                deferred = outcome.deferred,
                triangles = self.live_triangles,
                "Collapse pass"
            );
            observer(&self.status(iteration, Some(target)));

            if outcome.floor_reached {
                debug!(
                    vertices = self.live_vertices,
                    floor = self.options.max_vertex_count,
                    "Vertex floor reached"
                );
                break;
            }
            let exhausted = outcome.deferred == 0 || threshold == f64::MAX;
            if outcome.collapses == 0 && (exhausted || outcome.overshoot > 0) {
                debug!(iteration, "No further valid collapse");
                break;
            }
            iteration += 1;
        }

        self.state = DecimatorState::Decimated;
        info!(
            original = self.original_triangles,
            final_triangles = self.live_triangles,
            vertices = self.live_vertices,
            "Decimation complete"
        );
        Ok(())
    }

    fn decimate_mesh_lossless(&mut self, observer: &mut dyn FnMut(&DecimationStatus)) -> Result<()> {
        self.ensure_ready()?;

        info!(original = self.live_triangles, "Starting lossless decimation");

        let mut iteration = 0;
        loop {
            self.update_references();
            let before = self.live_triangles;
            let outcome = self.collapse_pass(LOSSLESS_THRESHOLD, 0);
            observer(&self.status(iteration, None));

            trace!(
                iteration,
                collapses = outcome.collapses,
                triangles = self.live_triangles,
                "Lossless pass"
            );
            if self.live_triangles == before || outcome.floor_reached {
                break;
            }
            iteration += 1;
        }

        self.state = DecimatorState::Decimated;
        info!(
            original = self.original_triangles,
            final_triangles = self.live_triangles,
            "Lossless decimation complete"
        );
        Ok(())
    }

    fn to_mesh(&mut self) -> Result<Mesh> {
        if self.state == DecimatorState::Uninitialized {
            return Err(Error::Algorithm(
                "decimator has not been initialized".to_string(),
            ));
        }

        let mut remap = vec![UNUSED; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.live_vertices);
        for (i, v) in self.vertices.iter().enumerate() {
            if !v.deleted {
                remap[i] = vertices.len();
                vertices.push(v.exact.unwrap_or_else(|| self.center + v.p.coords * self.scale));
            }
        }

        let faces = self
            .triangles
            .iter()
            .filter(|t| !t.deleted)
            .filter_map(|t| {
                let indices = t.v.map(|i| remap[i]);
                if indices.contains(&UNUSED) {
                    return None;
                }
                Some(Face {
                    indices,
                    texture: t.texture,
                })
            })
            .collect();

        let mut mesh = Mesh {
            vertices,
            faces,
            texture_vertices: self.texture_vertices.clone(),
            materials: self.materials.clone(),
        };
        if self.collapsed {
            mesh.remove_unused_vertices();
        }

        self.state = DecimatorState::Finalized;
        Ok(mesh)
    }

    fn state(&self) -> DecimatorState {
        self.state
    }
}

fn face_normal(a: &Point3d, b: &Point3d, c: &Point3d) -> Option<Vector3d> {
    (b - a).cross(&(c - a)).try_normalize(f64::EPSILON)
}

/// Barycentric weights of `p` projected into triangle `abc`
fn barycentric(p: &Point3d, a: &Point3d, b: &Point3d, c: &Point3d) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::EPSILON * d00 * d11 || denom == 0.0 {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some([1.0 - v - w, v, w])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_tetrahedron() -> Mesh {
        Mesh::from_vertices_and_faces(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(0.5, 1.0, 0.0),
                Point3d::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    fn make_plane_grid(size: usize) -> Mesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3d::new(x as f64, y as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        Mesh::from_vertices_and_faces(vertices, faces)
    }

    fn make_sphere(rings: usize, segments: usize) -> Mesh {
        let mut vertices = vec![Point3d::new(0.0, 0.0, 1.0)];
        for r in 1..rings {
            let phi = std::f64::consts::PI * r as f64 / rings as f64;
            for s in 0..segments {
                let theta = 2.0 * std::f64::consts::PI * s as f64 / segments as f64;
                vertices.push(Point3d::new(
                    phi.sin() * theta.cos(),
                    phi.sin() * theta.sin(),
                    phi.cos(),
                ));
            }
        }
        vertices.push(Point3d::new(0.0, 0.0, -1.0));
        let south = vertices.len() - 1;

        let ring = |r: usize, s: usize| 1 + (r - 1) * segments + s % segments;
        let mut faces = Vec::new();
        for s in 0..segments {
            faces.push([0, ring(1, s), ring(1, s + 1)]);
            faces.push([south, ring(rings - 1, s + 1), ring(rings - 1, s)]);
        }
        for r in 1..(rings - 1) {
            for s in 0..segments {
                faces.push([ring(r, s), ring(r + 1, s), ring(r + 1, s + 1)]);
                faces.push([ring(r, s), ring(r + 1, s + 1), ring(r, s + 1)]);
            }
        }
        Mesh::from_vertices_and_faces(vertices, faces)
    }

    fn run(mesh: &Mesh, target: isize, options: DecimatorOptions) -> Mesh {
        let mut decimator = QuadricDecimator::new(options);
        decimator.initialize(mesh).unwrap();
        decimator.decimate_mesh(target, &mut |_| {}).unwrap();
        decimator.to_mesh().unwrap()
    }

    #[test]
    fn test_decimation_reduces_towards_target() {
        let mesh = make_sphere(12, 16);
        let original = mesh.face_count();
        let result = run(&mesh, (original / 2) as isize, DecimatorOptions::default());
        assert!(result.face_count() <= original);
        assert!(result.face_count() >= original / 2);
        assert!(result.face_count() < original);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_decimation_never_increases() {
        let mesh = make_sphere(8, 12);
        for target in [0, 10, 50, mesh.face_count() as isize] {
            let result = run(&mesh, target, DecimatorOptions::default());
            assert!(result.face_count() <= mesh.face_count());
            assert!(result.face_count() >= target.max(0) as usize || target == 0);
        }
    }

    #[test]
    fn test_target_above_count_is_noop() {
        let mesh = make_sphere(6, 8);
        let result = run(&mesh, mesh.face_count() as isize + 100, DecimatorOptions::default());
        assert_eq!(result.face_count(), mesh.face_count());
        assert_eq!(result.vertex_count(), mesh.vertex_count());
        for (a, b) in mesh.vertices.iter().zip(&result.vertices) {
            assert_relative_eq!(a, b);
        }
    }

    #[test]
    fn test_negative_target_clamps_to_zero() {
        let mesh = make_sphere(8, 12);
        let clamped = run(&mesh, -5, DecimatorOptions::default());
        let zero = run(&mesh, 0, DecimatorOptions::default());
        assert_eq!(clamped.face_count(), zero.face_count());
        assert!(clamped.face_count() < mesh.face_count() / 2);
    }

    #[test]
    fn test_observer_reports_every_pass() {
        let mesh = make_sphere(10, 12);
        let mut decimator = QuadricDecimator::default();
        decimator.initialize(&mesh).unwrap();

        let mut reports = Vec::new();
        decimator
            .decimate_mesh(40, &mut |status| reports.push(*status))
            .unwrap();

        assert!(!reports.is_empty());
        for (i, status) in reports.iter().enumerate() {
            assert_eq!(status.iteration, i);
            assert_eq!(status.original_triangles, mesh.face_count());
            assert_eq!(status.target_triangles, Some(40));
        }
        let counts: Vec<usize> = reports.iter().map(|s| s.current_triangles).collect();
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(
            reports.last().map(|s| s.current_triangles),
            Some(decimator.live_triangle_count())
        );
    }

    #[test]
    fn test_state_machine() {
        let mut decimator = QuadricDecimator::default();
        assert_eq!(decimator.state(), DecimatorState::Uninitialized);
        assert!(matches!(
            decimator.decimate_mesh(1, &mut |_| {}),
            Err(Error::Algorithm(_))
        ));
        assert!(decimator.to_mesh().is_err());

        decimator.initialize(&make_tetrahedron()).unwrap();
        assert_eq!(decimator.state(), DecimatorState::Initialized);
        decimator.decimate_mesh(2, &mut |_| {}).unwrap();
        assert_eq!(decimator.state(), DecimatorState::Decimated);
        assert!(matches!(
            decimator.decimate_mesh_lossless(&mut |_| {}),
            Err(Error::Algorithm(_))
        ));

        decimator.to_mesh().unwrap();
        assert_eq!(decimator.state(), DecimatorState::Finalized);

        // re-initialising starts a fresh run
        decimator.initialize(&make_tetrahedron()).unwrap();
        assert_eq!(decimator.state(), DecimatorState::Initialized);
    }

    #[test]
    fn test_to_mesh_before_decimation_is_copy() {
        let mut mesh = make_tetrahedron();
        // an isolated vertex survives too
        mesh.add_vertex(Point3d::new(9.0, 9.0, 9.0));
        let mut decimator = QuadricDecimator::default();
        decimator.initialize(&mesh).unwrap();
        let copy = decimator.to_mesh().unwrap();
        assert_eq!(copy.vertices, mesh.vertices);
        assert_eq!(copy.faces, mesh.faces);
    }

    #[test]
    fn test_initialize_rejects_invalid_mesh() {
        let mut mesh = make_tetrahedron();
        mesh.add_face([0, 1, 42]);
        let mut decimator = QuadricDecimator::default();
        assert!(matches!(
            decimator.initialize(&mesh),
            Err(Error::InvalidData(_))
        ));
        assert_eq!(decimator.state(), DecimatorState::Uninitialized);
    }

    #[test]
    fn test_lossless_flat_grid() {
        let mesh = make_plane_grid(8);
        let mut decimator = QuadricDecimator::default();
        decimator.initialize(&mesh).unwrap();
        let mut passes = 0;
        decimator
            .decimate_mesh_lossless(&mut |status| {
                assert_eq!(status.target_triangles, None);
                passes += 1;
            })
            .unwrap();
        let once = decimator.to_mesh().unwrap();
        assert!(passes > 0);
        assert!(once.face_count() < mesh.face_count());
        assert_relative_eq!(once.surface_area(), mesh.surface_area(), epsilon = 1e-9);

        // flatness and outline are untouched
        let bb = once.bounding_box().unwrap();
        assert_relative_eq!(bb.min, Point3d::new(0.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(bb.max, Point3d::new(7.0, 7.0, 0.0), epsilon = 1e-9);

        decimator.initialize(&once).unwrap();
        decimator.decimate_mesh_lossless(&mut |_| {}).unwrap();
        let twice = decimator.to_mesh().unwrap();
        assert_eq!(twice.face_count(), once.face_count());
        assert_eq!(twice.vertex_count(), once.vertex_count());
    }

    #[test]
    fn test_lossless_keeps_tetrahedron() {
        let mesh = make_tetrahedron();
        let mut decimator = QuadricDecimator::default();
        decimator.initialize(&mesh).unwrap();
        decimator.decimate_mesh_lossless(&mut |_| {}).unwrap();
        let result = decimator.to_mesh().unwrap();
        assert_eq!(result.face_count(), 4);
        assert_eq!(result.vertices, mesh.vertices);
    }

    #[test]
    fn test_lossless_keeps_sphere() {
        let mesh = make_sphere(24, 32);
        let mut decimator = QuadricDecimator::default();
        decimator.initialize(&mesh).unwrap();
        decimator.decimate_mesh_lossless(&mut |_| {}).unwrap();
        let once = decimator.to_mesh().unwrap();
        assert_eq!(once.face_count(), mesh.face_count());
        assert_eq!(once.vertices, mesh.vertices);

        decimator.initialize(&once).unwrap();
        decimator.decimate_mesh_lossless(&mut |_| {}).unwrap();
        let twice = decimator.to_mesh().unwrap();
        assert_eq!(twice.faces, once.faces);
        assert_eq!(twice.vertices, once.vertices);
    }

    #[test]
    fn test_scale_does_not_change_result() {
        let mesh = make_sphere(12, 16);
        let scaled = |factor: f64| {
            let mut copy = mesh.clone();
            for p in &mut copy.vertices {
                *p = Point3d::from(p.coords * factor);
            }
            copy
        };
        let target = (mesh.face_count() / 4) as isize;
        let unit = run(&mesh, target, DecimatorOptions::default());
        assert!(unit.face_count() < mesh.face_count() / 2);

        for factor in [1024.0, 0.125] {
            let result = run(&scaled(factor), target, DecimatorOptions::default());
            assert_eq!(result.face_count(), unit.face_count());
            for (a, b) in unit.vertices.iter().zip(&result.vertices) {
                assert_relative_eq!(a.coords * factor, b.coords, epsilon = 1e-9 * factor);
            }
        }
    }

    #[test]
    fn test_iteration_cap_does_not_stop_early() {
        let mesh = make_sphere(12, 16);
        let target = (mesh.face_count() / 4) as isize;
        let options = DecimatorOptions::default().with_max_iteration_count(1);
        let result = run(&mesh, target, options);
        assert!(result.face_count() >= target as usize);
        assert!(result.face_count() < mesh.face_count() / 2);

        let none = DecimatorOptions::default().with_max_iteration_count(0);
        let result = run(&mesh, 0, none);
        assert!(result.face_count() < mesh.face_count() / 4);
    }

    #[test]
    fn test_preserve_borders_keeps_outline() {
        let mesh = make_plane_grid(10);
        let options = DecimatorOptions::default().with_preserve_borders(true);
        let result = run(&mesh, 0, options);
        assert!(result.face_count() < mesh.face_count());

        let on_border = |p: &Point3d| p.x == 0.0 || p.y == 0.0 || p.x == 9.0 || p.y == 9.0;
        let before = mesh.vertices.iter().filter(|p| on_border(p)).count();
        let after = result.vertices.iter().filter(|p| on_border(p)).count();
        assert_eq!(before, after);
    }

    #[test]
    fn test_vertex_floor_stops_early() {
        let mesh = make_sphere(12, 16);
        let options = DecimatorOptions::default().with_max_vertex_count(100);
        let result = run(&mesh, 0, options);
        assert!(result.vertex_count() >= 100);
        assert!(result.vertex_count() < mesh.vertex_count());
    }

    #[test]
    fn test_textured_collapse_keeps_valid_uvs() {
        let grid = make_plane_grid(6);
        let mut mesh = Mesh::new();
        mesh.vertices = grid.vertices.clone();
        mesh.texture_vertices = grid
            .vertices
            .iter()
            .map(|p| TexCoord::new(p.x / 5.0, p.y / 5.0))
            .collect();
        let m = mesh.add_material(Material::new("ground"));
        for face in &grid.faces {
            mesh.add_textured_face(face.indices, face.indices, m);
        }

        let result = run(&mesh, 10, DecimatorOptions::default());
        assert!(result.face_count() < mesh.face_count());
        assert!(result.validate().is_ok());
        assert!(result.faces.iter().all(|f| f.material() == Some(0)));
        assert!(result
            .texture_vertices
            .iter()
            .all(|uv| uv.x >= 0.0 && uv.y >= 0.0));
    }

    #[test]
    fn test_collapse_order_is_deterministic() {
        let mesh = make_sphere(10, 14);
        let a = run(&mesh, 60, DecimatorOptions::default());
        let b = run(&mesh, 60, DecimatorOptions::default());
        assert_eq!(a.faces, b.faces);
        assert_eq!(a.vertices, b.vertices);
    }

    #[test]
    fn test_barycentric() {
        let w = barycentric(
            &Point3d::new(0.25, 0.25, 0.0),
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(w[0], 0.5);
        assert_relative_eq!(w[1], 0.25);
        assert_relative_eq!(w[2], 0.25);
    }
}
