//! # Delaunay Triangulation
//!
//! Divide-and-conquer construction (Guibas & Stolfi) over a quad-edge
//! arena, flattened into a [`DelaunayGraph`]: a vertex arena, the convex
//! hull and a triangle arena with per-edge neighbour links.
//!
//! ## Seams
//!
//! Regions are triangulated on their own and stitched afterwards. Seam
//! triangles reference sites of other regions; those become "ghost"
//! vertices in the receiving graph, stored in its local frame. A graph only
//! ever gains triangles. A triangle sharing a directed edge with an existing
//! one is rejected, which makes repeated stitching harmless.

use std::collections::HashMap;

use glam::DVec2;

use super::data::BiomeId;

/// Tolerance of point-in-triangle tests.
pub const CONTAINMENT_EPSILON: f64 = 1e-12;

/// Twice the signed area of `abc`; positive when counter-clockwise.
#[inline]
#[must_use]
pub fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// True when `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `abc`.
#[must_use]
pub fn in_circle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> bool {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;
    let det = ad.length_squared() * bd.perp_dot(cd) + bd.length_squared() * cd.perp_dot(ad)
        + cd.length_squared() * ad.perp_dot(bd);
    det > 0.0
}

const NONE: usize = usize::MAX;

/// Quad-edge arena. Edge `e` belongs to quad `e / 4`; `e ^ 2` is its
/// symmetric edge, odd edges are dual.
struct QuadEdges<'a> {
    points: &'a [DVec2],
    next: Vec<usize>,
    origin: Vec<usize>,
    alive: Vec<bool>,
}

impl<'a> QuadEdges<'a> {
    fn new(points: &'a [DVec2]) -> Self {
        let capacity = points.len() * 3 * 4;
        Self {
            points,
            next: Vec::with_capacity(capacity),
            origin: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity / 4),
        }
    }

    #[inline]
    const fn rot(e: usize) -> usize {
        (e & !3) | ((e + 1) & 3)
    }

    #[inline]
    const fn sym(e: usize) -> usize {
        (e & !3) | ((e + 2) & 3)
    }

    #[inline]
    const fn rot_inv(e: usize) -> usize {
        (e & !3) | ((e + 3) & 3)
    }

    #[inline]
    fn onext(&self, e: usize) -> usize {
        self.next[e]
    }

    #[inline]
    fn oprev(&self, e: usize) -> usize {
        Self::rot(self.onext(Self::rot(e)))
    }

    #[inline]
    fn lnext(&self, e: usize) -> usize {
        Self::rot(self.onext(Self::rot_inv(e)))
    }

    #[inline]
    fn rprev(&self, e: usize) -> usize {
        self.onext(Self::sym(e))
    }

    #[inline]
    fn org(&self, e: usize) -> usize {
        self.origin[e]
    }

    #[inline]
    fn dest(&self, e: usize) -> usize {
        self.origin[Self::sym(e)]
    }

    #[inline]
    fn point(&self, vertex: usize) -> DVec2 {
        self.points[vertex]
    }

    fn make_edge(&mut self, org: usize, dest: usize) -> usize {
        let e = self.next.len();
        self.next.extend_from_slice(&[e, e + 3, e + 2, e + 1]);
        self.origin.extend_from_slice(&[org, NONE, dest, NONE]);
        self.alive.push(true);
        e
    }

    fn splice(&mut self, a: usize, b: usize) {
        let alpha = Self::rot(self.onext(a));
        let beta = Self::rot(self.onext(b));
        self.next.swap(a, b);
        self.next.swap(alpha, beta);
    }

    fn connect(&mut self, a: usize, b: usize) -> usize {
        let e = self.make_edge(self.dest(a), self.org(b));
        self.splice(e, self.lnext(a));
        self.splice(Self::sym(e), b);
        e
    }

    fn delete(&mut self, e: usize) {
        self.splice(e, self.oprev(e));
        let s = Self::sym(e);
        self.splice(s, self.oprev(s));
        self.alive[e / 4] = false;
    }

    fn ccw(&self, a: usize, b: usize, c: usize) -> bool {
        orient(self.point(a), self.point(b), self.point(c)) > 0.0
    }

    fn right_of(&self, x: usize, e: usize) -> bool {
        self.ccw(x, self.dest(e), self.org(e))
    }

    fn left_of(&self, x: usize, e: usize) -> bool {
        self.ccw(x, self.org(e), self.dest(e))
    }

    fn valid(&self, e: usize, basel: usize) -> bool {
        self.right_of(self.dest(e), basel)
    }

    fn in_circle_vertices(&self, a: usize, b: usize, c: usize, d: usize) -> bool {
        in_circle(self.point(a), self.point(b), self.point(c), self.point(d))
    }

    /// Triangulates `sorted` (at least two distinct vertices, sorted by x
    /// then y). Returns the counter-clockwise hull edge out of the leftmost
    /// vertex and the clockwise hull edge out of the rightmost.
    fn divide(&mut self, sorted: &[usize]) -> (usize, usize) {
        match *sorted {
            [s1, s2] => {
                let a = self.make_edge(s1, s2);
                (a, Self::sym(a))
            }
            [s1, s2, s3] => {
                let a = self.make_edge(s1, s2);
                let b = self.make_edge(s2, s3);
                self.splice(Self::sym(a), b);
                if self.ccw(s1, s2, s3) {
                    self.connect(b, a);
                    (a, Self::sym(b))
                } else if self.ccw(s1, s3, s2) {
                    let c = self.connect(b, a);
                    (Self::sym(c), c)
                } else {
                    // Collinear.
                    (a, Self::sym(b))
                }
            }
            _ => {
                let (left, right) = sorted.split_at(sorted.len() / 2);
                let (ldo, ldi) = self.divide(left);
                let (rdi, rdo) = self.divide(right);
                self.merge(ldo, ldi, rdi, rdo)
            }
        }
    }

    fn merge(&mut self, mut ldo: usize, mut ldi: usize, mut rdi: usize, mut rdo: usize) -> (usize, usize) {
        // Lower common tangent.
        loop {
            if self.left_of(self.org(rdi), ldi) {
                ldi = self.lnext(ldi);
            } else if self.right_of(self.org(ldi), rdi) {
                rdi = self.rprev(rdi);
            } else {
                break;
            }
        }

        let mut basel = self.connect(Self::sym(rdi), ldi);
        if self.org(ldi) == self.org(ldo) {
            ldo = Self::sym(basel);
        }
        if self.org(rdi) == self.org(rdo) {
            rdo = basel;
        }

        loop {
            let mut lcand = self.onext(Self::sym(basel));
            if self.valid(lcand, basel) {
                while self.in_circle_vertices(
                    self.dest(basel),
                    self.org(basel),
                    self.dest(lcand),
                    self.dest(self.onext(lcand)),
                ) {
                    let t = self.onext(lcand);
                    self.delete(lcand);
                    lcand = t;
                }
            }

            let mut rcand = self.oprev(basel);
            if self.valid(rcand, basel) {
                while self.in_circle_vertices(
                    self.dest(basel),
                    self.org(basel),
                    self.dest(rcand),
                    self.dest(self.oprev(rcand)),
                ) {
                    let t = self.oprev(rcand);
                    self.delete(rcand);
                    rcand = t;
                }
            }

            let left_valid = self.valid(lcand, basel);
            let right_valid = self.valid(rcand, basel);
            if !left_valid && !right_valid {
                break;
            }

            basel = if !left_valid
                || (right_valid
                    && self.in_circle_vertices(
                        self.dest(lcand),
                        self.org(lcand),
                        self.org(rcand),
                        self.dest(rcand),
                    )) {
                self.connect(rcand, Self::sym(basel))
            } else {
                self.connect(Self::sym(basel), Self::sym(lcand))
            };
        }

        (ldo, rdo)
    }

    /// Hull vertices, counter-clockwise, starting at the origin of `ldo`.
    fn hull(&self, ldo: usize) -> Vec<usize> {
        let mut hull = Vec::new();
        let mut e = ldo;
        loop {
            hull.push(self.org(e));
            e = self.rprev(e);
            if e == ldo || hull.len() > self.points.len() * 2 {
                break;
            }
        }
        hull
    }

    /// Every bounded counter-clockwise face, once.
    fn triangles(&self) -> Vec<[usize; 3]> {
        let mut out = Vec::new();
        for (quad, alive) in self.alive.iter().enumerate() {
            if !*alive {
                continue;
            }
            for e in [quad * 4, quad * 4 + 2] {
                let e1 = self.lnext(e);
                let e2 = self.lnext(e1);
                if self.lnext(e2) != e || e > e1 || e > e2 {
                    continue;
                }
                let face = [self.org(e), self.org(e1), self.org(e2)];
                if self.ccw(face[0], face[1], face[2]) {
                    out.push(face);
                }
            }
        }
        out
    }
}

/// A vertex of a region graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelaunayVertex {
    /// Site the vertex stands for.
    pub id: BiomeId,
    /// Position in the owning graph's local frame.
    pub position: DVec2,
}

/// Triangulated graph of one region.
#[derive(Clone, Debug, Default)]
pub struct DelaunayGraph {
    vertices: Vec<DelaunayVertex>,
    lookup: HashMap<BiomeId, usize>,
    hull: Vec<usize>,
    on_hull: Vec<bool>,
    triangles: Vec<[usize; 3]>,
    /// `neighbours[t][i]` shares edge `(v[i], v[i+1])` of triangle `t`.
    neighbours: Vec<[Option<usize>; 3]>,
    edges: HashMap<(usize, usize), (usize, usize)>,
    vertex_triangle: Vec<Option<usize>>,
}

impl DelaunayGraph {
    /// Triangulates `sites`. Vertex `i` of the graph is `sites[i]`.
    #[must_use]
    pub fn triangulate(sites: &[(BiomeId, DVec2)]) -> Self {
        let mut graph = Self::default();
        for (id, position) in sites {
            graph.push_vertex(*id, *position);
        }
        graph.on_hull = vec![false; sites.len()];

        let points: Vec<DVec2> = sites.iter().map(|(_, p)| *p).collect();
        let mut sorted: Vec<usize> = (0..points.len()).collect();
        sorted.sort_by(|&a, &b| {
            points[a]
                .x
                .total_cmp(&points[b].x)
                .then(points[a].y.total_cmp(&points[b].y))
        });
        sorted.dedup_by(|a, b| points[*a] == points[*b]);

        if sorted.len() < 2 {
            graph.hull.clone_from(&sorted);
        } else {
            let mut quads = QuadEdges::new(&points);
            let (ldo, _) = quads.divide(&sorted);
            graph.hull = quads.hull(ldo);
            for face in quads.triangles() {
                graph.add_triangle(face);
            }
        }
        for &v in &graph.hull {
            graph.on_hull[v] = true;
        }

        tracing::debug!(
            "triangulated {} sites: {} triangles, {} hull vertices",
            sites.len(),
            graph.triangles.len(),
            graph.hull.len()
        );
        graph
    }

    fn push_vertex(&mut self, id: BiomeId, position: DVec2) -> usize {
        let index = self.vertices.len();
        self.vertices.push(DelaunayVertex { id, position });
        self.vertex_triangle.push(None);
        self.lookup.insert(id, index);
        index
    }

    /// All vertices, own sites first.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[DelaunayVertex] {
        &self.vertices
    }

    /// Vertex by index.
    #[inline]
    #[must_use]
    pub fn vertex(&self, index: usize) -> Option<&DelaunayVertex> {
        self.vertices.get(index)
    }

    /// Index of the vertex standing for `id`.
    #[inline]
    #[must_use]
    pub fn index_of(&self, id: BiomeId) -> Option<usize> {
        self.lookup.get(&id).copied()
    }

    /// Hull of the standalone triangulation, counter-clockwise.
    #[inline]
    #[must_use]
    pub fn hull(&self) -> &[usize] {
        &self.hull
    }

    /// True when `index` is on the standalone hull.
    #[inline]
    #[must_use]
    pub fn is_hull_vertex(&self, index: usize) -> bool {
        self.on_hull.get(index).copied().unwrap_or(false)
    }

    /// Position of `index` in the hull ring.
    #[must_use]
    pub fn hull_position(&self, index: usize) -> Option<usize> {
        self.hull.iter().position(|&v| v == index)
    }

    /// Triangles as counter-clockwise vertex index triples.
    #[inline]
    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Neighbour links of triangle `t`.
    #[must_use]
    pub fn triangle_neighbours(&self, t: usize) -> Option<&[Option<usize>; 3]> {
        self.neighbours.get(t)
    }

    /// Site ids of triangle `t`.
    #[must_use]
    pub fn triangle_ids(&self, t: usize) -> Option<[BiomeId; 3]> {
        let tri = self.triangles.get(t)?;
        Some(tri.map(|v| self.vertices[v].id))
    }

    /// Adds a counter-clockwise triangle. Rejected (returns `false`) when
    /// one of its directed edges is already taken.
    pub fn add_triangle(&mut self, tri: [usize; 3]) -> bool {
        let directed = [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])];
        if directed.iter().any(|edge| self.edges.contains_key(edge)) {
            return false;
        }

        let t = self.triangles.len();
        self.triangles.push(tri);
        self.neighbours.push([None; 3]);
        for (slot, &(a, b)) in directed.iter().enumerate() {
            self.edges.insert((a, b), (t, slot));
            if let Some(&(other, other_slot)) = self.edges.get(&(b, a)) {
                self.neighbours[t][slot] = Some(other);
                self.neighbours[other][other_slot] = Some(t);
            }
            if self.vertex_triangle[a].is_none() {
                self.vertex_triangle[a] = Some(t);
            }
        }
        true
    }

    /// Adds a triangle given by site ids and local positions, creating ghost
    /// vertices for sites not yet in the graph.
    pub fn insert_triangle(&mut self, corners: &[(BiomeId, DVec2); 3]) -> bool {
        let tri = corners.map(|(id, position)| match self.index_of(id) {
            Some(index) => index,
            None => self.push_vertex(id, position),
        });
        self.add_triangle(tri)
    }

    /// True when `p` lies in triangle `t`, boundary included.
    #[must_use]
    pub fn triangle_contains(&self, t: usize, p: DVec2) -> bool {
        let [a, b, c] = self.triangles[t].map(|v| self.vertices[v].position);
        orient(a, b, p) >= -CONTAINMENT_EPSILON
            && orient(b, c, p) >= -CONTAINMENT_EPSILON
            && orient(c, a, p) >= -CONTAINMENT_EPSILON
    }

    /// Triangle containing `p`. Walks from a triangle incident to `hint`
    /// when given, falling back to a scan when the walk leaves the mesh.
    #[must_use]
    pub fn locate(&self, p: DVec2, hint: Option<usize>) -> Option<usize> {
        if self.triangles.is_empty() {
            return None;
        }

        let mut t = hint
            .and_then(|v| self.vertex_triangle.get(v).copied().flatten())
            .unwrap_or(0);
        'walk: for _ in 0..self.triangles.len() {
            let tri = self.triangles[t];
            for slot in 0..3 {
                let a = self.vertices[tri[slot]].position;
                let b = self.vertices[tri[(slot + 1) % 3]].position;
                if orient(a, b, p) < -CONTAINMENT_EPSILON {
                    match self.neighbours[t][slot] {
                        Some(next) => {
                            t = next;
                            continue 'walk;
                        }
                        None => break 'walk,
                    }
                }
            }
            return Some(t);
        }

        (0..self.triangles.len()).find(|&t| self.triangle_contains(t, p))
    }
}
