//! Triangular channel mesh around a circular pier.
//!
//! A [`Mesh`] stores nodal coordinates, linear triangle connectivity and an
//! exclusive boundary classification per node. Meshes are produced by
//! [`create_mesh`] from a structured grid with the pier interior removed, and are
//! immutable afterwards.
//!
//! # Grid layout
//!
//! Candidate nodes form an `nx × ny` grid over `x ∈ [-Lx/2, Lx/2]`, `y ∈ [0, Ly]`,
//! numbered row by row. Every grid cell whose four corners survive the pier
//! exclusion is split into two triangles:
//!
//! ```text
//! TL ---- TR
//!  |    / |
//!  |  /   |
//! BL ---- BR      {BL, BR, TL} and {BR, TR, TL}
//! ```

use crate::error::{Error, Result};
use crate::types::{
    distance, Point2, BOUNDARY_TOLERANCE, PIER_BAND_FACTOR, PIER_EXCLUSION_FACTOR,
};

/// Boundary class of a mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Upstream edge `x = -Lx/2` (prescribed inflow).
    Inlet,
    /// Downstream edge `x = +Lx/2` (natural condition).
    Outlet,
    /// Channel bed and lid `y = 0`, `y = Ly` (no-slip).
    Wall,
    /// Band around the pier surface (no-slip).
    Pier,
}

impl BoundaryKind {
    /// All kinds in classification precedence order.
    pub const ALL: [BoundaryKind; 4] = [
        BoundaryKind::Inlet,
        BoundaryKind::Outlet,
        BoundaryKind::Wall,
        BoundaryKind::Pier,
    ];

    /// Set name as used in reports.
    pub fn name(self) -> &'static str {
        match self {
            BoundaryKind::Inlet => "inlet",
            BoundaryKind::Outlet => "outlet",
            BoundaryKind::Wall => "walls",
            BoundaryKind::Pier => "pier",
        }
    }

    /// Whether both velocity components are fixed to zero on this boundary.
    pub fn is_no_slip(self) -> bool {
        matches!(self, BoundaryKind::Wall | BoundaryKind::Pier)
    }
}

/// Disjoint node sets per boundary kind, each in ascending node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundarySets {
    pub inlet: Vec<usize>,
    pub outlet: Vec<usize>,
    pub walls: Vec<usize>,
    pub pier: Vec<usize>,
}

impl BoundarySets {
    fn from_classification(classification: &[Option<BoundaryKind>]) -> Self {
        let mut sets = BoundarySets::default();
        for (node, kind) in classification.iter().enumerate() {
            match kind {
                Some(BoundaryKind::Inlet) => sets.inlet.push(node),
                Some(BoundaryKind::Outlet) => sets.outlet.push(node),
                Some(BoundaryKind::Wall) => sets.walls.push(node),
                Some(BoundaryKind::Pier) => sets.pier.push(node),
                None => {}
            }
        }
        sets
    }

    /// Nodes of one boundary kind.
    pub fn nodes(&self, kind: BoundaryKind) -> &[usize] {
        match kind {
            BoundaryKind::Inlet => &self.inlet,
            BoundaryKind::Outlet => &self.outlet,
            BoundaryKind::Wall => &self.walls,
            BoundaryKind::Pier => &self.pier,
        }
    }

    /// Total number of classified nodes.
    pub fn len(&self) -> usize {
        self.inlet.len() + self.outlet.len() + self.walls.len() + self.pier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-fatal mesh quality counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshDiagnostics {
    /// Grid candidates removed by the pier exclusion.
    pub excluded_nodes: usize,
    /// Surviving nodes not referenced by any triangle.
    pub orphan_nodes: usize,
    /// Nodes on a free mesh edge that match no boundary test.
    ///
    /// These nodes receive no Dirichlet constraint and behave as interior DOFs.
    pub classification_gaps: usize,
}

/// Finite element mesh of linear triangles.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Nodal coordinates.
    nodes: Vec<Point2>,
    /// Triangle connectivity (0-based node indices).
    elements: Vec<[usize; 3]>,
    /// Boundary class per node.
    classification: Vec<Option<BoundaryKind>>,
    /// Per-kind node lists derived from `classification`.
    boundary_sets: BoundarySets,
    diagnostics: MeshDiagnostics,
}

impl Mesh {
    /// Build a mesh from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MeshConstruction`] if the classification length differs from
    /// the node count or an element references a missing node.
    pub fn new(
        nodes: Vec<Point2>,
        elements: Vec<[usize; 3]>,
        classification: Vec<Option<BoundaryKind>>,
    ) -> Result<Self> {
        if classification.len() != nodes.len() {
            return Err(Error::MeshConstruction(format!(
                "classification has {} entries for {} nodes",
                classification.len(),
                nodes.len()
            )));
        }

        for (elem_idx, element) in elements.iter().enumerate() {
            for &node_idx in element {
                if node_idx >= nodes.len() {
                    return Err(Error::MeshConstruction(format!(
                        "element {} references node {} (mesh has {} nodes)",
                        elem_idx,
                        node_idx,
                        nodes.len()
                    )));
                }
            }
        }

        let boundary_sets = BoundarySets::from_classification(&classification);
        let (orphan_nodes, classification_gaps) =
            connectivity_diagnostics(nodes.len(), &elements, &classification);

        Ok(Self {
            nodes,
            elements,
            classification,
            boundary_sets,
            diagnostics: MeshDiagnostics {
                excluded_nodes: 0,
                orphan_nodes,
                classification_gaps,
            },
        })
    }

    /// Number of nodes in the mesh.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements in the mesh.
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// Get nodal coordinates.
    pub fn nodes(&self) -> &[Point2] {
        &self.nodes
    }

    /// Get a specific node's coordinates.
    pub fn node(&self, idx: usize) -> Option<&Point2> {
        self.nodes.get(idx)
    }

    /// Get element connectivity.
    pub fn elements(&self) -> &[[usize; 3]] {
        &self.elements
    }

    /// Coordinates of the three vertices of an element.
    pub fn element_coords(&self, elem_idx: usize) -> Option<[Point2; 3]> {
        let [a, b, c] = *self.elements.get(elem_idx)?;
        Some([self.nodes[a], self.nodes[b], self.nodes[c]])
    }

    /// Boundary class of a node, `None` for interior or unclassified nodes.
    pub fn classification(&self, node: usize) -> Option<BoundaryKind> {
        self.classification.get(node).copied().flatten()
    }

    pub fn boundary_sets(&self) -> &BoundarySets {
        &self.boundary_sets
    }

    /// Nodes of one boundary kind, ascending.
    pub fn boundary_nodes(&self, kind: BoundaryKind) -> &[usize] {
        self.boundary_sets.nodes(kind)
    }

    pub fn diagnostics(&self) -> MeshDiagnostics {
        self.diagnostics
    }

    /// Elements incident to each node, in ascending element order.
    pub fn node_elements(&self) -> Vec<Vec<usize>> {
        let mut incident = vec![Vec::new(); self.nodes.len()];
        for (elem_idx, element) in self.elements.iter().enumerate() {
            for &node in element {
                incident[node].push(elem_idx);
            }
        }
        incident
    }

    /// Compute mesh bounding box.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.nodes.first()?;
        let (mut min, mut max) = (first, first);
        for node in &self.nodes[1..] {
            for i in 0..2 {
                min[i] = min[i].min(node[i]);
                max[i] = max[i].max(node[i]);
            }
        }
        Some((min, max))
    }
}

/// Evenly spaced samples with exact end points.
/// `n` evenly spaced values from `start` to `end`; a single point sits at `start`.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start; n];
    }
    let step = (end - start) / (n - 1) as f64;
    let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
    values[n - 1] = end;
    values
}

pub(crate) fn validate_geometry(
    domain_size: (f64, f64),
    nx: usize,
    ny: usize,
    pier_center: &Point2,
    pier_radius: f64,
) -> Result<()> {
    let (lx, ly) = domain_size;
    if !(lx.is_finite() && lx > 0.0 && ly.is_finite() && ly > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "domain size must be positive and finite, got ({}, {})",
            lx, ly
        )));
    }
    if !(pier_center.x.is_finite() && pier_center.y.is_finite()) {
        return Err(Error::InvalidParameter("pier center must be finite".into()));
    }
    if !(pier_radius.is_finite() && pier_radius > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "pier radius must be positive and finite, got {}",
            pier_radius
        )));
    }
    Ok(())
}

/// Classify one node. First matching test wins: inlet, outlet, walls, pier.
fn classify_node(
    point: &Point2,
    domain_size: (f64, f64),
    pier_center: &Point2,
    pier_radius: f64,
) -> Option<BoundaryKind> {
    let (lx, ly) = domain_size;
    let (x, y) = (point.x, point.y);

    if (x + lx / 2.0).abs() < BOUNDARY_TOLERANCE {
        Some(BoundaryKind::Inlet)
    } else if (x - lx / 2.0).abs() < BOUNDARY_TOLERANCE {
        Some(BoundaryKind::Outlet)
    } else if y.abs() < BOUNDARY_TOLERANCE || (y - ly).abs() < BOUNDARY_TOLERANCE {
        Some(BoundaryKind::Wall)
    } else if (distance(point, pier_center) - pier_radius).abs() < PIER_BAND_FACTOR * pier_radius {
        Some(BoundaryKind::Pier)
    } else {
        None
    }
}

/// Count orphan nodes and unclassified nodes lying on free edges.
fn connectivity_diagnostics(
    n_nodes: usize,
    elements: &[[usize; 3]],
    classification: &[Option<BoundaryKind>],
) -> (usize, usize) {
    let mut referenced = vec![false; n_nodes];
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(elements.len() * 3);
    for &[a, b, c] in elements {
        referenced[a] = true;
        referenced[b] = true;
        referenced[c] = true;
        for (p, q) in [(a, b), (b, c), (c, a)] {
            edges.push((p.min(q), p.max(q)));
        }
    }
    edges.sort_unstable();

    // An edge shared by a single triangle lies on the mesh boundary
    let mut on_free_edge = vec![false; n_nodes];
    let mut i = 0;
    while i < edges.len() {
        let mut j = i + 1;
        while j < edges.len() && edges[j] == edges[i] {
            j += 1;
        }
        if j - i == 1 {
            on_free_edge[edges[i].0] = true;
            on_free_edge[edges[i].1] = true;
        }
        i = j;
    }

    let orphans = referenced.iter().filter(|&&r| !r).count();
    let gaps = (0..n_nodes)
        .filter(|&n| on_free_edge[n] && classification[n].is_none())
        .count();
    (orphans, gaps)
}

/// Build the channel mesh around a circular pier.
///
/// Grid nodes within `0.8 × pier_radius` of the pier center are removed and the
/// survivors renumbered contiguously. Cells that lost a corner produce no triangles,
/// so the mesh thins out next to the pier instead of failing.
///
/// # Arguments
///
/// * `domain_size` - Channel length and height `(Lx, Ly)` in meters
/// * `nx`, `ny` - Grid resolution (nodes per direction, at least 2)
/// * `pier_center` - Pier axis position
/// * `pier_radius` - Physical pier radius
///
/// # Errors
///
/// * [`Error::InvalidParameter`] for non-positive or non-finite geometry
/// * [`Error::MeshConstruction`] if fewer than 3 nodes survive or no triangle remains
pub fn create_mesh(
    domain_size: (f64, f64),
    nx: usize,
    ny: usize,
    pier_center: Point2,
    pier_radius: f64,
) -> Result<Mesh> {
    validate_geometry(domain_size, nx, ny, &pier_center, pier_radius)?;
    if nx == 0 || ny == 0 {
        return Err(Error::MeshConstruction(format!(
            "empty {} x {} grid has no nodes",
            nx, ny
        )));
    }

    let (lx, ly) = domain_size;
    let xs = linspace(-lx / 2.0, lx / 2.0, nx);
    let ys = linspace(0.0, ly, ny);
    let exclusion_radius = PIER_EXCLUSION_FACTOR * pier_radius;

    // Old grid index -> new node index
    let mut renumber: Vec<Option<usize>> = vec![None; nx * ny];
    let mut nodes = Vec::with_capacity(nx * ny);
    for (j, &y) in ys.iter().enumerate() {
        for (i, &x) in xs.iter().enumerate() {
            let point = Point2::new(x, y);
            if distance(&point, &pier_center) > exclusion_radius {
                renumber[j * nx + i] = Some(nodes.len());
                nodes.push(point);
            }
        }
    }

    let excluded_nodes = nx * ny - nodes.len();
    if nodes.len() < 3 {
        return Err(Error::MeshConstruction(format!(
            "only {} of {} grid nodes remain after pier exclusion",
            nodes.len(),
            nx * ny
        )));
    }

    let mut elements = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            let base = j * nx + i;
            let corners = (
                renumber[base],
                renumber[base + 1],
                renumber[base + nx],
                renumber[base + nx + 1],
            );
            if let (Some(bl), Some(br), Some(tl), Some(tr)) = corners {
                elements.push([bl, br, tl]);
                elements.push([br, tr, tl]);
            }
        }
    }

    if elements.is_empty() {
        return Err(Error::MeshConstruction(format!(
            "no complete grid cell survives pier exclusion ({} nodes left)",
            nodes.len()
        )));
    }

    let classification: Vec<Option<BoundaryKind>> = nodes
        .iter()
        .map(|p| classify_node(p, domain_size, &pier_center, pier_radius))
        .collect();

    let mut mesh = Mesh::new(nodes, elements, classification)?;
    mesh.diagnostics.excluded_nodes = excluded_nodes;

    let sets = mesh.boundary_sets();
    log::info!(
        "Mesh created: {} nodes, {} elements ({} excluded; inlet {}, outlet {}, walls {}, pier {})",
        mesh.n_nodes(),
        mesh.n_elements(),
        excluded_nodes,
        sets.inlet.len(),
        sets.outlet.len(),
        sets.walls.len(),
        sets.pier.len()
    );
    let diag = mesh.diagnostics();
    if diag.orphan_nodes > 0 || diag.classification_gaps > 0 {
        log::warn!(
            "Mesh has {} orphan nodes and {} unclassified free-edge nodes",
            diag.orphan_nodes,
            diag.classification_gaps
        );
    }

    Ok(mesh)
}
