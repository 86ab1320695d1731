//! Raster to polygon conversion
//!
//! Connected regions (4-connectivity) of equal class value become polygons
//! whose edges follow pixel boundaries.

use geo::orient::{Direction, Orient};
use geo_types::{Coord, LineString, Polygon};
use ndarray::Array2;
use std::collections::{HashMap, VecDeque};
use verdant_core::raster::{GeoTransform, Raster};
use verdant_core::vector::{AttributeValue, Feature, FeatureCollection};
use verdant_core::{Error, Result};

/// Name of the attribute carrying the source class value
pub const CLASS_PROPERTY: &str = "class";

/// 4-connected neighbour offsets (row, col)
const N4_OFFSETS: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// Pixel corner in grid space: (x = col, y = row), y pointing down
type Vertex = (i64, i64);

/// A labelled 4-connected region
struct Region {
    class: u8,
    pixels: Vec<(usize, usize)>,
}

/// Extract polygons for every 4-connected region whose class is in `targets`.
///
/// Each feature carries its class value as the `class` attribute. Features
/// are ordered by the raster-scan position of their region's first pixel,
/// rings follow RFC 7946 orientation (exterior counter-clockwise), and
/// coordinates are in the raster's CRS. The collection takes the raster CRS.
///
/// Holes touching the exterior at a single corner stay separate rings, so
/// every polygon is simple.
pub fn polygonize(classes: &Raster<u8>, targets: &[u8]) -> Result<FeatureCollection> {
    let (labels, regions) = label_regions(classes, targets);
    let transform = classes.transform();

    let mut collection = FeatureCollection::new(classes.crs().cloned());
    for (index, region) in regions.iter().enumerate() {
        let id = index as u32 + 1;
        let rings = trace_rings(&labels, id, &region.pixels)?;
        let polygon = rings_to_polygon(rings, transform);
        collection.push(
            Feature::new(polygon).with_property(CLASS_PROPERTY, AttributeValue::Int(region.class as i64)),
        );
    }

    tracing::debug!(
        targets = ?targets,
        polygons = collection.len(),
        "polygonized class raster"
    );
    Ok(collection)
}

/// Breadth-first flood fill assigning region ids (1-based, 0 = not a target)
fn label_regions(classes: &Raster<u8>, targets: &[u8]) -> (Array2<u32>, Vec<Region>) {
    let (rows, cols) = classes.shape();
    let data = classes.data();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut regions = Vec::new();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            let class = data[(row, col)];
            if labels[(row, col)] != 0 || !targets.contains(&class) {
                continue;
            }

            let id = regions.len() as u32 + 1;
            let mut pixels = Vec::new();
            labels[(row, col)] = id;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                pixels.push((r, c));
                for &(dr, dc) in &N4_OFFSETS {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if labels[(nr, nc)] == 0 && data[(nr, nc)] == class {
                        labels[(nr, nc)] = id;
                        queue.push_back((nr, nc));
                    }
                }
            }

            regions.push(Region { class, pixels });
        }
    }

    (labels, regions)
}

/// Directed boundary edges of one region, region on the left
struct BoundaryEdges {
    edges: Vec<(Vertex, Vertex)>,
    outgoing: HashMap<Vertex, Vec<usize>>,
}

impl BoundaryEdges {
    fn collect(labels: &Array2<u32>, id: u32, pixels: &[(usize, usize)]) -> Self {
        let (rows, cols) = labels.dim();
        let inside = |r: isize, c: isize| {
            r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols && labels[(r as usize, c as usize)] == id
        };

        let mut edges = Vec::new();
        for &(r, c) in pixels {
            let (ri, ci) = (r as isize, c as isize);
            let (x, y) = (c as i64, r as i64);
            if !inside(ri - 1, ci) {
                edges.push(((x + 1, y), (x, y)));
            }
            if !inside(ri, ci - 1) {
                edges.push(((x, y), (x, y + 1)));
            }
            if !inside(ri + 1, ci) {
                edges.push(((x, y + 1), (x + 1, y + 1)));
            }
            if !inside(ri, ci + 1) {
                edges.push(((x + 1, y + 1), (x + 1, y)));
            }
        }

        let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
        for (i, &(from, _)) in edges.iter().enumerate() {
            outgoing.entry(from).or_default().push(i);
        }

        Self { edges, outgoing }
    }

    fn direction(&self, edge: usize) -> Vertex {
        let (a, b) = self.edges[edge];
        (b.0 - a.0, b.1 - a.1)
    }

    /// Successor of `edge`: right turn, else straight, else left.
    ///
    /// Only a pinch corner has two candidates; turning right there follows
    /// the background pixel, which keeps rings simple.
    fn next(&self, edge: usize) -> Option<usize> {
        let (_, end) = self.edges[edge];
        let (dx, dy) = self.direction(edge);
        let candidates = self.outgoing.get(&end)?;
        let preferences = [(-dy, dx), (dx, dy), (dy, -dx)];
        preferences
            .iter()
            .find_map(|want| candidates.iter().copied().find(|&e| self.direction(e) == *want))
    }
}

/// Trace every closed boundary ring of region `id`
fn trace_rings(labels: &Array2<u32>, id: u32, pixels: &[(usize, usize)]) -> Result<Vec<Vec<Vertex>>> {
    let boundary = BoundaryEdges::collect(labels, id, pixels);
    let mut used = vec![false; boundary.edges.len()];
    let mut rings = Vec::new();

    for start in 0..boundary.edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut edge = start;
        loop {
            used[edge] = true;
            ring.push(boundary.edges[edge].0);
            let next = boundary
                .next(edge)
                .ok_or_else(|| Error::Algorithm(format!("open boundary in region {}", id)))?;
            if next == start {
                break;
            }
            if used[next] {
                return Err(Error::Algorithm(format!("boundary of region {} crosses itself", id)));
            }
            edge = next;
        }
        rings.push(merge_collinear(&ring));
    }

    Ok(rings)
}

/// Drop vertices in the middle of straight runs
fn merge_collinear(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    let heading = |a: Vertex, b: Vertex| ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            heading(prev, ring[i]) != heading(ring[i], next)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the absolute shoelace area, in pixels
fn doubled_area(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum::<i64>()
        .abs()
}

fn to_line_string(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| {
            let (gx, gy) = transform.pixel_to_geo_corner(x as usize, y as usize);
            Coord { x: gx, y: gy }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Largest ring is the exterior, the rest are holes
fn rings_to_polygon(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Polygon<f64> {
    let mut rings: Vec<(i64, Vec<Vertex>)> = rings.into_iter().map(|r| (doubled_area(&r), r)).collect();
    // stable sort keeps trace order among equal areas
    rings.sort_by(|a, b| b.0.cmp(&a.0));

    let mut iter = rings.into_iter();
    let exterior = iter
        .next()
        .map(|(_, r)| to_line_string(&r, transform))
        .unwrap_or_else(|| LineString::new(Vec::new()));
    let holes = iter.map(|(_, r)| to_line_string(&r, transform)).collect();

    Polygon::new(exterior, holes).orient(Direction::Default)
}
