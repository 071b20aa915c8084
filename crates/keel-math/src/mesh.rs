//! Triangle-mesh accumulation for estimated mass properties.
//!
//! The tessellation generator itself is an external collaborator; the
//! kernel only consumes its output through [`TriMesh`]. When an object
//! declares a mass but no explicit inertia data, the kernel estimates a
//! center of mass and a radius-of-gyration-squared tensor by treating
//! each triangle as a point mass at its centroid, weighted by area, and
//! accumulating with the parallel-axis theorem.

use crate::Vec3;

/// An indexed triangle mesh in the owning object's local frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriMesh {
    /// Vertex positions.
    pub vertices: Vec<Vec3>,
    /// Vertex-index triples, counter-clockwise winding.
    pub triangles: Vec<[u32; 3]>,
}

/// Gyration tensor rows produced by [`TriMesh::gyration_tensor`]:
/// `(jx, jy, jz)` where `jx = (jxx, jxy, jxz)` and so on.
pub type GyrationRows = (Vec3, Vec3, Vec3);

impl TriMesh {
    /// Whether the mesh has no triangles with positive area.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.total_area() <= f64::EPSILON
    }

    /// Sum of triangle areas.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.triangle_data().map(|(area, _)| area).sum()
    }

    /// Area-weighted centroid of the surface.
    ///
    /// Returns the origin for a degenerate mesh so a zero-geometry
    /// object still yields a numerically valid center of mass.
    #[must_use]
    pub fn area_weighted_centroid(&self) -> Vec3 {
        let mut total = 0.0;
        let mut acc = Vec3::ZERO;
        for (area, centroid) in self.triangle_data() {
            total += area;
            acc += centroid.scaled(area);
        }
        if total <= f64::EPSILON {
            Vec3::ZERO
        } else {
            acc.scaled(1.0 / total)
        }
    }

    /// Radius-of-gyration-squared tensor about `center`, as three row
    /// vectors.
    ///
    /// Each triangle contributes as a point mass at its centroid with
    /// weight `area / total_area`; the diagonal entries accumulate
    /// squared distances and the off-diagonals the mixed products, per
    /// the parallel-axis theorem. Multiplying by the object's mass
    /// yields the inertia tensor.
    #[must_use]
    pub fn gyration_tensor(&self, center: Vec3) -> GyrationRows {
        let total = self.total_area();
        if total <= f64::EPSILON {
            return (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        }
        let mut jx = Vec3::ZERO;
        let mut jy = Vec3::ZERO;
        let mut jz = Vec3::ZERO;
        for (area, centroid) in self.triangle_data() {
            let w = area / total;
            let d = centroid - center;
            jx.x += w * (d.y * d.y + d.z * d.z);
            jy.y += w * (d.x * d.x + d.z * d.z);
            jz.z += w * (d.x * d.x + d.y * d.y);
            jx.y -= w * d.x * d.y;
            jy.x -= w * d.x * d.y;
            jx.z -= w * d.x * d.z;
            jz.x -= w * d.x * d.z;
            jy.z -= w * d.y * d.z;
            jz.y -= w * d.y * d.z;
        }
        (jx, jy, jz)
    }

    /// Iterate `(area, centroid)` for each non-degenerate triangle.
    fn triangle_data(&self) -> impl Iterator<Item = (f64, Vec3)> + '_ {
        self.triangles.iter().filter_map(move |idx| {
            let a = *self.vertices.get(idx[0] as usize)?;
            let b = *self.vertices.get(idx[1] as usize)?;
            let c = *self.vertices.get(idx[2] as usize)?;
            let area = (b - a).cross(c - a).length() * 0.5;
            if area <= f64::EPSILON {
                return None;
            }
            let centroid = (a + b + c).scaled(1.0 / 3.0);
            Some((area, centroid))
        })
    }
}
