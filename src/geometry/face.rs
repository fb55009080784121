//! Triangle faces with precomputed plane/edge data (spec §3, §4.1).

use crate::error::{AuralTraceError, Result};
use crate::math::Vec3;

/// Safe-distance margin subtracted from each edge's plane distance so that
/// ray/triangle tests reject near-edge near-misses deterministically
/// (spec §3). Chosen to be many orders of magnitude above float epsilon
/// so the shift is never swallowed by rounding.
pub const SAFE_DISTANCE_MARGIN: f32 = 1e-5;

/// An immutable triangle with precomputed plane and edge data.
///
/// Rebuilt wholesale when the owning component is skinned; otherwise
/// immutable for the lifetime of the model that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub vertices: [Vec3; 3],
    pub normal: Vec3,
    /// Inward-pointing normal for each of the three edges.
    pub edge_normals: [Vec3; 3],
    /// `edge_normals[i] . vertices[i]`.
    pub edge_distances: [f32; 3],
    /// `edge_distances[i] - SAFE_DISTANCE_MARGIN`.
    pub edge_distances_safe: [f32; 3],
    /// Index of this face in the model's original (unsorted) face list.
    pub source_face_index: u32,
    /// Index into the component's texture/material table.
    pub texture_index: u16,
}

impl Face {
    /// Builds a face from three vertices, computing the plane normal and
    /// the three edge-inward-normal/distance pairs.
    ///
    /// Returns `DegenerateGeometry` for a zero-area triangle or a NaN
    /// vertex; per spec §7 this is not fatal — callers should drop the
    /// face (treat it as never-hit) and continue building.
    pub fn new(
        vertices: [Vec3; 3],
        source_face_index: u32,
        texture_index: u16,
    ) -> Result<Self> {
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(AuralTraceError::DegenerateGeometry(format!(
                "face {source_face_index} has a non-finite vertex"
            )));
        }

        let edges = [
            vertices[1] - vertices[0],
            vertices[2] - vertices[1],
            vertices[0] - vertices[2],
        ];

        let raw_normal = edges[0].cross(edges[1]);
        if raw_normal.length_squared() <= f32::EPSILON {
            return Err(AuralTraceError::DegenerateGeometry(format!(
                "face {source_face_index} has zero area"
            )));
        }
        let normal = raw_normal.normalize();

        let mut edge_normals = [Vec3::ZERO; 3];
        let mut edge_distances = [0.0_f32; 3];
        let mut edge_distances_safe = [0.0_f32; 3];
        for i in 0..3 {
            let raw = normal.cross(edges[i]);
            let edge_normal = if raw.length_squared() <= f32::EPSILON {
                Vec3::Z
            } else {
                raw.normalize()
            };
            edge_normals[i] = edge_normal;
            edge_distances[i] = vertices[i].dot(edge_normal);
            edge_distances_safe[i] = edge_distances[i] - SAFE_DISTANCE_MARGIN;
        }

        Ok(Self {
            vertices,
            normal,
            edge_normals,
            edge_distances,
            edge_distances_safe,
            source_face_index,
            texture_index,
        })
    }

    pub fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }

    pub fn min_extend(&self) -> Vec3 {
        self.vertices[0].min(self.vertices[1]).min(self.vertices[2])
    }

    pub fn max_extend(&self) -> Vec3 {
        self.vertices[0].max(self.vertices[1]).max(self.vertices[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Face {
        Face::new(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            0,
            0,
        )
        .unwrap()
    }

    #[test]
    fn edge_distance_invariant_holds() {
        let face = unit_triangle();
        for i in 0..3 {
            let computed = face.edge_normals[i].dot(face.vertices[i]);
            assert!((computed - face.edge_distances[i]).abs() < 1e-6);
            let safe_gap = face.edge_distances[i] - face.edge_distances_safe[i];
            assert!((safe_gap - SAFE_DISTANCE_MARGIN).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_zero_area_is_rejected() {
        let result = Face::new(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
            1,
            0,
        );
        assert!(matches!(
            result,
            Err(AuralTraceError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn nan_vertex_is_rejected() {
        let result = Face::new(
            [
                Vec3::new(f32::NAN, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            2,
            0,
        );
        assert!(matches!(
            result,
            Err(AuralTraceError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn normal_points_along_right_hand_rule() {
        let face = unit_triangle();
        assert!((face.normal - Vec3::Z).length() < 1e-6);
    }
}
