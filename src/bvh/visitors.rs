//! Ray-BVH visitors: blocked / closest-hit / all-hits (spec §4.2).
//!
//! All three share the same AABB-vs-ray slab test and node traversal
//! order (the child whose center is closer along the ray direction is
//! visited first).

use crate::bvh::model_bvh::ModelBvh;
use crate::bvh::builder::{BvhNode, BvhNodeKind};
use crate::bvh::result::HitList;
use crate::error::Result;
use crate::geometry::{safe_inverse_direction, Face};
use crate::math::Vec3;

/// Cap on hits a single `trace_all_hits` cast may accumulate (spec §7:
/// degenerate geometry producing unbounded near-duplicate hits must not
/// exhaust memory silently). Comfortably above anything a real model
/// produces; existing in the first place so pathological input degrades
/// the owning probe instead of growing without bound.
const MAX_HITS_PER_CAST: usize = 4096;

/// Which side of a face counts as "front" for a given query. The source
/// material sometimes wants `dot(n, d) < 0` (ray travels against the
/// normal) and sometimes `> 0`; the caller picks per spec §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    NegativeDot,
    PositiveDot,
}

impl Facing {
    fn is_front(self, dot: f32) -> bool {
        match self {
            Facing::NegativeDot => dot < 0.0,
            Facing::PositiveDot => dot > 0.0,
        }
    }

    /// Whether a [`TriangleHit::front`] recorded under `Facing::NegativeDot`
    /// (as `trace_all_hits` always records it, `desired` being `None`)
    /// satisfies this facing. Lets a cached all-hits list stand in for a
    /// facing-filtered query without recomputing `dot`.
    pub fn matches(self, front: bool) -> bool {
        match self {
            Facing::NegativeDot => front,
            Facing::PositiveDot => !front,
        }
    }
}

/// A single triangle intersection (spec §4.2 "Triangle intersection").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    /// True if the hit satisfied the query's desired facing.
    pub front: bool,
    pub texture_index: u16,
    pub source_face_index: u32,
}

const PARALLEL_EPSILON: f32 = 1e-6;

/// Plane-then-edge triangle test (spec §4.2). `desired` is `None` for
/// all-hits queries (both facings accepted); `Some(facing)` rejects hits
/// on the undesired side.
pub fn intersect_triangle(
    face: &Face,
    origin: Vec3,
    dir: Vec3,
    limit: f32,
    desired: Option<Facing>,
) -> Option<TriangleHit> {
    let dot = face.normal.dot(dir);
    if dot.abs() < PARALLEL_EPSILON {
        return None;
    }
    if let Some(facing) = desired {
        if !facing.is_front(dot) {
            return None;
        }
    }

    let lambda = (face.vertices[0] - origin).dot(face.normal) / dot;
    if lambda < 0.0 || lambda > limit {
        return None;
    }

    let p = origin + dir * lambda;
    for i in 0..3 {
        if face.edge_normals[i].dot(p) < face.edge_distances_safe[i] {
            return None;
        }
    }

    Some(TriangleHit {
        distance: lambda,
        point: p,
        normal: face.normal,
        front: dot < 0.0,
        texture_index: face.texture_index,
        source_face_index: face.source_face_index,
    })
}

/// Something that can tell a visitor whether a given texture index is
/// acoustically blocking (has absorption > 0 in any band). Implemented
/// by `scene::Component`; kept as a trait here so the BVH layer never
/// depends on the scene layer.
pub trait MaterialLookup {
    fn is_blocking(&self, texture_index: u16) -> bool;
}

struct RayContext {
    origin: Vec3,
    dir: Vec3,
    inv_dir: Vec3,
    length: f32,
    facing: Facing,
}

fn order_children(nodes: &[BvhNode], left: u32, right: u32, ctx: &RayContext) -> (u32, u32) {
    let dl = (nodes[left as usize].center - ctx.origin).dot(ctx.dir);
    let dr = (nodes[right as usize].center - ctx.origin).dot(ctx.dir);
    if dl <= dr {
        (left, right)
    } else {
        (right, left)
    }
}

/// Returns true on the first forward-facing hit with blocking material.
pub fn trace_blocked(
    bvh: &ModelBvh,
    origin: Vec3,
    dir: Vec3,
    length: f32,
    facing: Facing,
    material: &dyn MaterialLookup,
) -> bool {
    let Some(root) = bvh.root() else {
        return false;
    };
    let ctx = RayContext {
        origin,
        dir,
        inv_dir: safe_inverse_direction(dir * length),
        length,
        facing,
    };
    trace_blocked_node(bvh, root, &ctx, material)
}

fn trace_blocked_node(
    bvh: &ModelBvh,
    node: &BvhNode,
    ctx: &RayContext,
    material: &dyn MaterialLookup,
) -> bool {
    if !node.aabb().hit_ray(ctx.origin, ctx.inv_dir) {
        return false;
    }
    match node.kind {
        BvhNodeKind::Leaf {
            first_item,
            item_count,
        } => {
            let faces = bvh.faces();
            for i in first_item..first_item + item_count {
                let face = &faces[i as usize];
                if !material.is_blocking(face.texture_index) {
                    continue;
                }
                if intersect_triangle(face, ctx.origin, ctx.dir, ctx.length, Some(ctx.facing))
                    .is_some()
                {
                    return true;
                }
            }
            false
        }
        BvhNodeKind::Internal { left, right } => {
            let (first, second) = order_children(bvh.nodes(), left, right, ctx);
            let nodes = bvh.nodes();
            trace_blocked_node(bvh, &nodes[first as usize], ctx, material)
                || trace_blocked_node(bvh, &nodes[second as usize], ctx, material)
        }
    }
}

/// Closest front-facing hit within `length`, or `None`.
pub fn trace_closest(
    bvh: &ModelBvh,
    origin: Vec3,
    dir: Vec3,
    length: f32,
    facing: Facing,
) -> Option<TriangleHit> {
    let root = bvh.root()?;
    let ctx = RayContext {
        origin,
        dir,
        inv_dir: safe_inverse_direction(dir * length),
        length,
        facing,
    };
    let mut limit = length;
    let mut best: Option<TriangleHit> = None;
    trace_closest_node(bvh, root, &ctx, &mut limit, &mut best);
    best
}

fn trace_closest_node(
    bvh: &ModelBvh,
    node: &BvhNode,
    ctx: &RayContext,
    limit: &mut f32,
    best: &mut Option<TriangleHit>,
) {
    if !node.aabb().hit_ray(ctx.origin, ctx.inv_dir) {
        return;
    }
    match node.kind {
        BvhNodeKind::Leaf {
            first_item,
            item_count,
        } => {
            let faces = bvh.faces();
            for i in first_item..first_item + item_count {
                let face = &faces[i as usize];
                if let Some(hit) =
                    intersect_triangle(face, ctx.origin, ctx.dir, *limit, Some(ctx.facing))
                {
                    if hit.distance < *limit {
                        *limit = hit.distance;
                        *best = Some(hit);
                    }
                }
            }
        }
        BvhNodeKind::Internal { left, right } => {
            let (first, second) = order_children(bvh.nodes(), left, right, ctx);
            let nodes = bvh.nodes();
            trace_closest_node(bvh, &nodes[first as usize], ctx, limit, best);
            trace_closest_node(bvh, &nodes[second as usize], ctx, limit, best);
        }
    }
}

/// Every hit (front and back) along the ray, sorted by distance. Errs with
/// [`crate::error::AuralTraceError::OutOfMemory`] if the cast accumulates
/// more than `MAX_HITS_PER_CAST` hits — the caller folds the owning probe
/// to `degraded` rather than growing the hit list without bound.
pub fn trace_all_hits(bvh: &ModelBvh, origin: Vec3, dir: Vec3, length: f32) -> Result<Vec<TriangleHit>> {
    let mut hits = HitList::new(MAX_HITS_PER_CAST);
    let Some(root) = bvh.root() else {
        return Ok(hits.into_vec());
    };
    let ctx = RayContext {
        origin,
        dir,
        inv_dir: safe_inverse_direction(dir * length),
        length,
        facing: Facing::NegativeDot, // unused for all-hits (desired=None)
    };
    trace_all_hits_node(bvh, root, &ctx, &mut hits)?;
    Ok(hits.into_vec())
}

fn trace_all_hits_node(bvh: &ModelBvh, node: &BvhNode, ctx: &RayContext, hits: &mut HitList) -> Result<()> {
    if !node.aabb().hit_ray(ctx.origin, ctx.inv_dir) {
        return Ok(());
    }
    match node.kind {
        BvhNodeKind::Leaf {
            first_item,
            item_count,
        } => {
            let faces = bvh.faces();
            for i in first_item..first_item + item_count {
                let face = &faces[i as usize];
                if let Some(hit) = intersect_triangle(face, ctx.origin, ctx.dir, ctx.length, None) {
                    hits.push(hit)?;
                }
            }
            Ok(())
        }
        BvhNodeKind::Internal { left, right } => {
            let nodes = bvh.nodes();
            trace_all_hits_node(bvh, &nodes[left as usize], ctx, hits)?;
            trace_all_hits_node(bvh, &nodes[right as usize], ctx, hits)
        }
    }
}
