use bytemuck::{Pod, Zeroable};
use cgmath::{EuclideanSpace, Point3};

use crate::scene::Parallelogram;

/// Quads this small stop splitting and become a leaf.
const MAX_LEAF_SIZE: usize = 2;

/// Boxes are padded so axis-aligned quads never produce a zero-thickness
/// slab, which would feed NaNs into the ray-box test.
const BOUNDS_PAD: f32 = 1e-3;

#[derive(Copy, Clone, Debug)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Aabb {
        Aabb {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn of_parallelogram(quad: &Parallelogram) -> Aabb {
        let mut bounds = Aabb::empty();
        for corner in quad.corners() {
            bounds.grow_point(corner);
        }
        bounds
    }

    pub fn grow_point(&mut self, point: Point3<f32>) {
        self.min = Point3::new(
            self.min.x.min(point.x),
            self.min.y.min(point.y),
            self.min.z.min(point.z),
        );
        self.max = Point3::new(
            self.max.x.max(point.x),
            self.max.y.max(point.y),
            self.max.z.max(point.z),
        );
    }

    pub fn grow(&mut self, other: &Aabb) {
        self.grow_point(other.min);
        self.grow_point(other.max);
    }

    pub fn centroid(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }
}

/// Flattened tree node, mirrored by the traversal loop in trace.wgsl.
///
/// `count > 0` marks a leaf holding `count` entries of the index buffer
/// starting at `first`. Otherwise `first` names the left child and the
/// right child sits at `first + 1`; node 0 is always the root, so a leaf
/// with `first == 0` and `count == 0` is the empty tree.
#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub min: [f32; 3],
    pub first: u32,
    pub max: [f32; 3],
    pub count: u32,
}

pub struct Bvh {
    pub nodes: Vec<GpuBvhNode>,
    pub indices: Vec<u32>,
}

impl Bvh {
    /// Median split along the longest centroid axis. The scene is rebuilt
    /// rarely enough that build quality beats build speed here.
    pub fn build(quads: &[Parallelogram]) -> Bvh {
        let mut nodes = Vec::new();
        let mut indices = Vec::with_capacity(quads.len());
        if quads.is_empty() {
            nodes.push(GpuBvhNode::default());
            return Bvh { nodes, indices };
        }

        let boxes: Vec<Aabb> = quads.iter().map(Aabb::of_parallelogram).collect();
        let centroids: Vec<Point3<f32>> = boxes.iter().map(Aabb::centroid).collect();
        let mut order: Vec<u32> = (0..quads.len() as u32).collect();

        nodes.push(GpuBvhNode::default());
        build_range(&mut nodes, &mut indices, &boxes, &centroids, &mut order, 0);
        Bvh { nodes, indices }
    }
}

fn build_range(
    nodes: &mut Vec<GpuBvhNode>,
    indices: &mut Vec<u32>,
    boxes: &[Aabb],
    centroids: &[Point3<f32>],
    items: &mut [u32],
    node_index: usize,
) {
    let mut bounds = Aabb::empty();
    let mut centroid_bounds = Aabb::empty();
    for &item in items.iter() {
        bounds.grow(&boxes[item as usize]);
        centroid_bounds.grow_point(centroids[item as usize]);
    }
    let min = [
        bounds.min.x - BOUNDS_PAD,
        bounds.min.y - BOUNDS_PAD,
        bounds.min.z - BOUNDS_PAD,
    ];
    let max = [
        bounds.max.x + BOUNDS_PAD,
        bounds.max.y + BOUNDS_PAD,
        bounds.max.z + BOUNDS_PAD,
    ];

    if items.len() <= MAX_LEAF_SIZE {
        nodes[node_index] = GpuBvhNode {
            min,
            first: indices.len() as u32,
            max,
            count: items.len() as u32,
        };
        indices.extend_from_slice(items);
        return;
    }

    let axis = centroid_bounds.longest_axis();
    items.sort_by(|&a, &b| centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis]));
    let mid = items.len() / 2;

    let left_child = nodes.len();
    nodes.push(GpuBvhNode::default());
    nodes.push(GpuBvhNode::default());
    nodes[node_index] = GpuBvhNode {
        min,
        first: left_child as u32,
        max,
        count: 0,
    };

    let (left_items, right_items) = items.split_at_mut(mid);
    build_range(nodes, indices, boxes, centroids, left_items, left_child);
    build_range(nodes, indices, boxes, centroids, right_items, left_child + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneDescription;

    fn node_bounds(node: &GpuBvhNode) -> Aabb {
        Aabb {
            min: Point3::from(node.min),
            max: Point3::from(node.max),
        }
    }

    #[test]
    fn tiny_scenes_collapse_to_a_single_leaf() {
        let scene = SceneDescription::cornell_box();
        let bvh = Bvh::build(&scene.quads[..2]);
        assert_eq!(bvh.nodes.len(), 1);
        assert_eq!(bvh.nodes[0].count, 2);
        assert_eq!(bvh.nodes[0].first, 0);
        let mut sorted = bvh.indices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1]);
    }

    #[test]
    fn single_quad_scene_is_one_leaf() {
        let scene = SceneDescription::cornell_box();
        let bvh = Bvh::build(&scene.quads[..1]);
        assert_eq!(bvh.nodes.len(), 1);
        assert_eq!(bvh.nodes[0].count, 1);
        assert_eq!(bvh.nodes[0].first, 0);
        assert_eq!(bvh.indices, vec![0]);
        let quad_box = Aabb::of_parallelogram(&scene.quads[0]);
        assert!(node_bounds(&bvh.nodes[0]).contains(&quad_box));
    }

    #[test]
    fn known_scene_builds_a_deterministic_layout() {
        // Three unit strips spaced along x. The centroid sort is stable
        // and total_cmp based, so the flattened tree is reproducible:
        // the median split leaves one strip on the left and two on the
        // right, children allocated right after the root.
        let strip = |x: f32| Parallelogram {
            anchor: Point3::new(x, 0.0, 0.0),
            offset1: cgmath::Vector3::new(1.0, 0.0, 0.0),
            offset2: cgmath::Vector3::new(0.0, 0.0, 1.0),
            material: 0,
        };
        let quads = [strip(0.0), strip(10.0), strip(20.0)];
        let bvh = Bvh::build(&quads);

        assert_eq!(bvh.nodes.len(), 3);
        assert_eq!(bvh.indices, vec![0, 1, 2]);
        let root = &bvh.nodes[0];
        assert_eq!((root.first, root.count), (1, 0));
        let left = &bvh.nodes[1];
        assert_eq!((left.first, left.count), (0, 1));
        let right = &bvh.nodes[2];
        assert_eq!((right.first, right.count), (1, 2));
        assert!(left.max[0] < 2.0, "left leaf covers only the first strip");
        assert!(right.min[0] > 9.0, "right leaf starts at the second strip");
    }

    #[test]
    fn empty_scene_encodes_as_an_empty_leaf() {
        let bvh = Bvh::build(&[]);
        assert_eq!(bvh.nodes.len(), 1);
        assert_eq!(bvh.nodes[0].count, 0);
        assert_eq!(bvh.nodes[0].first, 0);
        assert!(bvh.indices.is_empty());
    }

    #[test]
    fn cornell_box_tree_is_well_formed() {
        let scene = SceneDescription::cornell_box();
        let bvh = Bvh::build(&scene.quads);

        let mut seen = vec![false; scene.quads.len()];
        for (i, node) in bvh.nodes.iter().enumerate() {
            if node.count > 0 {
                assert!(node.count as usize <= MAX_LEAF_SIZE);
                for slot in node.first..node.first + node.count {
                    let quad = bvh.indices[slot as usize] as usize;
                    assert!(!seen[quad], "quad {quad} referenced twice");
                    seen[quad] = true;
                    let quad_box = Aabb::of_parallelogram(&scene.quads[quad]);
                    assert!(
                        node_bounds(node).contains(&quad_box),
                        "leaf {i} does not cover quad {quad}"
                    );
                }
            } else {
                let left = node.first as usize;
                assert!(left >= 1, "internal node {i} points at the root");
                assert!(left + 1 < bvh.nodes.len(), "child of {i} out of range");
                for child in [left, left + 1] {
                    assert!(
                        node_bounds(node).contains(&node_bounds(&bvh.nodes[child])),
                        "node {i} does not cover child {child}"
                    );
                }
            }
        }
        assert!(
            seen.iter().all(|&s| s),
            "every quad must land in exactly one leaf"
        );
        assert_eq!(bvh.indices.len(), scene.quads.len());
    }

    #[test]
    fn children_are_allocated_in_pairs() {
        let scene = SceneDescription::cornell_box();
        let bvh = Bvh::build(&scene.quads);
        // Root plus a pair per internal node.
        let internal = bvh.nodes.iter().filter(|n| n.count == 0).count();
        assert_eq!(bvh.nodes.len(), 1 + 2 * internal);
    }

    #[test]
    fn node_layout_matches_the_shader_struct() {
        assert_eq!(std::mem::size_of::<GpuBvhNode>(), 32);
    }
}
