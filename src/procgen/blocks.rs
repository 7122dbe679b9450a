//! Recursive subdivision of the world into city blocks and roads.
//!
//! Blocks are split breadth-first. Each split bisects a block along one axis
//! and lays a road over the cut; the road loses two lanes per level until it
//! bottoms out at two. A block becomes a leaf once neither half could still
//! host a minimal row of buildings plus its road and sidewalks.

use std::collections::VecDeque;

use bevy::prelude::*;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rand::Rng;

use super::constants::{
    BUILDING_SIZE, LANES_PER_SPLIT, LANE_WIDTH, MIN_LANES, MIN_SPLIT_SLOTS, SIDEWALK_WIDTH_PER_LANE,
};
use super::geometry::{rect_area, within_highway_clearance};
use super::highway::HighwayPoint;
use super::roads::{RoadRef, RoadSegment};

/// Side of a block, in ground-plane coordinates. `Top` faces −Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
            Side::Top => 2,
            Side::Bottom => 3,
        }
    }
}

/// Axis a block is cut along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitAxis {
    /// Cut by a vertical line; children sit left and right.
    Vertical,
    /// Cut by a horizontal line; children sit top and bottom.
    Horizontal,
}

/// Smallest extent that fits `slots` buildings beside a road of `lanes`.
pub fn min_block_size(lanes: u32, slots: u32) -> f32 {
    slots as f32 * BUILDING_SIZE
        + lanes as f32 * LANE_WIDTH
        + lanes as f32 * SIDEWALK_WIDTH_PER_LANE
}

/// Lane count of the road laid by splitting a block of `lanes`.
pub fn child_lanes(lanes: u32) -> u32 {
    lanes.saturating_sub(LANES_PER_SPLIT).max(MIN_LANES)
}

/// Whether cutting `extent` in half still leaves two viable children.
pub fn can_split(extent: f32, lanes: u32, slots: u32) -> bool {
    let road_width = child_lanes(lanes) as f32 * LANE_WIDTH;
    (extent - road_width) / 2.0 >= min_block_size(lanes, slots)
}

/// Highway samples that claim space around `bounds`.
pub fn filter_highway_points(bounds: Rect, points: &[HighwayPoint]) -> Vec<HighwayPoint> {
    points
        .iter()
        .filter(|point| within_highway_clearance(bounds, point))
        .copied()
        .collect()
}

/// A rectangular block bounded by up to four roads.
#[derive(Clone, Debug)]
pub struct CityBlock {
    pub bounds: Rect,
    /// Lanes of the road whose split produced this block.
    pub lanes: u32,
    pub depth: u32,
    roads: [Option<RoadRef>; 4],
    pub highway_points: Vec<HighwayPoint>,
    /// Node of this block in the split hierarchy.
    pub node: NodeIndex,
}

impl CityBlock {
    pub fn road(&self, side: Side) -> Option<&RoadRef> {
        self.roads[side.index()].as_ref()
    }

    pub fn roads(&self) -> impl Iterator<Item = &RoadRef> {
        self.roads.iter().flatten()
    }

    /// Lanes of `side`'s road, or zero when the side faces the world edge.
    pub fn road_lanes(&self, side: Side) -> u32 {
        self.road(side).map_or(0, |road| road.lanes())
    }

    /// Lanes of the widest adjacent road.
    pub fn widest_road_lanes(&self) -> u32 {
        self.roads().map(|road| road.lanes()).max().unwrap_or(0)
    }

    pub fn sidewalk_width(&self) -> f32 {
        SIDEWALK_WIDTH_PER_LANE * self.widest_road_lanes() as f32
    }

    pub fn area(&self) -> f32 {
        rect_area(self.bounds)
    }
}

/// An entry of the generated layout, in emission order.
#[derive(Clone, Debug)]
pub enum CityElement {
    Road(RoadRef),
    Block(CityBlock),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitNode {
    pub bounds: Rect,
    pub lanes: u32,
    pub depth: u32,
    pub leaf: bool,
}

/// Parent → child edges of every split performed.
#[derive(Clone, Debug, Default)]
pub struct SplitHierarchy {
    pub graph: DiGraph<SplitNode, SplitAxis>,
    pub root: Option<NodeIndex>,
}

impl SplitHierarchy {
    pub fn node(&self, index: NodeIndex) -> Option<&SplitNode> {
        self.graph.node_weight(index)
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
    }

    /// Lane counts from the root down to `index`.
    pub fn lane_path(&self, index: NodeIndex) -> Vec<u32> {
        let mut lanes = Vec::new();
        let mut cursor = Some(index);
        while let Some(node) = cursor {
            if let Some(weight) = self.graph.node_weight(node) {
                lanes.push(weight.lanes);
            }
            cursor = self.parent(node);
        }
        lanes.reverse();
        lanes
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(|index| self.graph[*index].leaf)
    }
}

/// Output of the block splitter.
#[derive(Resource, Clone, Debug, Default)]
pub struct CityLayout {
    pub world: Rect,
    pub elements: Vec<CityElement>,
    pub hierarchy: SplitHierarchy,
}

impl CityLayout {
    pub fn roads(&self) -> impl Iterator<Item = &RoadRef> {
        self.elements.iter().filter_map(|element| match element {
            CityElement::Road(road) => Some(road),
            CityElement::Block(_) => None,
        })
    }

    /// Leaf blocks. Only leaves are ever emitted.
    pub fn blocks(&self) -> impl Iterator<Item = &CityBlock> {
        self.elements.iter().filter_map(|element| match element {
            CityElement::Block(block) => Some(block),
            CityElement::Road(_) => None,
        })
    }

    pub fn road_count(&self) -> usize {
        self.roads().count()
    }

    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    /// Summed area of leaf blocks and roads. Equals the world area.
    pub fn covered_area(&self) -> f32 {
        let blocks: f32 = self.blocks().map(CityBlock::area).sum();
        let roads: f32 = self.roads().map(|road| road.area()).sum();
        blocks + roads
    }
}

/// Partition `world` into blocks and roads.
///
/// Per block the generator draws, in order: the slot count for each axis
/// and one weight for each axis. The draw order is fixed so a seed always
/// reproduces the same layout.
pub fn split(
    world: Rect,
    initial_lanes: u32,
    highway_points: &[HighwayPoint],
    rng: &mut impl Rng,
) -> CityLayout {
    let lanes = if initial_lanes < MIN_LANES {
        warn!(
            "Initial lane count {} is below the minimum, using {}",
            initial_lanes, MIN_LANES
        );
        MIN_LANES
    } else {
        initial_lanes
    };

    let mut hierarchy = SplitHierarchy::default();
    let root_node = hierarchy.graph.add_node(SplitNode {
        bounds: world,
        lanes,
        depth: 0,
        leaf: false,
    });
    hierarchy.root = Some(root_node);

    let root = CityBlock {
        bounds: world,
        lanes,
        depth: 0,
        roads: [None, None, None, None],
        highway_points: filter_highway_points(world, highway_points),
        node: root_node,
    };

    let mut elements = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(block) = queue.pop_front() {
        let size = block.bounds.size();
        let slots_w = draw_slots(rng);
        let slots_h = draw_slots(rng);
        let vertical = can_split(size.x, block.lanes, slots_w);
        let horizontal = can_split(size.y, block.lanes, slots_h);
        let weight_w = rng.gen::<f32>() * size.x * if vertical { 1.0 } else { 0.0 };
        let weight_h = rng.gen::<f32>() * size.y * if horizontal { 1.0 } else { 0.0 };

        let axis = if vertical && weight_w > weight_h {
            SplitAxis::Vertical
        } else if horizontal {
            SplitAxis::Horizontal
        } else if vertical {
            SplitAxis::Vertical
        } else {
            hierarchy.graph[block.node].leaf = true;
            elements.push(CityElement::Block(block));
            continue;
        };

        let (road, children) = bisect(&block, axis);
        elements.push(CityElement::Road(road));
        for mut child in children {
            child.node = hierarchy.graph.add_node(SplitNode {
                bounds: child.bounds,
                lanes: child.lanes,
                depth: child.depth,
                leaf: false,
            });
            hierarchy.graph.add_edge(block.node, child.node, axis);
            queue.push_back(child);
        }
    }

    info!(
        "Split {:.0}x{:.0} world into {} blocks and {} roads",
        world.width(),
        world.height(),
        elements
            .iter()
            .filter(|e| matches!(e, CityElement::Block(_)))
            .count(),
        elements
            .iter()
            .filter(|e| matches!(e, CityElement::Road(_)))
            .count(),
    );

    CityLayout {
        world,
        elements,
        hierarchy,
    }
}

/// Slots a child must fit along one axis: 2, 3 or 4.
fn draw_slots(rng: &mut impl Rng) -> u32 {
    MIN_SPLIT_SLOTS + (rng.gen::<f32>() * 2.5).floor() as u32
}

/// Cut `block` at its midpoint and lay a road over the cut.
fn bisect(block: &CityBlock, axis: SplitAxis) -> (RoadRef, [CityBlock; 2]) {
    let lanes = child_lanes(block.lanes);
    let half_road = lanes as f32 * LANE_WIDTH * 0.5;
    let Rect { min, max } = block.bounds;
    let center = block.bounds.center();

    let (road, first, second, first_side, second_side) = match axis {
        SplitAxis::Vertical => (
            RoadSegment::new(Vec2::new(center.x, min.y), Vec2::new(center.x, max.y), lanes),
            Rect::from_corners(min, Vec2::new(center.x - half_road, max.y)),
            Rect::from_corners(Vec2::new(center.x + half_road, min.y), max),
            Side::Right,
            Side::Left,
        ),
        SplitAxis::Horizontal => (
            RoadSegment::new(Vec2::new(min.x, center.y), Vec2::new(max.x, center.y), lanes),
            Rect::from_corners(min, Vec2::new(max.x, center.y - half_road)),
            Rect::from_corners(Vec2::new(min.x, center.y + half_road), max),
            Side::Bottom,
            Side::Top,
        ),
    };
    let road = RoadRef::new(road);

    let child = |bounds: Rect, facing: Side| {
        let mut roads = block.roads.clone();
        roads[facing.index()] = Some(road.clone());
        CityBlock {
            bounds,
            lanes,
            depth: block.depth + 1,
            roads,
            highway_points: filter_highway_points(bounds, &block.highway_points),
            node: block.node,
        }
    };
    let children = [child(first, first_side), child(second, second_side)];
    (road, children)
}
