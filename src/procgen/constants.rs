//! Size constants for the generated city, in world units (metres).

/// Width of a single traffic lane.
pub const LANE_WIDTH: f32 = 3.0;
/// Sidewalk inset contributed by each lane of the widest adjacent road.
pub const SIDEWALK_WIDTH_PER_LANE: f32 = 1.0;
/// Spacing between sidewalk lamp posts.
pub const LAMPPOST_INTERVAL: f32 = 10.0;
/// Edge length of one building slot.
pub const BUILDING_SIZE: f32 = 15.0;
pub const FLOOR_HEIGHT: f32 = 3.5;

/// Clearance kept between highway centerlines and anything built on the ground.
pub const HIGHWAY_WIDTH: f32 = 4.001;
pub const HIGHWAY_THICKNESS: f32 = 1.201;
/// Full width of a highway deck section.
pub const HIGHWAY_DECK_WIDTH: f32 = 2.0 * HIGHWAY_WIDTH;
/// Distance covered by one step of the highway random walk.
pub const HIGHWAY_STEP: f32 = 100.0;
/// Number of points sampled from each highway curve.
pub const HIGHWAY_SAMPLES: usize = 150;
pub const HIGHWAY_LAMP_INTERVAL: f32 = 20.0;

/// Lane floor for split roads.
pub const MIN_LANES: u32 = 2;
/// Lanes lost per split level.
pub const LANES_PER_SPLIT: u32 = 2;
/// Smallest slot count a split child must fit along each axis.
pub const MIN_SPLIT_SLOTS: u32 = 2;
/// Largest slot count the splitter may demand along an axis.
pub const MAX_SPLIT_SLOTS: u32 = 4;

pub const ROAD_THICKNESS: f32 = 1.0;
pub const GROUND_THICKNESS: f32 = 0.5;
