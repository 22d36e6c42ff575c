//! Vector features in face space.
//!
//! Coordinates are normalized to `[0, 1]` on their face (or the single Web
//! Mercator plane) until the tile holding them is transformed, after which
//! they are local to that tile's unit square.

use serde::{Deserialize, Serialize};

use crate::coords::Face;

/// Free-form feature properties.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Metadata key that routes a feature into a named layer.
pub const LAYER_KEY: &str = "layer";

/// A 2D point with optional elevation and per-vertex measures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Measure values carried along with the vertex through clipping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<Properties>,
}

impl VectorPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub const fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: None,
        }
    }

    pub fn with_m(mut self, m: Option<Properties>) -> Self {
        self.m = m;
        self
    }

    /// Planar distance, ignoring `z`.
    pub fn distance(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// True when `x` and `y` match exactly.
    pub fn same_xy(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// A line string plus the arc length consumed before its first point.
///
/// The offset lets dashed strokes continue across tile cuts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorLine {
    pub points: Vec<VectorPoint>,
    #[serde(default)]
    pub offset: f64,
}

impl VectorLine {
    pub fn new(points: Vec<VectorPoint>) -> Self {
        Self {
            points,
            offset: 0.0,
        }
    }

    pub fn with_offset(points: Vec<VectorPoint>, offset: f64) -> Self {
        Self { points, offset }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total planar length of the line.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.points.iter())
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box around a single point.
    pub fn from_point(p: &VectorPoint) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Smallest box holding every point, or `None` for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a VectorPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bbox = Self::from_point(iter.next()?);
        for p in iter {
            bbox.extend(p);
        }
        Some(bbox)
    }

    /// Grow to include a point.
    pub fn extend(&mut self, p: &VectorPoint) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grow to include another box.
    pub fn merge(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn contains(&self, p: &VectorPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// `[min_x, min_y, max_x, max_y]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl From<[f64; 4]> for BBox {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// Geometry payload, tagged like GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Coordinates {
    Point(VectorPoint),
    MultiPoint(Vec<VectorPoint>),
    LineString(VectorLine),
    MultiLineString(Vec<VectorLine>),
    /// Exterior ring first, then holes.
    Polygon(Vec<VectorLine>),
    MultiPolygon(Vec<Vec<VectorLine>>),
}

impl Coordinates {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::MultiPoint(_) => "MultiPoint",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn is_point_type(&self) -> bool {
        matches!(self, Self::Point(_) | Self::MultiPoint(_))
    }

    /// Visit every vertex.
    pub fn for_each_point(&self, mut f: impl FnMut(&VectorPoint)) {
        match self {
            Self::Point(p) => f(p),
            Self::MultiPoint(points) => points.iter().for_each(f),
            Self::LineString(line) => line.points.iter().for_each(f),
            Self::MultiLineString(lines) | Self::Polygon(lines) => {
                lines.iter().flat_map(|l| l.points.iter()).for_each(f)
            }
            Self::MultiPolygon(polygons) => polygons
                .iter()
                .flatten()
                .flat_map(|l| l.points.iter())
                .for_each(f),
        }
    }

    /// Visit every vertex mutably.
    pub fn for_each_point_mut(&mut self, mut f: impl FnMut(&mut VectorPoint)) {
        match self {
            Self::Point(p) => f(p),
            Self::MultiPoint(points) => points.iter_mut().for_each(f),
            Self::LineString(line) => line.points.iter_mut().for_each(f),
            Self::MultiLineString(lines) | Self::Polygon(lines) => lines
                .iter_mut()
                .flat_map(|l| l.points.iter_mut())
                .for_each(f),
            Self::MultiPolygon(polygons) => polygons
                .iter_mut()
                .flatten()
                .flat_map(|l| l.points.iter_mut())
                .for_each(f),
        }
    }

    pub fn point_count(&self) -> usize {
        let mut count = 0;
        self.for_each_point(|_| count += 1);
        count
    }

    pub fn bbox(&self) -> Option<BBox> {
        let mut bbox: Option<BBox> = None;
        self.for_each_point(|p| match bbox.as_mut() {
            Some(b) => b.extend(p),
            None => bbox = Some(BBox::from_point(p)),
        });
        bbox
    }
}

/// Coordinates plus their bounding boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorGeometry {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    /// Lon/lat bounds of the source geometry (only kept when requested).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    /// Bounds in the current vector space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vec_bbox: Option<BBox>,
}

impl VectorGeometry {
    /// Wrap coordinates and compute `vec_bbox` from them.
    pub fn new(coordinates: Coordinates) -> Self {
        let vec_bbox = coordinates.bbox();
        Self {
            coordinates,
            bbox: None,
            vec_bbox,
        }
    }

    pub fn with_bbox(mut self, bbox: Option<BBox>) -> Self {
        self.bbox = bbox;
        self
    }

    /// True when any vertex carries elevation.
    pub fn is_3d(&self) -> bool {
        let mut is_3d = false;
        self.coordinates.for_each_point(|p| is_3d |= p.z.is_some());
        is_3d
    }

    pub fn type_name(&self) -> &'static str {
        self.coordinates.type_name()
    }

    /// Recompute `vec_bbox` from the current coordinates.
    pub fn update_vec_bbox(&mut self) {
        self.vec_bbox = self.coordinates.bbox();
    }
}

/// A geometry with identity, properties and the face it lives on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub face: Face,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Properties>,
    pub geometry: VectorGeometry,
}

impl VectorFeature {
    pub fn new(face: Face, geometry: VectorGeometry) -> Self {
        Self {
            id: None,
            face,
            properties: Properties::new(),
            metadata: None,
            geometry,
        }
    }

    pub fn with_id(mut self, id: Option<u64>) -> Self {
        self.id = id;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<Properties>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Layer requested through `metadata.layer`, if it is a string.
    pub fn layer_name(&self) -> Option<&str> {
        self.metadata.as_ref()?.get(LAYER_KEY)?.as_str()
    }
}
