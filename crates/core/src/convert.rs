//! Source data to vector features.
//!
//! Two kinds of input are accepted, wrapped in [`SourceData`]:
//!
//! - **GeoJSON** in lon/lat, converted by [`convert`].
//! - **S2 features** ([`S2Feature`], [`S2FeatureCollection`]) whose
//!   coordinates are already face `(s, t)` values on a declared face,
//!   converted by [`convert_s2_features`].
//!
//! Two target spaces are supported:
//!
//! - **WM**: Web Mercator on a single plane (face 0). `x = lon / 360 + 0.5` and
//!   `y` is the Mercator ordinate scaled into `[0, 1]`.
//! - **S2**: each geometry is projected onto the cube faces it touches, in
//!   face `(s, t)` coordinates. Points go to the face containing them. Lines
//!   and polygons go to every face whose hemisphere holds all of their
//!   vertices and are clipped to that face (plus buffer). S2 features already
//!   on a face stay there untouched.
//!
//! Geometry collections are flattened into one feature per member. The
//! non-standard member `"metadata"` becomes [`VectorFeature::metadata`], and a
//! geometry's `"mValues"` member (one object per position, nested like the
//! coordinates) becomes the per-vertex [`VectorPoint::m`].

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use geojson::{feature, GeoJson, Value};
use serde::{Deserialize, Serialize};

use crate::clip::{clip_geometry, Axis, DEFAULT_BUFFER};
use crate::coords::{
    face_uv_to_xyz, face_xyz_to_uv, lon_lat_to_xyz, st_to_uv, uv_to_st, xyz_to_face,
    xyz_to_lon_lat, Face, NUM_FACES,
};
use crate::geometry::{
    BBox, Coordinates, Properties, VectorFeature, VectorGeometry, VectorLine, VectorPoint,
};
use crate::simplify::simplify;
use crate::{Error, Result};

/// Foreign member copied into feature metadata.
const METADATA_KEY: &str = "metadata";

/// Geometry member holding per-position measure values.
pub const M_VALUES_KEY: &str = "mValues";

/// Target space for converted features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Projection {
    /// Web Mercator, all features on face 0.
    #[default]
    WM,
    /// S2 cube faces.
    S2,
}

impl FromStr for Projection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wm" => Ok(Projection::WM),
            "s2" => Ok(Projection::S2),
            other => Err(Error::InvalidConfig(format!(
                "unknown projection '{}', expected 'wm' or 's2'",
                other
            ))),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::WM => write!(f, "WM"),
            Projection::S2 => write!(f, "S2"),
        }
    }
}

/// Conversion settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    /// Keep the lon/lat bounds of every geometry in `VectorGeometry::bbox`.
    pub build_bbox: bool,
    /// Buffer kept around a face when S2 lines/polygons are clipped to it.
    pub buffer: f64,
    /// Simplification tolerance in units of a 4096-wide tile (0 disables).
    pub tolerance: f64,
    /// Zoom whose resolution lines and rings are pre-simplified to. `None`
    /// skips pre-simplification.
    pub maxzoom: Option<u8>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            build_bbox: false,
            buffer: DEFAULT_BUFFER,
            tolerance: 0.0,
            maxzoom: None,
        }
    }
}

impl ConvertOptions {
    /// Drop detail finer than `tolerance` at `maxzoom`.
    fn presimplify(&self, geometry: &mut VectorGeometry) {
        if let Some(maxzoom) = self.maxzoom {
            simplify(geometry, self.tolerance, maxzoom, None);
        }
    }
}

// ============================================================================
// S2 features
// ============================================================================

/// A feature already placed on a cube face, in face `(s, t)` coordinates.
///
/// Serialized like a GeoJSON feature with `"type": "S2Feature"` and an extra
/// `"face"` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "S2Feature")]
pub struct S2Feature {
    pub face: Face,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Properties>,
    pub geometry: Option<geojson::Geometry>,
}

/// A collection of [`S2Feature`]s (`"type": "S2FeatureCollection"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "S2FeatureCollection")]
pub struct S2FeatureCollection {
    pub features: Vec<S2Feature>,
}

/// Input for a tile store: GeoJSON or S2 features.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData {
    GeoJson(GeoJson),
    S2(S2FeatureCollection),
}

impl SourceData {
    /// Parse `Feature`, `FeatureCollection` and geometry objects as GeoJSON,
    /// `S2Feature` and `S2FeatureCollection` as S2 features.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let invalid = |e: &dyn fmt::Display| Error::InvalidInput(e.to_string());
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        match kind.as_deref() {
            Some("S2FeatureCollection") => serde_json::from_value(value)
                .map(SourceData::S2)
                .map_err(|e| invalid(&e)),
            Some("S2Feature") => serde_json::from_value::<S2Feature>(value)
                .map(|feature| {
                    SourceData::S2(S2FeatureCollection {
                        features: vec![feature],
                    })
                })
                .map_err(|e| invalid(&e)),
            _ => GeoJson::from_json_value(value)
                .map(SourceData::GeoJson)
                .map_err(|e| invalid(&e)),
        }
    }

    /// Projection used when none is configured: WM for GeoJSON, S2 for
    /// S2 features.
    pub fn default_projection(&self) -> Projection {
        match self {
            SourceData::GeoJson(_) => Projection::WM,
            SourceData::S2(_) => Projection::S2,
        }
    }
}

impl FromStr for SourceData {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Self::from_json_value(value)
    }
}

impl From<GeoJson> for SourceData {
    fn from(data: GeoJson) -> Self {
        SourceData::GeoJson(data)
    }
}

impl From<S2FeatureCollection> for SourceData {
    fn from(data: S2FeatureCollection) -> Self {
        SourceData::S2(data)
    }
}

/// Convert either kind of source for `projection`.
pub fn convert_source(
    projection: Projection,
    data: &SourceData,
    options: &ConvertOptions,
) -> Vec<VectorFeature> {
    match data {
        SourceData::GeoJson(data) => convert(projection, data, options),
        SourceData::S2(data) => convert_s2_features(projection, data, options),
    }
}

/// Convert S2 features for `projection`.
///
/// With [`Projection::S2`] every feature stays on its declared face with its
/// coordinates as given. With [`Projection::WM`] positions are unprojected to
/// lon/lat and mapped onto face 0. Features on an invalid face are skipped.
pub fn convert_s2_features(
    projection: Projection,
    data: &S2FeatureCollection,
    options: &ConvertOptions,
) -> Vec<VectorFeature> {
    let mut out = Vec::new();
    for feature in &data.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let face = feature.face;
        if face >= NUM_FACES {
            log::debug!("skipped S2 feature on invalid face {}", face);
            continue;
        }
        let template = Template {
            id: feature.id.as_ref().and_then(json_id),
            properties: feature.properties.clone(),
            metadata: feature.metadata.clone(),
        };

        let to_lon_lat = |s: f64, t: f64| st_to_lon_lat(face, s, t);
        let mut members = Vec::new();
        flatten(geometry, &mut members);
        for member in members {
            let bbox = if options.build_bbox {
                lon_lat_bbox(&member.value, &to_lon_lat)
            } else {
                None
            };
            let m = m_values(member);
            let (target, coordinates) = match projection {
                Projection::S2 => {
                    let project = |(s, t, z): (f64, f64, Option<f64>)| {
                        Some(VectorPoint {
                            x: s,
                            y: t,
                            z,
                            m: None,
                        })
                    };
                    (face, build_coordinates(&member.value, m, &project))
                }
                Projection::WM => {
                    let project = |(s, t, z): (f64, f64, Option<f64>)| {
                        let (lon, lat) = to_lon_lat(s, t);
                        Some(wm_point(lon, lat, z))
                    };
                    (0, build_coordinates(&member.value, m, &project))
                }
            };
            match coordinates {
                Some(coordinates) => {
                    let mut geometry = VectorGeometry::new(coordinates).with_bbox(bbox);
                    options.presimplify(&mut geometry);
                    out.push(template.build(target, geometry));
                }
                None => log::debug!("skipped {} with no usable output", value_type(&member.value)),
            }
        }
    }
    log::debug!("converted {} S2 features to {} features", data.features.len(), projection);
    out
}

/// Lon/lat of face `(s, t)`.
fn st_to_lon_lat(face: Face, s: f64, t: f64) -> (f64, f64) {
    xyz_to_lon_lat(face_uv_to_xyz(face, st_to_uv(s), st_to_uv(t)))
}

// ============================================================================
// GeoJSON
// ============================================================================

/// Convert GeoJSON into vector features for `projection`.
///
/// Features without a geometry, and geometries without usable positions,
/// are skipped.
pub fn convert(
    projection: Projection,
    data: &GeoJson,
    options: &ConvertOptions,
) -> Vec<VectorFeature> {
    let mut features = Vec::new();
    match data {
        GeoJson::Geometry(geometry) => {
            convert_geometry(projection, geometry, &Template::default(), options, &mut features);
        }
        GeoJson::Feature(feature) => {
            convert_feature(projection, feature, options, &mut features);
        }
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                convert_feature(projection, feature, options, &mut features);
            }
        }
    }
    log::debug!("converted {} {} features", features.len(), projection);
    features
}

/// Identity and attributes shared by every feature built from one input.
#[derive(Default)]
struct Template {
    id: Option<u64>,
    properties: Properties,
    metadata: Option<Properties>,
}

impl Template {
    fn build(&self, face: Face, geometry: VectorGeometry) -> VectorFeature {
        VectorFeature::new(face, geometry)
            .with_id(self.id)
            .with_properties(self.properties.clone())
            .with_metadata(self.metadata.clone())
    }
}

fn convert_feature(
    projection: Projection,
    feature: &geojson::Feature,
    options: &ConvertOptions,
    out: &mut Vec<VectorFeature>,
) {
    let Some(geometry) = &feature.geometry else {
        return;
    };
    let template = Template {
        id: feature.id.as_ref().and_then(feature_id),
        properties: feature.properties.clone().unwrap_or_default(),
        metadata: feature
            .foreign_members
            .as_ref()
            .and_then(|members| members.get(METADATA_KEY))
            .and_then(|value| value.as_object())
            .cloned(),
    };
    convert_geometry(projection, geometry, &template, options, out);
}

fn feature_id(id: &feature::Id) -> Option<u64> {
    match id {
        feature::Id::Number(n) => n.as_u64(),
        feature::Id::String(s) => s.parse().ok(),
    }
}

fn json_id(id: &serde_json::Value) -> Option<u64> {
    match id {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn convert_geometry(
    projection: Projection,
    geometry: &geojson::Geometry,
    template: &Template,
    options: &ConvertOptions,
    out: &mut Vec<VectorFeature>,
) {
    let mut members = Vec::new();
    flatten(geometry, &mut members);

    for member in members {
        let value = &member.value;
        let m = m_values(member);
        let bbox = if options.build_bbox {
            lon_lat_bbox(value, &|lon: f64, lat: f64| (lon, lat))
        } else {
            None
        };
        let before = out.len();
        match projection {
            Projection::WM => {
                let project =
                    |(lon, lat, z): (f64, f64, Option<f64>)| Some(wm_point(lon, lat, z));
                if let Some(coordinates) = build_coordinates(value, m, &project) {
                    let mut geometry = VectorGeometry::new(coordinates).with_bbox(bbox);
                    options.presimplify(&mut geometry);
                    out.push(template.build(0, geometry));
                }
            }
            Projection::S2 => convert_s2(value, m, template, bbox, options, out),
        }
        if out.len() == before {
            log::debug!("skipped {} with no usable output", value_type(value));
        }
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn flatten<'a>(geometry: &'a geojson::Geometry, out: &mut Vec<&'a geojson::Geometry>) {
    match &geometry.value {
        Value::GeometryCollection(members) => {
            for member in members {
                flatten(member, out);
            }
        }
        _ => out.push(geometry),
    }
}

// ============================================================================
// Measure values
// ============================================================================

/// The `mValues` member of a geometry, if any.
fn m_values(geometry: &geojson::Geometry) -> Option<&serde_json::Value> {
    geometry.foreign_members.as_ref()?.get(M_VALUES_KEY)
}

/// Element `index` of a nested `mValues` array.
fn m_at(m: Option<&serde_json::Value>, index: usize) -> Option<&serde_json::Value> {
    m?.as_array()?.get(index)
}

/// The measure object for one position.
fn m_object(m: Option<&serde_json::Value>) -> Option<Properties> {
    m?.as_object().cloned()
}

// ============================================================================
// Projections
// ============================================================================

/// `(lon, lat, z)` of a GeoJSON position with at least two values.
fn position(p: &[f64]) -> Option<(f64, f64, Option<f64>)> {
    match p {
        [lon, lat] => Some((*lon, *lat, None)),
        [lon, lat, z, ..] => Some((*lon, *lat, Some(*z))),
        _ => None,
    }
}

/// Web Mercator position in `[0, 1]^2`.
fn wm_point(lon: f64, lat: f64, z: Option<f64>) -> VectorPoint {
    let sin = lat.to_radians().sin();
    let x = lon / 360.0 + 0.5;
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    VectorPoint {
        x: x.clamp(0.0, 1.0),
        y: y.clamp(0.0, 1.0),
        z,
        m: None,
    }
}

/// Face `(s, t)` of a position projected onto `face` (may fall off the face).
fn s2_point(face: Face, lon: f64, lat: f64, z: Option<f64>) -> VectorPoint {
    let (u, v) = face_xyz_to_uv(face, lon_lat_to_xyz(lon, lat));
    VectorPoint {
        x: uv_to_st(u),
        y: uv_to_st(v),
        z,
        m: None,
    }
}

/// True when `(lon, lat)` is strictly in the hemisphere centered on `face`.
fn in_face_hemisphere(face: Face, lon: f64, lat: f64) -> bool {
    let xyz = lon_lat_to_xyz(lon, lat);
    let axis = (face % 3) as usize;
    let component = if face < 3 { xyz[axis] } else { -xyz[axis] };
    component > 0.0
}

fn convert_s2(
    value: &Value,
    m: Option<&serde_json::Value>,
    template: &Template,
    bbox: Option<BBox>,
    options: &ConvertOptions,
    out: &mut Vec<VectorFeature>,
) {
    let (positions, is_multi): (Vec<(&Vec<f64>, Option<Properties>)>, bool) = match value {
        Value::Point(p) => (vec![(p, m_object(m))], false),
        Value::MultiPoint(ps) => (
            ps.iter()
                .enumerate()
                .map(|(k, p)| (p, m_object(m_at(m, k))))
                .collect(),
            true,
        ),
        _ => {
            convert_s2_shape(value, m, template, bbox, options, out);
            return;
        }
    };

    let mut by_face: BTreeMap<Face, Vec<VectorPoint>> = BTreeMap::new();
    for (p, point_m) in positions {
        let Some((lon, lat, z)) = position(p) else {
            continue;
        };
        let face = xyz_to_face(lon_lat_to_xyz(lon, lat));
        by_face
            .entry(face)
            .or_default()
            .push(s2_point(face, lon, lat, z).with_m(point_m));
    }
    for (face, mut points) in by_face {
        let coordinates = if !is_multi && points.len() == 1 {
            Coordinates::Point(points.remove(0))
        } else {
            Coordinates::MultiPoint(points)
        };
        let geometry = VectorGeometry::new(coordinates).with_bbox(bbox);
        out.push(template.build(face, geometry));
    }
}

/// Project a line or polygon onto every face whose hemisphere holds it.
fn convert_s2_shape(
    value: &Value,
    m: Option<&serde_json::Value>,
    template: &Template,
    bbox: Option<BBox>,
    options: &ConvertOptions,
    out: &mut Vec<VectorFeature>,
) {
    for face in 0..NUM_FACES {
        let mut inside = true;
        let mut any = false;
        for_each_position(value, &mut |lon, lat, _| {
            any = true;
            inside &= in_face_hemisphere(face, lon, lat);
        });
        if !any || !inside {
            continue;
        }

        let project =
            |(lon, lat, z): (f64, f64, Option<f64>)| Some(s2_point(face, lon, lat, z));
        let Some(coordinates) = build_coordinates(value, m, &project) else {
            continue;
        };
        let mut geometry = VectorGeometry::new(coordinates);
        options.presimplify(&mut geometry);
        let clipped = clip_geometry(&geometry, Axis::X, 0.0, 1.0, options.buffer)
            .and_then(|g| clip_geometry(&g, Axis::Y, 0.0, 1.0, options.buffer));
        if let Some(mut geometry) = clipped {
            geometry.bbox = bbox;
            out.push(template.build(face, geometry));
        }
    }
}

// ============================================================================
// Coordinate walking
// ============================================================================

type Project<'a> = &'a dyn Fn((f64, f64, Option<f64>)) -> Option<VectorPoint>;
type MValues<'a> = Option<&'a serde_json::Value>;

fn build_coordinates(value: &Value, m: MValues<'_>, project: Project<'_>) -> Option<Coordinates> {
    let point = |p: &Vec<f64>, m: MValues<'_>| {
        position(p)
            .and_then(project)
            .map(|point| point.with_m(m_object(m)))
    };
    let points = |ps: &Vec<Vec<f64>>, m: MValues<'_>| -> Vec<VectorPoint> {
        ps.iter()
            .enumerate()
            .filter_map(|(k, p)| point(p, m_at(m, k)))
            .collect()
    };
    let line = |ps: &Vec<Vec<f64>>, m: MValues<'_>| -> Option<VectorLine> {
        let points = points(ps, m);
        (!points.is_empty()).then(|| VectorLine::new(points))
    };
    let polygon = |rings: &Vec<Vec<Vec<f64>>>, m: MValues<'_>| -> Option<Vec<VectorLine>> {
        let rings: Vec<VectorLine> = rings
            .iter()
            .enumerate()
            .filter_map(|(k, ring)| line(ring, m_at(m, k)))
            .collect();
        (!rings.is_empty()).then_some(rings)
    };

    let coordinates = match value {
        Value::Point(p) => Coordinates::Point(point(p, m)?),
        Value::MultiPoint(ps) => {
            let points = points(ps, m);
            if points.is_empty() {
                return None;
            }
            Coordinates::MultiPoint(points)
        }
        Value::LineString(ps) => Coordinates::LineString(line(ps, m)?),
        Value::MultiLineString(lines) => {
            let lines: Vec<VectorLine> = lines
                .iter()
                .enumerate()
                .filter_map(|(k, ps)| line(ps, m_at(m, k)))
                .collect();
            if lines.is_empty() {
                return None;
            }
            Coordinates::MultiLineString(lines)
        }
        Value::Polygon(rings) => Coordinates::Polygon(polygon(rings, m)?),
        Value::MultiPolygon(polygons) => {
            let polygons: Vec<Vec<VectorLine>> = polygons
                .iter()
                .enumerate()
                .filter_map(|(k, rings)| polygon(rings, m_at(m, k)))
                .collect();
            if polygons.is_empty() {
                return None;
            }
            Coordinates::MultiPolygon(polygons)
        }
        Value::GeometryCollection(_) => return None,
    };
    Some(coordinates)
}

fn for_each_position(value: &Value, f: &mut dyn FnMut(f64, f64, Option<f64>)) {
    let mut visit = |p: &Vec<f64>| {
        if let Some((lon, lat, z)) = position(p) {
            f(lon, lat, z);
        }
    };
    match value {
        Value::Point(p) => visit(p),
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.iter().for_each(visit),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(visit)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(visit),
        Value::GeometryCollection(members) => {
            for member in members {
                for_each_position(&member.value, f);
            }
        }
    }
}

/// Lon/lat bounds of every position, mapped through `to_lon_lat`.
fn lon_lat_bbox(value: &Value, to_lon_lat: &dyn Fn(f64, f64) -> (f64, f64)) -> Option<BBox> {
    let mut bbox: Option<BBox> = None;
    for_each_position(value, &mut |x, y, _| {
        let (lon, lat) = to_lon_lat(x, y);
        let p = VectorPoint::new(lon, lat);
        match bbox.as_mut() {
            Some(b) => b.extend(&p),
            None => bbox = Some(BBox::from_point(&p)),
        }
    });
    bbox
}
