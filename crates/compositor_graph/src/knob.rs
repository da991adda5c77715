// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameters ("knobs") of nodes and table items.

use crate::curve::{Curve, CurveType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KnobId(pub Uuid);

impl KnobId {
    /// Create a new random knob ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KnobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of a dimension of a knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct DimIdx(pub usize);

/// Index of a view ("take") of a knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ViewIdx(pub usize);

/// A single dimension or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimSpec {
    /// Every dimension
    All,
    /// One dimension
    Dim(DimIdx),
}

impl DimSpec {
    /// Expand into concrete dimensions
    pub fn expand(&self, n_dims: usize) -> Vec<DimIdx> {
        match self {
            Self::All => (0..n_dims).map(DimIdx).collect(),
            Self::Dim(dim) => vec![*dim],
        }
    }
}

/// A single view or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewSetSpec {
    /// Every view
    All,
    /// One view
    View(ViewIdx),
}

impl ViewSetSpec {
    /// Expand into concrete views
    pub fn expand(&self, views: &[ViewIdx]) -> Vec<ViewIdx> {
        match self {
            Self::All => views.to_vec(),
            Self::View(view) => vec![*view],
        }
    }
}

/// Kind of value held by a knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnobKind {
    /// Floating point
    Double,
    /// Integer
    Int,
    /// Checkbox
    Bool,
    /// Menu entry index
    Choice,
    /// Text
    String,
    /// Push button, holds no value
    Button,
}

impl KnobKind {
    /// Whether values of this kind can be animated
    pub fn can_animate(&self) -> bool {
        !matches!(self, Self::Button)
    }

    /// Curve type used to animate this kind
    pub fn curve_type(&self) -> CurveType {
        match self {
            Self::Double | Self::Button => CurveType::Double,
            Self::Int | Self::Choice => CurveType::Int,
            Self::Bool => CurveType::Bool,
            Self::String => CurveType::String,
        }
    }
}

/// Template used by plugin descriptors to instantiate knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnobTemplate {
    /// Script name
    pub name: String,
    /// Kind of value
    pub kind: KnobKind,
    /// Default value per dimension
    pub defaults: Vec<f64>,
    /// Hidden from the user interface
    pub secret: bool,
    /// Whether animation is allowed
    pub animatable: bool,
}

impl KnobTemplate {
    /// Create a visible, animatable template
    pub fn new(name: impl Into<String>, kind: KnobKind, defaults: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind,
            defaults,
            secret: false,
            animatable: kind.can_animate(),
        }
    }

    /// Hide the knob from the user interface
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Forbid animation
    pub fn not_animatable(mut self) -> Self {
        self.animatable = false;
        self
    }
}

/// A parameter with one value and one curve per (view, dimension)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Knob {
    /// Unique knob ID
    pub id: KnobId,
    /// Script name
    pub name: String,
    /// Kind of value
    pub kind: KnobKind,
    /// Hidden from the user interface
    pub secret: bool,
    animatable: bool,
    n_dims: usize,
    views: Vec<ViewIdx>,
    /// Static values indexed by view position, then dimension
    values: Vec<Vec<f64>>,
    /// Curves indexed by view position, then dimension
    curves: Vec<Vec<Curve>>,
}

impl Knob {
    /// Instantiate a knob from a template
    pub fn from_template(template: &KnobTemplate) -> Self {
        let n_dims = template.defaults.len().max(1);
        let mut defaults = template.defaults.clone();
        defaults.resize(n_dims, 0.0);
        let curve = Curve::new(template.kind.curve_type());
        Self {
            id: KnobId::new(),
            name: template.name.clone(),
            kind: template.kind,
            secret: template.secret,
            animatable: template.animatable,
            n_dims,
            views: vec![ViewIdx(0)],
            values: vec![defaults],
            curves: vec![vec![curve; n_dims]],
        }
    }

    /// Whether the knob may carry animation
    pub fn can_animate(&self) -> bool {
        self.animatable && self.kind.can_animate()
    }

    /// Number of dimensions
    pub fn n_dimensions(&self) -> usize {
        self.n_dims
    }

    /// Views this knob has values for
    pub fn views(&self) -> &[ViewIdx] {
        &self.views
    }

    fn view_position(&self, view: ViewIdx) -> Option<usize> {
        self.views.iter().position(|v| *v == view)
    }

    /// Give `view` its own values and curves, copied from the main view
    pub fn split_view(&mut self, view: ViewIdx) {
        if self.view_position(view).is_some() {
            return;
        }
        self.views.push(view);
        self.values.push(self.values[0].clone());
        self.curves.push(self.curves[0].clone());
    }

    /// Curve of a (view, dimension) pair
    pub fn curve(&self, view: ViewIdx, dim: DimIdx) -> Option<&Curve> {
        let pos = self.view_position(view)?;
        self.curves.get(pos)?.get(dim.0)
    }

    /// Mutable curve of a (view, dimension) pair
    pub fn curve_mut(&mut self, view: ViewIdx, dim: DimIdx) -> Option<&mut Curve> {
        let pos = self.view_position(view)?;
        self.curves.get_mut(pos)?.get_mut(dim.0)
    }

    /// Whether any curve has keyframes
    pub fn has_animation(&self) -> bool {
        self.curves.iter().flatten().any(|c| !c.is_empty())
    }

    /// Static value, ignoring animation
    pub fn value(&self, dim: DimIdx, view: ViewIdx) -> f64 {
        self.view_position(view)
            .or(Some(0))
            .and_then(|pos| self.values.get(pos))
            .and_then(|dims| dims.get(dim.0))
            .copied()
            .unwrap_or(0.0)
    }

    /// Static value rounded to an integer
    pub fn int_value(&self, dim: DimIdx, view: ViewIdx) -> i64 {
        self.value(dim, view).round() as i64
    }

    /// Value at `time`, from the curve when animated
    pub fn value_at_time(&self, time: f64, dim: DimIdx, view: ViewIdx) -> f64 {
        self.curve(view, dim)
            .and_then(|c| c.evaluate(time))
            .unwrap_or_else(|| self.value(dim, view))
    }

    /// Set the static value of a (view, dimension) pair, returns false if it does not exist
    pub fn set_value(&mut self, dim: DimIdx, view: ViewIdx, value: f64) -> bool {
        let Some(pos) = self.view_position(view) else {
            return false;
        };
        let value = match self.kind {
            KnobKind::Int | KnobKind::Choice => value.round(),
            KnobKind::Bool => f64::from(u8::from(value >= 0.5)),
            _ => value,
        };
        match self.values.get_mut(pos).and_then(|dims| dims.get_mut(dim.0)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
