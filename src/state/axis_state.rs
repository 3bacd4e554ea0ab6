//! Running extrema, autoscaled bounds and log scaling for one plot axis.
//!
//! All values held here live in the axis's own coordinate space: raw values
//! on a linear axis, `log10` of raw values on a logarithmic one.

/// Smallest value a logarithmic axis can show. Non-positive inputs map here.
pub const LOG_FLOOR: f64 = 1e-100;

/// Fraction of the data span added on each side when autoscaling.
pub const MARGIN_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisId {
    X,
    Y,
    Y2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisScale {
    #[default]
    Linear,
    Log10,
}

impl AxisScale {
    /// Raw value to axis space.
    pub fn to_axis(self, value: f64) -> f64 {
        match self {
            AxisScale::Linear => value,
            AxisScale::Log10 => log10_floored(value),
        }
    }

    /// Axis space back to raw value.
    pub fn to_display(self, value: f64) -> f64 {
        match self {
            AxisScale::Linear => value,
            AxisScale::Log10 => 10f64.powf(value),
        }
    }
}

/// `log10` with non-positive values clamped to [`LOG_FLOOR`]. NaN stays NaN.
pub fn log10_floored(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else if value <= 0.0 {
        LOG_FLOOR.log10()
    } else {
        value.log10()
    }
}

#[derive(Debug, Clone)]
pub struct AxisState {
    pub label: String,
    /// Autoscale: bounds follow the data.
    pub auto_range: bool,
    /// Visible lower bound.
    pub min: f64,
    /// Visible upper bound.
    pub max: f64,
    scale: AxisScale,
    scroll_width: Option<f64>,
    data_min: f64,
    data_max: f64,
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            label: String::new(),
            auto_range: true,
            min: 0.0,
            max: 1.0,
            scale: AxisScale::Linear,
            scroll_width: None,
            data_min: f64::INFINITY,
            data_max: f64::NEG_INFINITY,
        }
    }
}

impl AxisState {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Show only the trailing `width` units of data (X axis).
    pub fn with_scroll_width(mut self, width: Option<f64>) -> Self {
        self.scroll_width = width.map(|w| self.scale.to_axis(w));
        self
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    pub fn is_log(&self) -> bool {
        self.scale == AxisScale::Log10
    }

    pub fn scroll_width(&self) -> Option<f64> {
        self.scroll_width
    }

    /// Running extrema, if any value has been observed since the last reset.
    pub fn data_range(&self) -> Option<(f64, f64)> {
        (self.data_min <= self.data_max).then_some((self.data_min, self.data_max))
    }

    /// Forget the running extrema. Autoscaled bounds return to `[0, 1]`.
    pub fn reset_min_max(&mut self) {
        self.data_min = f64::INFINITY;
        self.data_max = f64::NEG_INFINITY;
        if self.auto_range {
            self.min = 0.0;
            self.max = 1.0;
        }
    }

    /// Fold one axis-space value into the running extrema.
    pub fn update_min_max(&mut self, value: f64) {
        if !self.auto_range || value.is_nan() {
            return;
        }
        self.data_min = self.data_min.min(value);
        self.data_max = self.data_max.max(value);
    }

    /// Apply the running extrema to the visible bounds.
    pub fn commit_min_max(&mut self) {
        if !self.auto_range {
            return;
        }
        let Some((data_min, data_max)) = self.data_range() else {
            return;
        };
        let min = match self.scroll_width {
            Some(width) => data_max - width,
            None => data_min,
        };
        let margin = MARGIN_RATIO * (data_max - min);
        self.min = min - margin;
        self.max = data_max + margin;
    }

    /// Switch between linear and log10 scale.
    ///
    /// `values` must yield every accumulated value on this axis's dimension;
    /// each is rewritten in place. Returns `false` if already in that mode.
    pub fn set_logscale<'a>(
        &mut self,
        enable: bool,
        values: impl IntoIterator<Item = &'a mut f64>,
    ) -> bool {
        let target = if enable {
            AxisScale::Log10
        } else {
            AxisScale::Linear
        };
        if self.scale == target {
            return false;
        }
        let convert = |v: f64| {
            if enable {
                log10_floored(v)
            } else {
                10f64.powf(v)
            }
        };

        if self.data_min <= self.data_max {
            self.data_min = convert(self.data_min);
            self.data_max = convert(self.data_max);
        }
        self.scroll_width = self.scroll_width.map(convert);

        let mut touched = 0usize;
        for value in values {
            *value = convert(*value);
            touched += 1;
        }

        self.scale = target;
        if self.auto_range {
            self.commit_min_max();
        } else {
            self.min = convert(self.min);
            self.max = convert(self.max);
        }
        tracing::debug!(
            "{} axis now {:?}; {touched} values transformed",
            self.label,
            self.scale
        );
        true
    }

    /// The user dragged or zoomed this axis: bounds are now manual.
    pub fn manipulated(&mut self, min: f64, max: f64) {
        self.auto_range = false;
        self.min = min;
        self.max = max;
    }

    /// Set manual bounds typed in display units.
    pub fn set_display_bounds(&mut self, min: f64, max: f64) {
        let (min, max) = (self.scale.to_axis(min), self.scale.to_axis(max));
        self.manipulated(min, max);
    }

    pub fn display_min(&self) -> f64 {
        self.scale.to_display(self.min)
    }

    pub fn display_max(&self) -> f64 {
        self.scale.to_display(self.max)
    }
}
