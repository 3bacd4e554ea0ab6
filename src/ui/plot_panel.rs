use egui_plot::{
    log_grid_spacer, AxisHints, GridInput, GridMark, HPlacement, Legend, Line, Plot, PlotBounds,
    PlotPoints, Points,
};

use crate::data::parser::YAxis;
use crate::processing::downsampling::{decimate_for_view, MAX_POINTS_PER_SERIES};
use crate::state::axis_state::{AxisId, AxisScale, AxisState};
use crate::state::plot_state::PlotState;
use crate::ui::axis_format::AxisFormat;

/// Display formats of the three axes.
#[derive(Debug, Clone, Default)]
pub struct AxisFormats {
    pub x: AxisFormat,
    pub y: AxisFormat,
    pub y2: AxisFormat,
}

impl AxisFormats {
    pub fn get(&self, id: AxisId) -> &AxisFormat {
        match id {
            AxisId::X => &self.x,
            AxisId::Y => &self.y,
            AxisId::Y2 => &self.y2,
        }
    }
}

/// Linear map between Y2 axis space and the Y1 space the plot draws in.
#[derive(Debug, Clone, Copy)]
struct Y2Mapping {
    y_min: f64,
    y_span: f64,
    y2_min: f64,
    y2_span: f64,
}

impl Y2Mapping {
    fn new(y: &AxisState, y2: &AxisState) -> Self {
        let (y_min, y_max) = drawable(y.min, y.max);
        let (y2_min, y2_max) = drawable(y2.min, y2.max);
        Self {
            y_min,
            y_span: y_max - y_min,
            y2_min,
            y2_span: y2_max - y2_min,
        }
    }

    fn to_y1(self, v: f64) -> f64 {
        self.y_min + (v - self.y2_min) * self.y_span / self.y2_span
    }

    fn to_y2(self, v: f64) -> f64 {
        self.y2_min + (v - self.y_min) * self.y2_span / self.y_span
    }
}

/// Bounds the plot can show: finite and non-empty.
fn drawable(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max - min > f64::EPSILON * min.abs().max(max.abs()).max(1.0) {
        return (min, max);
    }
    let pad = (min.abs() * 0.1).max(0.5);
    (min - pad, max + pad)
}

/// Whole-decade ticks for a log10 axis, falling back to finer spacing when
/// zoomed in below a decade or two.
fn decade_spacer(input: GridInput) -> Vec<GridMark> {
    let (min, max) = input.bounds;
    let span = max - min;
    if !span.is_finite() || span < 2.0 {
        return log_grid_spacer(10)(input);
    }
    let step = (span / 8.0).ceil().max(1.0);
    let mut marks = Vec::new();
    let mut value = (min / step).ceil() * step;
    while value <= max {
        marks.push(GridMark {
            value,
            step_size: step,
        });
        value += step;
    }
    marks
}

/// Render the chart and fold pan/zoom back into the axes.
pub fn show_plot_panel(plot: &mut PlotState, formats: &AxisFormats, ui: &mut egui::Ui) {
    let has_y2 = plot.has_y2();
    let mapping = Y2Mapping::new(&plot.y_axis, &plot.y2_axis);
    let (x_scale, y_scale, y2_scale) = (
        plot.x_axis.scale(),
        plot.y_axis.scale(),
        plot.y2_axis.scale(),
    );

    let x_fmt = formats.x.clone();
    let y_fmt = formats.y.clone();
    let y2_fmt = formats.y2.clone();
    let hover_x = formats.x.clone();
    let hover_y = formats.y.clone();

    let mut y_axes = vec![AxisHints::new_y()
        .label(plot.y_axis.label.clone())
        .formatter(move |mark, _range| y_fmt.format_axis_value(mark.value, y_scale))];
    if has_y2 {
        y_axes.push(
            AxisHints::new_y()
                .label(plot.y2_axis.label.clone())
                .placement(HPlacement::Right)
                .formatter(move |mark, _range| {
                    y2_fmt.format_axis_value(mapping.to_y2(mark.value), y2_scale)
                }),
        );
    }

    let mut chart = Plot::new("tail_plot")
        .legend(Legend::default())
        .allow_drag(true)
        .allow_zoom(true)
        .allow_scroll(true)
        .allow_boxed_zoom(true)
        .x_axis_label(plot.x_axis.label.clone())
        .x_axis_formatter(move |mark, _range| x_fmt.format_axis_value(mark.value, x_scale))
        .custom_y_axes(y_axes)
        .label_formatter(move |name, value| {
            let x = hover_x.format_axis_value(value.x, x_scale);
            let y = hover_y.format_axis_value(value.y, y_scale);
            if name.is_empty() {
                format!("{x}, {y}")
            } else {
                format!("{name}\n{x}, {y}")
            }
        });
    if x_scale == AxisScale::Log10 {
        chart = chart.x_grid_spacer(decade_spacer);
    }
    if y_scale == AxisScale::Log10 {
        chart = chart.y_grid_spacer(decade_spacer);
    }

    let (x_min, x_max) = drawable(plot.x_axis.min, plot.x_axis.max);
    let (y_min, y_max) = drawable(plot.y_axis.min, plot.y_axis.max);
    let bounds = PlotBounds::from_min_max([x_min, y_min], [x_max, y_max]);

    let response = chart.show(ui, |plot_ui| {
        plot_ui.set_plot_bounds(bounds);

        for series in plot.series() {
            if !series.visible || series.x.is_empty() {
                continue;
            }
            let mut points =
                decimate_for_view(&series.x, &series.y, x_min, x_max, MAX_POINTS_PER_SERIES);
            if series.axis == YAxis::Y2 {
                for p in &mut points {
                    p[1] = mapping.to_y1(p[1]);
                }
            }
            let color = series.color32();
            if series.scatter {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(&series.label)
                        .color(color)
                        .radius(series.line_width + 0.5),
                );
            } else {
                plot_ui.line(
                    Line::new(PlotPoints::from(points))
                        .name(&series.label)
                        .color(color)
                        .width(series.line_width),
                );
            }
        }
    });

    // ========================================================================
    // User interaction: double-click restores autoscale, pan/zoom disables it
    // ========================================================================
    let r = &response.response;
    if r.double_clicked() {
        plot.set_auto_range(AxisId::X, true);
        plot.set_auto_range(AxisId::Y, true);
        plot.set_auto_range(AxisId::Y2, true);
        return;
    }

    let scrolled = r.hovered()
        && ui.input(|i| i.smooth_scroll_delta != egui::Vec2::ZERO || i.zoom_delta() != 1.0);
    if !(r.dragged() || scrolled) {
        return;
    }

    let shown = response.transform.bounds();
    let [new_x_min, new_y_min] = shown.min();
    let [new_x_max, new_y_max] = shown.max();
    if (new_x_min, new_x_max) != (x_min, x_max) {
        plot.x_axis.manipulated(new_x_min, new_x_max);
    }
    if (new_y_min, new_y_max) != (y_min, y_max) {
        plot.y_axis.manipulated(new_y_min, new_y_max);
        if has_y2 {
            plot.y2_axis
                .manipulated(mapping.to_y2(new_y_min), mapping.to_y2(new_y_max));
        }
    }
}
