//! Consumer-side state: every series of every source plus the three axes.
//!
//! Owned by the UI thread. Batches drained from sources are applied here in
//! one step each, followed by a single autoscale commit.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::data::parser::{Column, YAxis};
use crate::data::source::{Batch, Source};
use crate::state::axis_state::{AxisId, AxisState};
use crate::state::data_series::{color_for_index, Series};

/// Series and binding for one source's current generation.
#[derive(Debug, Default)]
pub struct SourceSlot {
    pub generation: u64,
    pub columns: Option<Arc<[Column]>>,
    pub series: Vec<Series>,
}

#[derive(Debug)]
pub struct PlotState {
    pub title: String,
    pub x_axis: AxisState,
    pub y_axis: AxisState,
    pub y2_axis: AxisState,
    slots: Vec<SourceSlot>,
    series_counter: usize,
}

impl PlotState {
    pub fn new(title: impl Into<String>, source_count: usize) -> Self {
        Self {
            title: title.into(),
            x_axis: AxisState::new("X"),
            y_axis: AxisState::new("Y"),
            y2_axis: AxisState::new("Y2"),
            slots: (0..source_count).map(|_| SourceSlot::default()).collect(),
            series_counter: 0,
        }
    }

    pub fn axis(&self, id: AxisId) -> &AxisState {
        match id {
            AxisId::X => &self.x_axis,
            AxisId::Y => &self.y_axis,
            AxisId::Y2 => &self.y2_axis,
        }
    }

    pub fn axis_mut(&mut self, id: AxisId) -> &mut AxisState {
        match id {
            AxisId::X => &mut self.x_axis,
            AxisId::Y => &mut self.y_axis,
            AxisId::Y2 => &mut self.y2_axis,
        }
    }

    pub fn slots(&self) -> &[SourceSlot] {
        &self.slots
    }

    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.slots.iter().flat_map(|slot| slot.series.iter())
    }

    pub fn has_y2(&self) -> bool {
        self.series().any(|s| s.axis == YAxis::Y2)
    }

    /// Apply one drained batch from source `source_index`.
    ///
    /// A batch from a newer generation first discards everything the source
    /// produced before and rescans the remaining sources' extrema. Rows from
    /// an older generation are dropped.
    pub fn flush(&mut self, source_index: usize, batch: Batch) {
        if source_index >= self.slots.len() {
            self.slots.resize_with(source_index + 1, SourceSlot::default);
        }

        let slot = &mut self.slots[source_index];
        if batch.generation < slot.generation {
            tracing::debug!(
                "Dropping {} rows from stale generation {} of source {source_index}",
                batch.rows.len(),
                batch.generation
            );
            return;
        }
        let restarted = batch.generation > slot.generation;
        if restarted {
            slot.generation = batch.generation;
            slot.columns = None;
            slot.series.clear();
        }

        if slot.columns.is_none() {
            if let Some(columns) = batch.columns {
                for column in columns.iter() {
                    slot.series
                        .push(Series::for_column(column, color_for_index(self.series_counter)));
                    self.series_counter += 1;
                }
                slot.columns = Some(columns);
            }
        }

        if restarted {
            self.rescan_min_max();
        }
        if batch.rows.is_empty() {
            return;
        }

        let slot = &mut self.slots[source_index];
        if slot.columns.is_none() {
            tracing::warn!(
                "Source {source_index} delivered {} rows before its columns",
                batch.rows.len()
            );
            return;
        }

        let x_scale = self.x_axis.scale();
        for row in &batch.rows {
            let x = x_scale.to_axis(row.first().copied().unwrap_or(f64::NAN));
            let mut any_visible = false;
            for (i, series) in slot.series.iter_mut().enumerate() {
                let axis = match series.axis {
                    YAxis::Y1 => &mut self.y_axis,
                    YAxis::Y2 => &mut self.y2_axis,
                };
                let y = axis.scale().to_axis(row.get(i + 1).copied().unwrap_or(f64::NAN));
                series.push(x, y);
                if series.visible {
                    any_visible = true;
                    axis.update_min_max(y);
                }
            }
            if any_visible {
                self.x_axis.update_min_max(x);
            }
        }

        self.commit_all();
    }

    /// Drain every source that asked for a flush since the last call.
    /// Returns the number of rows applied.
    pub fn apply_pending(&mut self, flushes: &Receiver<usize>, sources: &[Source]) -> usize {
        let mut rows = 0;
        for index in flushes.try_iter() {
            let Some(source) = sources.get(index) else {
                continue;
            };
            let batch = source.drain();
            rows += batch.rows.len();
            self.flush(index, batch);
        }
        rows
    }

    /// Recompute all extrema from the accumulated data.
    pub fn rescan_min_max(&mut self) {
        self.x_axis.reset_min_max();
        self.y_axis.reset_min_max();
        self.y2_axis.reset_min_max();

        for series in self.slots.iter().flat_map(|slot| slot.series.iter()) {
            if !series.visible {
                continue;
            }
            let axis = match series.axis {
                YAxis::Y1 => &mut self.y_axis,
                YAxis::Y2 => &mut self.y2_axis,
            };
            for (&x, &y) in series.x.iter().zip(&series.y) {
                self.x_axis.update_min_max(x);
                axis.update_min_max(y);
            }
        }

        self.commit_all();
    }

    /// Toggle log scale on one axis, rewriting that dimension of every series.
    pub fn set_logscale(&mut self, id: AxisId, enable: bool) {
        let changed = match id {
            AxisId::X => self.x_axis.set_logscale(
                enable,
                self.slots
                    .iter_mut()
                    .flat_map(|slot| slot.series.iter_mut())
                    .flat_map(|series| series.x.iter_mut()),
            ),
            AxisId::Y => self.y_axis.set_logscale(enable, y_values(&mut self.slots, YAxis::Y1)),
            AxisId::Y2 => self.y2_axis.set_logscale(enable, y_values(&mut self.slots, YAxis::Y2)),
        };
        if changed {
            tracing::info!("{id:?} axis log scale {}", if enable { "on" } else { "off" });
        }
    }

    /// Turn autoscale on or off. Turning it on rebuilds the extrema that were
    /// not tracked while it was off.
    pub fn set_auto_range(&mut self, id: AxisId, enabled: bool) {
        let axis = self.axis_mut(id);
        if axis.auto_range == enabled {
            return;
        }
        axis.auto_range = enabled;
        if enabled {
            self.rescan_min_max();
        }
    }

    pub fn set_series_visible(&mut self, source_index: usize, series_index: usize, visible: bool) {
        let Some(series) = self
            .slots
            .get_mut(source_index)
            .and_then(|slot| slot.series.get_mut(series_index))
        else {
            return;
        };
        if series.visible != visible {
            series.visible = visible;
            self.rescan_min_max();
        }
    }

    fn commit_all(&mut self) {
        self.x_axis.commit_min_max();
        self.y_axis.commit_min_max();
        self.y2_axis.commit_min_max();
    }
}

fn y_values(slots: &mut [SourceSlot], axis: YAxis) -> impl Iterator<Item = &mut f64> {
    slots
        .iter_mut()
        .flat_map(|slot| slot.series.iter_mut())
        .filter(move |series| series.axis == axis)
        .flat_map(|series| series.y.iter_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::format::InputFormat;

    fn columns(names: &[(&str, YAxis)]) -> Arc<[Column]> {
        names
            .iter()
            .enumerate()
            .map(|(i, (name, axis))| Column {
                name: name.to_string(),
                field: i + 1,
                axis: *axis,
                format: InputFormat::Number,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn batch(generation: u64, cols: &Arc<[Column]>, rows: &[&[f64]]) -> Batch {
        Batch {
            generation,
            columns: Some(cols.clone()),
            rows: rows.iter().map(|r| r.to_vec()).collect(),
        }
    }

    #[test]
    fn flush_appends_and_autoscales_once() {
        let cols = columns(&[("a", YAxis::Y1), ("b", YAxis::Y2)]);
        let mut plot = PlotState::new("t", 1);
        plot.flush(0, batch(0, &cols, &[&[0.0, 1.0, 100.0], &[10.0, 11.0, 200.0]]));

        let series: Vec<_> = plot.series().collect();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].y, vec![1.0, 11.0]);
        assert_eq!(series[1].y, vec![100.0, 200.0]);
        assert_eq!((plot.x_axis.min, plot.x_axis.max), (-1.0, 11.0));
        assert_eq!((plot.y_axis.min, plot.y_axis.max), (0.0, 12.0));
        assert_eq!((plot.y2_axis.min, plot.y2_axis.max), (90.0, 210.0));
    }

    #[test]
    fn new_generation_clears_source_and_rescans() {
        let cols = columns(&[("a", YAxis::Y1)]);
        let mut plot = PlotState::new("t", 2);
        plot.flush(0, batch(0, &cols, &[&[0.0, 1000.0]]));
        plot.flush(1, batch(0, &cols, &[&[0.0, 1.0], &[1.0, 2.0]]));

        plot.flush(
            0,
            Batch {
                generation: 1,
                columns: None,
                rows: Vec::new(),
            },
        );
        assert!(plot.slots()[0].series.is_empty());
        assert_eq!(plot.y_axis.data_range(), Some((1.0, 2.0)));

        plot.flush(0, batch(0, &cols, &[&[5.0, 5000.0]]));
        assert!(plot.slots()[0].series.is_empty());

        plot.flush(0, batch(1, &cols, &[&[0.0, 3.0]]));
        assert_eq!(plot.slots()[0].series[0].y, vec![3.0]);
        assert_eq!(plot.y_axis.data_range(), Some((1.0, 3.0)));
    }

    #[test]
    fn hidden_series_do_not_feed_extrema() {
        let cols = columns(&[("a", YAxis::Y1), ("b", YAxis::Y1)]);
        let mut plot = PlotState::new("t", 1);
        plot.flush(0, batch(0, &cols, &[&[0.0, 1.0, 50.0]]));
        plot.set_series_visible(0, 1, false);
        assert_eq!(plot.y_axis.data_range(), Some((1.0, 1.0)));

        plot.flush(0, batch(0, &cols, &[&[1.0, 2.0, 99.0]]));
        assert_eq!(plot.y_axis.data_range(), Some((1.0, 2.0)));
        assert_eq!(plot.slots()[0].series[1].point_count(), 2);
    }

    #[test]
    fn x_log_toggle_leaves_y_alone() {
        let cols = columns(&[("a", YAxis::Y1), ("b", YAxis::Y2)]);
        let mut plot = PlotState::new("t", 1);
        plot.flush(0, batch(0, &cols, &[&[10.0, 5.0, 50.0], &[100.0, 7.0, 70.0]]));

        plot.set_logscale(AxisId::X, true);
        assert!(plot.x_axis.is_log());
        let (lo, hi) = plot.x_axis.data_range().unwrap();
        assert!((lo - 1.0).abs() < 1e-12 && (hi - 2.0).abs() < 1e-12);
        for series in plot.series() {
            assert!((series.x[0] - 1.0).abs() < 1e-12);
            assert!((series.x[1] - 2.0).abs() < 1e-12);
        }
        let series: Vec<_> = plot.series().collect();
        assert_eq!(series[0].y, vec![5.0, 7.0]);
        assert_eq!(series[1].y, vec![50.0, 70.0]);

        plot.flush(0, batch(0, &cols, &[&[1000.0, 9.0, 90.0]]));
        assert!((plot.slots()[0].series[0].x[2] - 3.0).abs() < 1e-12);

        plot.set_logscale(AxisId::X, false);
        let series: Vec<_> = plot.series().collect();
        for (got, want) in series[1].x.iter().zip([10.0, 100.0, 1000.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        assert_eq!(series[0].y, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn log_toggle_touches_only_its_dimension() {
        let cols = columns(&[("a", YAxis::Y1), ("b", YAxis::Y2)]);
        let mut plot = PlotState::new("t", 1);
        plot.flush(0, batch(0, &cols, &[&[1.0, 10.0, 10.0], &[2.0, 100.0, 100.0]]));

        plot.set_logscale(AxisId::Y, true);
        let series: Vec<_> = plot.series().collect();
        assert!((series[0].y[1] - 2.0).abs() < 1e-12);
        assert_eq!(series[1].y, vec![10.0, 100.0]);
        assert_eq!(series[0].x, vec![1.0, 2.0]);

        plot.flush(0, batch(0, &cols, &[&[3.0, 1000.0, 1000.0]]));
        let series: Vec<_> = plot.series().collect();
        assert!((series[0].y[2] - 3.0).abs() < 1e-12);
        assert_eq!(series[1].y[2], 1000.0);

        plot.set_logscale(AxisId::Y, false);
        let series: Vec<_> = plot.series().collect();
        assert!((series[0].y[2] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn reenabling_autoscale_rebuilds_extrema() {
        let cols = columns(&[("a", YAxis::Y1)]);
        let mut plot = PlotState::new("t", 1);
        plot.set_auto_range(AxisId::Y, false);
        plot.flush(0, batch(0, &cols, &[&[0.0, 4.0], &[1.0, 8.0]]));
        assert_eq!(plot.y_axis.data_range(), None);

        plot.set_auto_range(AxisId::Y, true);
        assert_eq!(plot.y_axis.data_range(), Some((4.0, 8.0)));
    }
}
