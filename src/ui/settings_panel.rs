use crate::data::source::{ReaderState, Source};
use crate::state::axis_state::AxisId;
use crate::state::plot_state::PlotState;
use crate::ui::plot_panel::AxisFormats;

/// Side panel with axis, series and source controls.
pub fn show_settings_panel(
    ui: &mut egui::Ui,
    plot: &mut PlotState,
    formats: &AxisFormats,
    sources: &[Source],
) {
    egui::ScrollArea::vertical().show(ui, |ui| {
        // ====================================================================
        // SECTION 1: Axes
        // ====================================================================
        ui.label(egui::RichText::new("Axes").strong().size(15.0));
        ui.add_space(4.0);

        let mut axes = vec![AxisId::X, AxisId::Y];
        if plot.has_y2() {
            axes.push(AxisId::Y2);
        }
        for id in axes {
            axis_controls(ui, plot, formats, id);
            ui.add_space(6.0);
        }

        ui.separator();

        // ====================================================================
        // SECTION 2: Series visibility
        // ====================================================================
        ui.label(egui::RichText::new("Series").strong().size(15.0));
        ui.add_space(4.0);

        let mut toggled: Option<(usize, usize, bool)> = None;
        for (source_index, slot) in plot.slots().iter().enumerate() {
            for (series_index, series) in slot.series.iter().enumerate() {
                ui.horizontal(|ui| {
                    let mut visible = series.visible;
                    if ui.checkbox(&mut visible, "").on_hover_text("Show/hide series").changed() {
                        toggled = Some((source_index, series_index, visible));
                    }
                    let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                    ui.painter().rect_filled(rect, 2.0, series.color32());
                    ui.label(&series.label);
                    if series.scatter {
                        ui.label(egui::RichText::new("(points)").weak());
                    }
                });
            }
        }
        if plot.series().next().is_none() {
            ui.label(egui::RichText::new("Waiting for data...").weak());
        }
        if let Some((source_index, series_index, visible)) = toggled {
            plot.set_series_visible(source_index, series_index, visible);
        }

        ui.separator();

        // ====================================================================
        // SECTION 3: Sources
        // ====================================================================
        ui.label(egui::RichText::new("Sources").strong().size(15.0));
        ui.add_space(4.0);

        for source in sources {
            ui.horizontal(|ui| {
                ui.label(source.name());
                ui.label(egui::RichText::new(state_label(source.state())).weak());
            });
        }

        let restartable = !sources.is_empty() && sources.iter().all(Source::is_restartable);
        let mut auto_restart = restartable && sources.iter().all(Source::auto_restart);
        if ui
            .add_enabled(restartable, egui::Checkbox::new(&mut auto_restart, "Restart when truncated"))
            .changed()
        {
            for source in sources {
                source.set_auto_restart(auto_restart);
            }
        }
        if ui
            .add_enabled(restartable, egui::Button::new("Restart"))
            .on_hover_text("Clear the plot and read every file again")
            .clicked()
        {
            for source in sources {
                if let Err(e) = source.restart() {
                    tracing::error!("{e}");
                }
            }
        }
    });
}

fn axis_controls(ui: &mut egui::Ui, plot: &mut PlotState, formats: &AxisFormats, id: AxisId) {
    let editor = formats.get(id).for_editor();
    let axis = plot.axis(id);
    let label = axis.label.clone();
    let mut auto_range = axis.auto_range;
    let mut log = axis.is_log();
    let mut min = axis.display_min();
    let mut max = axis.display_max();

    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(6))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(&label).strong());
            ui.horizontal(|ui| {
                if ui.checkbox(&mut auto_range, "Autoscale").changed() {
                    plot.set_auto_range(id, auto_range);
                }
                if ui.checkbox(&mut log, "Log").changed() {
                    plot.set_logscale(id, log);
                }
            });

            let mut edited = false;
            egui::Grid::new(("axis_bounds", label.as_str()))
                .num_columns(2)
                .show(ui, |ui| {
                    for (name, value) in [("Min", &mut min), ("Max", &mut max)] {
                        ui.label(name);
                        let fmt = editor.clone();
                        let parser = editor.clone();
                        edited |= ui
                            .add(
                                egui::DragValue::new(value)
                                    .speed(0.0)
                                    .custom_formatter(move |v, _| fmt.format(v))
                                    .custom_parser(move |s| parser.parse(s)),
                            )
                            .changed();
                        ui.end_row();
                    }
                });
            if edited && min < max {
                plot.axis_mut(id).set_display_bounds(min, max);
            }
        });
}

fn state_label(state: ReaderState) -> &'static str {
    match state {
        ReaderState::Idle => "idle",
        ReaderState::Opening => "opening",
        ReaderState::Reading => "reading",
        ReaderState::WaitingForData => "following",
        ReaderState::Restarting => "restarting",
        ReaderState::Closed => "closed",
    }
}
