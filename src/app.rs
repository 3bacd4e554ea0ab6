use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::cli::AppConfig;
use crate::data::source::{flush_channel, Source};
use crate::state::axis_state::AxisState;
use crate::state::plot_state::PlotState;
use crate::ui::plot_panel::{self, AxisFormats};
use crate::ui::settings_panel;

/// Repaint at least this often so reader states in the side panel stay fresh.
const IDLE_REPAINT: Duration = Duration::from_millis(500);

/// The tailplot window: one chart fed by every source.
pub struct TailPlotApp {
    plot: PlotState,
    formats: AxisFormats,
    sources: Vec<Source>,
    flushes: Receiver<usize>,
    show_settings: bool,
    /// Rows applied since start, shown in the footer.
    rows_applied: usize,
}

impl TailPlotApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let ctx = &cc.egui_ctx;
        let mut style = (*ctx.style()).clone();
        style.spacing.button_padding = egui::vec2(10.0, 5.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);

        let repaint = ctx.clone();
        let (scheduler, flushes) = flush_channel();
        let scheduler = Arc::new(scheduler.with_waker(move || repaint.request_repaint()));

        let source_count = config.sources.len();
        let sources: Vec<Source> = config
            .sources
            .into_iter()
            .map(|parse| {
                let source = Source::new(parse, scheduler.clone());
                source.set_auto_restart(config.auto_restart);
                source
            })
            .collect();

        for source in &sources {
            if let Err(e) = source.start() {
                tracing::error!("{e}");
            }
        }

        let mut plot = PlotState::new(config.title, source_count);
        plot.x_axis = AxisState::new("X").with_scroll_width(config.scroll_width);

        Self {
            plot,
            formats: AxisFormats {
                x: config.x_format,
                y: config.y_format,
                y2: config.y2_format,
            },
            sources,
            flushes,
            show_settings: true,
            rows_applied: 0,
        }
    }
}

impl eframe::App for TailPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ------------------------------------------------------------------
        // 1. Apply everything the readers handed over since the last frame
        // ------------------------------------------------------------------
        self.rows_applied += self.plot.apply_pending(&self.flushes, &self.sources);

        // ------------------------------------------------------------------
        // 2. Panels
        // ------------------------------------------------------------------
        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 8)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(&self.plot.title);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.toggle_value(&mut self.show_settings, "Settings");
                    });
                });
            });

        egui::TopBottomPanel::bottom("footer")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 6)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let points: usize = self.plot.series().map(|s| s.point_count()).sum();
                    ui.label(egui::RichText::new(format!("{} rows, {points} points", self.rows_applied)).weak());
                });
            });

        if self.show_settings {
            egui::SidePanel::right("settings")
                .resizable(true)
                .default_width(280.0)
                .show(ctx, |ui| {
                    settings_panel::show_settings_panel(ui, &mut self.plot, &self.formats, &self.sources);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            plot_panel::show_plot_panel(&mut self.plot, &self.formats, ui);
        });

        ctx.request_repaint_after(IDLE_REPAINT);
    }
}

impl Drop for TailPlotApp {
    fn drop(&mut self) {
        for source in &self.sources {
            if let Err(e) = source.stop() {
                tracing::debug!("{e}");
            }
        }
    }
}
