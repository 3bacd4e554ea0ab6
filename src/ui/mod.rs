pub mod axis_format;
pub mod plot_panel;
pub mod settings_panel;
