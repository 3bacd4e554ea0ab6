pub mod axis_state;
pub mod data_series;
pub mod plot_state;
