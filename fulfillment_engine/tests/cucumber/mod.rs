mod panel_world;
mod setups;
mod steps;

pub use panel_world::PanelWorld;
