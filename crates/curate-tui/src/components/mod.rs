pub mod help_overlay;
pub mod station_table;
