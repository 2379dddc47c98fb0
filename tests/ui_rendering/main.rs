mod common;
mod map_panel_render_test;
mod timeline_input_render_test;
