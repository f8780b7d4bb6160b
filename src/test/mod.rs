
pub use geotiff_fixture::{write_gray_geotiff, write_plain_tiff, write_rgb_geotiff};
pub use test_helper::with_input_and_output_paths;
