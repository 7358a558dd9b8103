use std::sync::Arc;

use tonal_core::{
    BitDepth, Channel, Color, ControlPoint, CurveModel, FilterAction, Histogram, HistogramTask,
    LevelsModel, PixelBuffer, TaskState, remap_in_place, remapped,
};

/// A horizontal gray ramp covering the whole 8-bit range, opaque.
fn gray_ramp() -> PixelBuffer {
    let samples: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v, 255]).collect();
    PixelBuffer::from_u8(256, 1, samples).unwrap()
}

#[test]
fn test_histogram_auto_levels_remap() {
    let image = Arc::new(gray_ramp());
    let mut task = HistogramTask::new(Arc::clone(&image));
    let histogram = task.compute().unwrap().unwrap();
    assert_eq!(task.state(), TaskState::Done);
    assert_eq!(histogram.count(Channel::Luminosity, 0, 255), 256.0);

    let mut levels = LevelsModel::new(BitDepth::U8);
    levels.auto_levels(&histogram);
    assert_eq!(levels.low_input(Channel::Red), 2);
    assert_eq!(levels.high_input(Channel::Red), 253);

    let luts = levels.compile_lut(4);
    let out = remapped(&image, &luts).unwrap();
    assert_eq!(out.pixel(1, 0), Some(Color::new(0, 0, 0, 255)));
    assert_eq!(out.pixel(254, 0), Some(Color::new(255, 255, 255, 255)));

    // stretched: the remapped ramp reaches both ends
    let stretched = Histogram::compute(&out);
    assert_eq!(stretched.count(Channel::Red, 0, 0), 3.0);
    assert_eq!(stretched.count(Channel::Red, 255, 255), 3.0);
}

#[test]
fn test_inverted_curve_inverts_image() {
    for depth in [BitDepth::U8, BitDepth::U16] {
        let max = depth.segment_max();
        let mut curves = CurveModel::new(depth);
        curves.set_points(Channel::Luminosity, &[ControlPoint::new(0, max), ControlPoint::new(max, 0)]);
        curves.recalculate(Channel::Luminosity);

        let curve = curves.curve(Channel::Luminosity);
        assert_eq!(curve.len(), depth.segments());
        assert_eq!(curve[max as usize], 0);
        assert!(curve.windows(2).all(|w| w[0] > w[1]), "{depth}");

        let luts = curves.compile_lut(4);
        let mut image = PixelBuffer::new(2, 2, depth).unwrap();
        image.set_pixel(1, 1, Color::new(max as u16, 0, 0, 7));
        remap_in_place(&mut image, &luts).unwrap();
        assert_eq!(image.pixel(0, 0), Some(Color::new(max as u16, max as u16, max as u16, 0)));
        // alpha is not touched by the overall curve
        assert_eq!(image.pixel(1, 1), Some(Color::new(0, max as u16, max as u16, 7)));
    }
}

#[test]
fn test_curves_survive_undo_log_as_json() {
    let mut curves = CurveModel::new(BitDepth::U16);
    curves.set_point(Channel::Green, 5, ControlPoint::new(20_000, 30_000));
    curves.recalculate_all();

    let json = curves.to_action().to_json().unwrap();
    let action = FilterAction::from_json(&json).unwrap();
    let mut restored = CurveModel::from_action(&action).unwrap();

    assert_eq!(restored.depth(), BitDepth::U16);
    assert_eq!(restored.point(Channel::Green, 1), ControlPoint::new(20_000, 30_000));
    assert_eq!(restored.curve(Channel::Green), curves.curve(Channel::Green));
    assert_eq!(restored.compile_lut(3), curves.compile_lut(3));
}

#[test]
fn test_gimp_files_move_settings_between_depths() {
    let dir = std::env::temp_dir();
    let curves_path = dir.join(format!("tonal-it-{}.curves", std::process::id()));
    let levels_path = dir.join(format!("tonal-it-{}.levels", std::process::id()));

    let mut curves = CurveModel::new(BitDepth::U8);
    curves.set_point(Channel::Blue, 8, ControlPoint::new(100, 140));
    curves.save_gimp_curves_file(&curves_path).unwrap();

    let mut levels = LevelsModel::new(BitDepth::U8);
    levels.set_low_input(Channel::Luminosity, 16);
    levels.save_gimp_levels_file(&levels_path).unwrap();

    let mut wide_curves = CurveModel::new(BitDepth::U16);
    wide_curves.load_gimp_curves_file(&curves_path).unwrap();
    let mut wide_levels = LevelsModel::new(BitDepth::U16);
    wide_levels.load_gimp_levels_file(&levels_path).unwrap();
    std::fs::remove_file(&curves_path).unwrap();
    std::fs::remove_file(&levels_path).unwrap();

    assert_eq!(wide_curves.point(Channel::Blue, 8), ControlPoint::new(25_500, 35_700));
    assert_eq!(wide_curves.value(Channel::Blue, 25_500), Some(35_700));
    assert_eq!(wide_levels.low_input(Channel::Luminosity), 16 * 255);
    // 255 written from an 8-bit file widens to 65025
    assert_eq!(wide_levels.high_input(Channel::Luminosity), 65_025);
}
