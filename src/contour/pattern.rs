// Continuously ascending/descending (CAD) pattern scanning
// Finds monotonic pitch runs that meet duration and excursion thresholds

use serde::{Deserialize, Serialize};

use super::FrameClock;
use crate::config::CadConfig;
use crate::notes::{Direction, Interval};

/// Result of one CAD scan over a contour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadScan {
    /// Pattern spans in seconds, ordered and non-overlapping
    pub patterns: Vec<Interval>,

    /// Same length as the input; zero except frames of surviving patterns
    pub pattern_contour: Vec<f64>,
}

/// Scan a contour left to right for CAD patterns in one direction
///
/// A run grows while each step moves in `direction` and stays below the
/// jitter limit. Plateaus up to `max_plateau_frames` long are absorbed;
/// longer plateaus end the run and their frames are excluded from any run.
/// Every scanned frame is consumed, so patterns never overlap.
pub fn detect_cad(
    contour: &[f64],
    direction: Direction,
    config: &CadConfig,
    clock: FrameClock,
) -> CadScan {
    let len = contour.len();
    let mut consumed = vec![false; len];
    let mut pattern_contour = vec![0.0; len];
    let mut patterns = Vec::new();

    let min_frames = clock.seconds_to_frames(config.min_duration);

    for start in 0..len {
        if consumed[start] || contour[start] == 0.0 {
            continue;
        }

        let end = trace_run(contour, &mut consumed, start, direction, config);
        let frames = end - start + 1;
        let extent = (contour[end] - contour[start]).abs();

        if frames as f64 >= min_frames && extent >= config.min_extent && extent <= config.max_extent
        {
            pattern_contour[start..=end].copy_from_slice(&contour[start..=end]);
            patterns.push(Interval {
                onset: clock.frames_to_seconds(start),
                offset: clock.frames_to_seconds(end + 1),
            });
        }

        consumed[start..=end].iter_mut().for_each(|c| *c = true);
    }

    log::debug!(
        "CAD scan ({}): {} patterns in {} frames",
        direction.label(),
        patterns.len(),
        len
    );

    CadScan {
        patterns,
        pattern_contour,
    }
}

/// Extend a run from `start`, returning the index of its last frame
fn trace_run(
    contour: &[f64],
    consumed: &mut [bool],
    start: usize,
    direction: Direction,
    config: &CadConfig,
) -> usize {
    let len = contour.len();
    let mut now = start;

    while now + 1 < len && !consumed[now + 1] {
        let current = contour[now];
        let next = contour[now + 1];

        if !direction.admits(current, next) || (next - current).abs() >= config.max_step {
            break;
        }

        if next != current {
            now += 1;
            continue;
        }

        // Plateau: count the equal frames that follow
        let mut check = now;
        while check + 1 < len && !consumed[check + 1] && contour[check + 1] == contour[check] {
            check += 1;
        }

        if check - now <= config.max_plateau_frames {
            now = check;
        } else {
            consumed[now + 1..=check].iter_mut().for_each(|c| *c = true);
            break;
        }
    }

    now
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: f64, step: f64, frames: usize) -> Vec<f64> {
        (0..frames).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_monotone_ramp_yields_single_full_pattern() {
        let clock = FrameClock::default();
        let contour = ramp(60.0, 0.1, 20);

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);

        assert_eq!(scan.patterns.len(), 1);
        assert!((scan.patterns[0].onset - 0.0).abs() < 1e-12);
        assert!((scan.patterns[0].offset - clock.frames_to_seconds(20)).abs() < 1e-12);
        assert_eq!(scan.pattern_contour, contour);
    }

    #[test]
    fn test_ten_frame_ramp_between_silence() {
        let clock = FrameClock::new(256, 44100);
        let mut contour = vec![0.0; 5];
        contour.extend(ramp(60.0, 0.1, 10));
        contour.extend(vec![0.0; 5]);

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);

        assert_eq!(scan.patterns.len(), 1);
        let span = scan.patterns[0].duration();
        assert!((span - 10.0 * 256.0 / 44100.0).abs() < 1e-12);
        assert!((scan.patterns[0].onset - clock.frames_to_seconds(5)).abs() < 1e-12);
        assert_eq!(scan.pattern_contour.len(), contour.len());
        assert_eq!(scan.pattern_contour[4], 0.0);
        assert_eq!(scan.pattern_contour[5], 60.0);
    }

    #[test]
    fn test_descending_ramp_only_found_downward() {
        let clock = FrameClock::default();
        let contour = ramp(64.0, -0.2, 12);

        let down = detect_cad(&contour, Direction::Down, &CadConfig::default(), clock);
        let up = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);

        assert_eq!(down.patterns.len(), 1);
        assert!(up.patterns.is_empty());
        assert!(up.pattern_contour.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_large_step_breaks_run() {
        let clock = FrameClock::default();
        // A step of one semitone per frame exceeds the jitter limit
        let contour = ramp(60.0, 1.0, 12);

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);
        assert!(scan.patterns.is_empty());
    }

    #[test]
    fn test_short_plateau_is_absorbed() {
        let clock = FrameClock::default();
        let mut contour = ramp(60.0, 0.1, 6);
        let top = contour[contour.len() - 1];
        contour.extend(vec![top; 10]);
        contour.extend(ramp(60.6, 0.1, 6));

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);

        assert_eq!(scan.patterns.len(), 1);
        assert!((scan.patterns[0].offset - clock.frames_to_seconds(contour.len())).abs() < 1e-12);
    }

    #[test]
    fn test_long_plateau_cuts_run() {
        let clock = FrameClock::default();
        let mut contour = ramp(60.0, 0.1, 10);
        let top = contour[contour.len() - 1];
        contour.extend(vec![top; 20]);
        contour.extend(ramp(61.0, 0.1, 10));

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);

        // First run ends before the plateau, the plateau is skipped,
        // and the second ramp starts a new pattern
        assert_eq!(scan.patterns.len(), 2);
        assert!((scan.patterns[0].offset - clock.frames_to_seconds(10)).abs() < 1e-12);
        assert!((scan.patterns[1].onset - clock.frames_to_seconds(30)).abs() < 1e-12);
        assert!(scan.pattern_contour[10..30].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extent_bounds() {
        let clock = FrameClock::default();
        let config = CadConfig::default();

        // 0.45 semitone excursion is below min_extent
        let shallow = ramp(60.0, 0.05, 10);
        assert!(detect_cad(&shallow, Direction::Up, &config, clock).patterns.is_empty());

        // 5.7 semitone excursion exceeds max_extent
        let wide = ramp(60.0, 0.3, 20);
        assert!(detect_cad(&wide, Direction::Up, &config, clock).patterns.is_empty());
    }

    #[test]
    fn test_too_short_run_rejected() {
        let clock = FrameClock::default();
        // 5 frames < 0.05 s at 256/44100
        let contour = ramp(60.0, 0.3, 5);

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);
        assert!(scan.patterns.is_empty());
    }

    #[test]
    fn test_patterns_never_overlap() {
        let clock = FrameClock::default();
        let mut contour = Vec::new();
        for k in 0..4 {
            contour.extend(ramp(60.0 + k as f64, 0.1, 12));
            contour.extend(vec![0.0; 3]);
        }

        let scan = detect_cad(&contour, Direction::Up, &CadConfig::default(), clock);

        assert_eq!(scan.patterns.len(), 4);
        for pair in scan.patterns.windows(2) {
            assert!(pair[0].offset <= pair[1].onset);
        }
    }

    #[test]
    fn test_empty_contour() {
        let scan = detect_cad(&[], Direction::Up, &CadConfig::default(), FrameClock::default());
        assert!(scan.patterns.is_empty());
        assert!(scan.pattern_contour.is_empty());
    }
}
