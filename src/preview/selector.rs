//! # Preview Size Selection
//!
//! Picks the capture resolution that best fits the display surface a preview
//! is rendered into.
//!
//! ## Algorithm
//!
//! 1. `target_ratio = target.height / target.width`
//! 2. Among candidates whose `width / height` lies within [`ASPECT_TOLERANCE`]
//!    of `target_ratio`, take the one whose height is closest to
//!    `target.height`. Ties go to the first candidate encountered.
//! 3. If no candidate is within tolerance, take the closest height over the
//!    whole set, same tie-break.
//! 4. A portrait winner (`height > width`) is reported with its sides
//!    swapped, so every result is landscape-first (`width >= height`) no
//!    matter how the device listed it.
//!
//! The target ratio is height over width while candidate ratios are width
//! over height. The two agree when the device lists sensor (landscape) sizes
//! and the host reports a portrait surface. This asymmetry is kept as
//! observed in deployed scanners, not confirmed as intended.
//!
//! The swap in step 4 runs on portrait winners so that a `(240, 320)` winner
//! comes back as `(320, 240)` and `(640, 480)` comes back unchanged. Earlier
//! scanner builds swapped in the opposite direction (on `height < width`);
//! the landscape-first direction here is a deliberate choice.

use std::fmt;
use std::str::FromStr;

/// Maximum difference between a candidate's aspect ratio and the target ratio
/// for the candidate to take part in the first selection pass.
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// A capture resolution reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Same resolution with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `640x480`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Invalid resolution '{}': expected WIDTHxHEIGHT", s))?;
        let width: u32 = w
            .parse()
            .map_err(|_| format!("Invalid width in resolution '{}'", s))?;
        let height: u32 = h
            .parse()
            .map_err(|_| format!("Invalid height in resolution '{}'", s))?;
        if width == 0 || height == 0 {
            return Err(format!("Resolution '{}' must have positive sides", s));
        }
        Ok(Self { width, height })
    }
}

/// Dimensions of the surface the preview must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetArea {
    pub width: u32,
    pub height: u32,
}

impl TargetArea {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height over width.
    fn ratio(&self) -> f64 {
        self.height as f64 / self.width as f64
    }
}

impl fmt::Display for TargetArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Select the best preview resolution for `target`.
///
/// Returns `None` only when `candidates` is empty. The returned resolution is
/// one of the candidates, with its sides swapped when it is portrait.
pub fn select_optimal(candidates: &[Resolution], target: TargetArea) -> Option<Resolution> {
    let target_ratio = target.ratio();
    let target_height = target.height as i64;

    let within_tolerance = candidates.iter().filter(|size| {
        // NaN (0/0) compares false here and lets the candidate through, as
        // does the fallback pass, so both paths agree.
        !((size.aspect_ratio() - target_ratio).abs() > ASPECT_TOLERANCE)
    });

    let chosen = closest_height(within_tolerance, target_height)
        .or_else(|| closest_height(candidates.iter(), target_height))?;

    if chosen.width < chosen.height {
        Some(chosen.swapped())
    } else {
        Some(*chosen)
    }
}

/// First candidate with the smallest `|height - target_height|`.
fn closest_height<'a>(
    candidates: impl Iterator<Item = &'a Resolution>,
    target_height: i64,
) -> Option<&'a Resolution> {
    let mut best: Option<&Resolution> = None;
    let mut min_diff = f64::MAX;
    for size in candidates {
        let diff = (size.height as i64 - target_height).abs() as f64;
        if diff < min_diff {
            best = Some(size);
            min_diff = diff;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(w: u32, h: u32) -> Resolution {
        Resolution::new(w, h)
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert_eq!(select_optimal(&[], TargetArea::new(640, 480)), None);
    }

    #[test]
    fn falls_back_to_closest_height_when_no_ratio_matches() {
        // target ratio 480/640 = 0.75; every candidate ratio is above 1.2
        let candidates = [res(320, 240), res(640, 480), res(176, 144)];
        let chosen = select_optimal(&candidates, TargetArea::new(640, 480)).unwrap();
        // exact height match, already landscape
        assert_eq!(chosen, res(640, 480));
    }

    #[test]
    fn ratio_pass_takes_precedence_over_closer_height() {
        // portrait surface 1080x1920: target ratio 1.777..
        let candidates = [res(2560, 1920), res(1280, 720), res(1920, 1080)];
        let chosen = select_optimal(&candidates, TargetArea::new(1080, 1920)).unwrap();
        // 2560x1920 matches the height exactly but is 4:3; among 16:9 sizes 1080 is closest
        assert_eq!(chosen, res(1920, 1080));
    }

    #[test]
    fn portrait_winner_is_swapped() {
        let candidates = [res(1024, 768), res(240, 320)];
        assert_eq!(
            select_optimal(&candidates, TargetArea::new(300, 320)),
            Some(res(320, 240))
        );
    }

    #[test]
    fn portrait_only_device_yields_landscape() {
        let candidates = [res(480, 640), res(720, 1280)];
        let chosen = select_optimal(&candidates, TargetArea::new(720, 1280)).unwrap();
        assert_eq!(chosen, res(1280, 720));
    }

    #[test]
    fn landscape_winner_is_kept() {
        let candidates = [res(320, 240), res(1024, 768)];
        assert_eq!(
            select_optimal(&candidates, TargetArea::new(400, 300)),
            Some(res(320, 240))
        );
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let candidates = [res(800, 600), res(600, 600), res(1000, 600)];
        let chosen = select_optimal(&candidates, TargetArea::new(600, 600)).unwrap();
        // 600x600 is the only one within tolerance of 1.0
        assert_eq!(chosen, res(600, 600));

        let equal_heights = [res(400, 300), res(500, 300)];
        let chosen = select_optimal(&equal_heights, TargetArea::new(10, 300)).unwrap();
        assert_eq!(chosen, res(400, 300));
    }

    #[test]
    fn tolerance_uses_raw_float_difference() {
        // target ratio 1.0; 11/10 - 1.0 is 0.10000000000000009 in f64, just
        // outside, so the exact-height 11x10 loses to 21x20
        let candidates = [res(21, 20), res(11, 10)];
        let chosen = select_optimal(&candidates, TargetArea::new(10, 10)).unwrap();
        assert_eq!(chosen, res(21, 20));
    }

    #[test]
    fn duplicates_are_harmless() {
        let candidates = [res(640, 480), res(640, 480)];
        assert_eq!(
            select_optimal(&candidates, TargetArea::new(480, 640)),
            Some(res(640, 480))
        );
    }

    #[test]
    fn candidates_are_not_mutated() {
        let candidates = vec![res(320, 240), res(640, 480)];
        let before = candidates.clone();
        let _ = select_optimal(&candidates, TargetArea::new(640, 480));
        assert_eq!(candidates, before);
    }

    #[test]
    fn zero_width_target_still_selects() {
        let candidates = [res(320, 240), res(640, 480)];
        assert_eq!(
            select_optimal(&candidates, TargetArea::new(0, 250)),
            Some(res(320, 240))
        );
        assert_eq!(
            select_optimal(&candidates, TargetArea::new(0, 0)),
            Some(res(320, 240))
        );
    }

    #[test]
    fn parses_resolutions() {
        assert_eq!("640x480".parse::<Resolution>(), Ok(res(640, 480)));
        assert_eq!(" 1920X1080 ".parse::<Resolution>(), Ok(res(1920, 1080)));
        assert!("640".parse::<Resolution>().is_err());
        assert!("0x480".parse::<Resolution>().is_err());
        assert_eq!(res(176, 144).to_string(), "176x144");
    }
}
