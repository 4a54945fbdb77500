//! Thin-lens depth of field.
//!
//! Distances are in millimetres, one scene unit being one metre.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthOfFieldSettings {
    pub enabled: bool,
    /// Distance of the plane in focus from the camera, in millimetres.
    pub focus_distance: f32,
    /// Focal length of the lens in millimetres.
    pub focal_length: f32,
    pub f_stop: f32,
    pub lens_size: f32,
    /// Ideal blur kernel size before snapping.
    pub blur_kernel: f32,
}

impl Default for DepthOfFieldSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            focus_distance: 2000.0,
            focal_length: 50.0,
            f_stop: 1.4,
            lens_size: 50.0,
            blur_kernel: 15.0,
        }
    }
}

impl DepthOfFieldSettings {
    /// Factor that turns `(focus - d) / d` into a circle of confusion.
    pub fn coc_scale(&self) -> f32 {
        let aperture = self.lens_size / self.f_stop;
        let denominator = self.focus_distance - self.focal_length;
        if denominator.abs() <= f32::EPSILON {
            return 0.0;
        }
        aperture * self.focal_length / denominator
    }
}

/// Blur amount in `[0, 1]` of a surface `distance_m` metres away from the camera.
pub fn circle_of_confusion(settings: &DepthOfFieldSettings, distance_m: f32) -> f32 {
    let d = distance_m * 1000.0;
    if d <= 0.0 {
        return 1.0;
    }
    (settings.coc_scale() * (settings.focus_distance - d) / d)
        .abs()
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_lens() -> DepthOfFieldSettings {
        DepthOfFieldSettings {
            enabled: true,
            focal_length: 40.0,
            ..Default::default()
        }
    }

    #[test]
    fn focus_plane_is_sharp() {
        assert_eq!(circle_of_confusion(&room_lens(), 2.0), 0.0);
    }

    #[test]
    fn blur_grows_away_from_the_focus_plane() {
        let lens = room_lens();
        let behind = [2.5, 4.0, 10.0, 100.0].map(|d| circle_of_confusion(&lens, d));
        assert!(behind.windows(2).all(|w| w[0] < w[1]), "{behind:?}");
        let in_front = [1.5, 1.0, 0.5].map(|d| circle_of_confusion(&lens, d));
        assert!(in_front.windows(2).all(|w| w[0] < w[1]), "{in_front:?}");
    }

    #[test]
    fn blur_is_clamped() {
        let lens = room_lens();
        assert_eq!(circle_of_confusion(&lens, 0.01), 1.0);
        assert_eq!(circle_of_confusion(&lens, 0.0), 1.0);
        assert!(circle_of_confusion(&lens, 1.0e6) <= 1.0);
    }

    #[test]
    fn coc_scale_matches_the_lens_equation() {
        let lens = room_lens();
        let expected = (50.0 / 1.4) * 40.0 / (2000.0 - 40.0);
        assert!((lens.coc_scale() - expected).abs() < 1e-6);
    }
}
