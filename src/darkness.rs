use cgmath::{MetricSpace, Point2};

use crate::flashlight::Flashlight;
use crate::light_source::LightSource;

/// Visible rectangle in world pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl View {
    pub fn centered(center: Point2<f32>, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width * 0.5,
            y: center.y - height * 0.5,
            width,
            height,
        }
    }

    /// Whether a circle overlaps the view rectangle.
    pub fn touches(&self, center: Point2<f32>, radius: f32) -> bool {
        let nearest = Point2::new(
            center.x.clamp(self.x, self.x + self.width),
            center.y.clamp(self.y, self.y + self.height),
        );
        nearest.distance(center) < radius
    }
}

/// Radial hole profile: 1 at the centre, 0.5 at 70% of the radius, 0 at the
/// edge.
pub fn hole_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    let t = distance / radius;
    if t < 0.7 {
        1.0 - 0.5 * t / 0.7
    } else {
        0.5 * (1.0 - t) / 0.3
    }
}

/// Low resolution alpha raster laid over the scene. 0 is fully lit, 1 is
/// black.
pub struct DarknessMask {
    columns: usize,
    rows: usize,
    alpha: Vec<f32>,
}

impl DarknessMask {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            alpha: vec![0.0; columns * rows],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn alpha_at(&self, column: usize, row: usize) -> Option<f32> {
        if column < self.columns && row < self.rows {
            Some(self.alpha[column + row * self.columns])
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.alpha)
    }

    pub fn render<'a, I>(
        &mut self,
        view: &View,
        darkness: f32,
        lights: I,
        flashlight: Option<&Flashlight>,
        fog_density: Option<f32>,
    ) where
        I: IntoIterator<Item = &'a LightSource>,
    {
        let darkness = darkness.clamp(0.0, 1.0);
        self.alpha.fill(darkness);
        if self.columns == 0 || self.rows == 0 {
            return;
        }

        let cell_w = view.width / self.columns as f32;
        let cell_h = view.height / self.rows as f32;
        let center = |column: usize, row: usize| {
            Point2::new(
                view.x + (column as f32 + 0.5) * cell_w,
                view.y + (row as f32 + 0.5) * cell_h,
            )
        };

        for light in lights {
            if !light.active {
                continue;
            }
            for row in 0..self.rows {
                for column in 0..self.columns {
                    let d = light.position.distance(center(column, row));
                    let cut = (light.intensity * hole_falloff(d, light.radius)).clamp(0.0, 1.0);
                    self.alpha[column + row * self.columns] *= 1.0 - cut;
                }
            }
        }

        if let Some(flashlight) = flashlight.filter(|f| f.is_on()) {
            for row in 0..self.rows {
                for column in 0..self.columns {
                    let cut = flashlight.illumination(center(column, row)).clamp(0.0, 1.0);
                    self.alpha[column + row * self.columns] *= 1.0 - cut;
                }
            }
        }

        if let Some(density) = fog_density {
            let half_w = self.columns as f32 * 0.5;
            let half_h = self.rows as f32 * 0.5;
            for row in 0..self.rows {
                for column in 0..self.columns {
                    let dx = ((column as f32 + 0.5) - half_w).abs() / half_w;
                    let dy = ((row as f32 + 0.5) - half_h).abs() / half_h;
                    let fog = (density * (1.0 + dx.max(dy))).clamp(0.0, 1.0);
                    let cell = &mut self.alpha[column + row * self.columns];
                    *cell += fog * (1.0 - *cell);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_source::{LightKind, LightSourceRegistry};

    #[test]
    fn falloff_profile() {
        assert_eq!(hole_falloff(0.0, 100.0), 1.0);
        assert!((hole_falloff(70.0, 100.0) - 0.5).abs() < 1e-5);
        assert_eq!(hole_falloff(100.0, 100.0), 0.0);
        assert_eq!(hole_falloff(5.0, 0.0), 0.0);
    }

    #[test]
    fn circles_touching_the_view() {
        let view = View::centered(Point2::new(0.0, 0.0), 100.0, 60.0);
        assert!(view.touches(Point2::new(0.0, 0.0), 1.0));
        assert!(view.touches(Point2::new(70.0, 0.0), 25.0));
        assert!(!view.touches(Point2::new(80.0, 0.0), 25.0));
        assert!(!view.touches(Point2::new(70.0, 50.0), 25.0));
        assert!(!view.touches(Point2::new(0.0, 0.0), 0.0));
    }

    #[test]
    fn light_punches_a_hole() {
        let mut lights = LightSourceRegistry::new(300.0, 1);
        lights.register_kind(LightKind::Lamp, Point2::new(5.0, 5.0), None);
        let view = View {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 100.0,
        };
        let mut mask = DarknessMask::new(20, 10);
        mask.render(&view, 0.9, lights.iter(), None, None);

        let under = mask.alpha_at(0, 0).unwrap();
        let far = mask.alpha_at(19, 9).unwrap();
        assert!(under < 0.9 * 0.4, "{under}");
        assert_eq!(far, 0.9);
        assert_eq!(mask.as_bytes().len(), 20 * 10 * 4);
    }

    #[test]
    fn fog_thickens_at_the_edges() {
        let view = View::centered(Point2::new(0.0, 0.0), 100.0, 100.0);
        let mut mask = DarknessMask::new(11, 11);
        mask.render(&view, 0.0, std::iter::empty(), None, Some(0.1));
        let middle = mask.alpha_at(5, 5).unwrap();
        let corner = mask.alpha_at(0, 0).unwrap();
        assert!((middle - 0.1).abs() < 0.02);
        assert!(corner > middle);
        assert!(corner <= 0.2 + 1e-5);
    }
}
