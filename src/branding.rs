//! Installer background branding.
//!
//! Logos are scaled so the larger axis is at most `MAX_LOGO_SIZE` and stacked
//! vertically on the background, with the free height split evenly into
//! `logos + 1` gaps:
//!
//! ```text
//! +--------------------+
//! |   FREE_TOP         |
//! |   gap              |
//! |   [federation]     |
//! |   gap              |
//! |   [institution]    |
//! |   gap              |
//! |   FREE_BOTTOM      |
//! +--------------------+
//! ```
//!
//! The arithmetic is a pure function; pixel work is delegated to a
//! `LogoCompositor`.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Largest logo edge in pixels.
pub const MAX_LOGO_SIZE: u32 = 120;
/// Space reserved above the logos.
pub const FREE_TOP: i64 = 70;
/// Space reserved below the logos.
pub const FREE_BOTTOM: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale down so the larger axis is at most `max`, keeping aspect ratio.
    pub fn fit_within(self, max: u32) -> Self {
        let larger = self.width.max(self.height);
        if larger <= max || larger == 0 {
            return self;
        }
        let scale = |v: u32| ((f64::from(v) * f64::from(max)) / f64::from(larger)).round() as u32;
        if self.width >= self.height {
            Self::new(max, scale(self.height).max(1))
        } else {
            Self::new(scale(self.width).max(1), max)
        }
    }
}

/// Where one logo goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    pub size: Dimensions,
    pub x: i64,
    pub y: i64,
}

/// Compute placements for `logos` (in stacking order) on `background`.
pub fn plan_logo_layout(background: Dimensions, logos: &[Dimensions]) -> Vec<LogoPlacement> {
    if logos.is_empty() {
        return Vec::new();
    }

    let scaled: Vec<Dimensions> = logos.iter().map(|d| d.fit_within(MAX_LOGO_SIZE)).collect();
    let logo_height: i64 = scaled.iter().map(|d| i64::from(d.height)).sum();
    let free_height = i64::from(background.height) - FREE_TOP - FREE_BOTTOM - logo_height;
    let gap = (free_height as f64 / (scaled.len() + 1) as f64).round() as i64;

    let mut y = FREE_TOP;
    scaled
        .into_iter()
        .map(|size| {
            y += gap;
            let x = ((i64::from(background.width) - i64::from(size.width)) as f64 / 2.0).round() as i64;
            let placement = LogoPlacement { size, x, y };
            y += i64::from(size.height);
            placement
        })
        .collect()
}

/// Image capability: "scale then composite".
pub trait LogoCompositor {
    /// Pixel dimensions of an image file.
    fn dimensions(&self, image: &Path) -> Result<Dimensions>;

    /// Scale each logo to its placement size and draw it onto `background`,
    /// overwriting the background file.
    fn compose(&self, background: &Path, logos: &[(PathBuf, LogoPlacement)]) -> Result<()>;
}

/// Place `logos` onto `background` using `compositor`.
pub fn apply_branding(
    compositor: &dyn LogoCompositor,
    background: &Path,
    logos: &[PathBuf],
) -> Result<Vec<LogoPlacement>> {
    let bg = compositor.dimensions(background)?;
    let sizes = logos
        .iter()
        .map(|logo| compositor.dimensions(logo))
        .collect::<Result<Vec<_>>>()?;
    let placements = plan_logo_layout(bg, &sizes);
    tracing::debug!("Logo layout on {}x{}: {:?}", bg.width, bg.height, placements);

    let jobs: Vec<(PathBuf, LogoPlacement)> = logos.iter().cloned().zip(placements.iter().copied()).collect();
    compositor.compose(background, &jobs)?;
    Ok(placements)
}
